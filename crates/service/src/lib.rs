//! Service infrastructure for the SWORD media resource server.
//!
//! This crate wires the core crate into a running process:
//! - Configuration (listen address, logging, core settings from TOML)
//! - State management (the media resource manager and its collaborators)
//! - HTTP handlers (edit-media routes, health checks)
//! - Process bootstrap (logging, panic hook, graceful shutdown)

pub mod config;
pub mod http;
pub mod process;
pub mod state;

// Re-export key types for convenience
pub use config::{Config, ConfigError};
pub use process::spawn_service;
pub use state::{State as ServiceState, StateSetupError};
