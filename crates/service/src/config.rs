use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
};

use common::config::SwordConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // http server configuration
    /// address for the media resource server to listen on.
    ///  if not set then 0.0.0.0:8080 will be used
    pub listen_addr: SocketAddr,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,

    /// core settings: base url, stores, policy, fixtures
    pub sword: SwordConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), 8080),
            log_level: tracing::Level::INFO,
            log_dir: None,
            sword: SwordConfig::default(),
        }
    }
}

impl Config {
    /// Read the core settings from a TOML file, keeping the defaults for
    ///  everything that only the command line sets.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let sword: SwordConfig = toml::from_str(&raw)?;
        sword.validate()?;

        Ok(Self {
            sword,
            ..Self::default()
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Sword(#[from] common::config::ConfigError),
}
