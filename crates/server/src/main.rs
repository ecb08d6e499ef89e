//! SWORD media resource server
//!
//! Serves edit-media URIs for deposit (POST), replacement (PUT), removal
//! (DELETE) and content-negotiated retrieval (GET), plus health routes
//! under `/_status`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use service::Config;

/// SWORD media resource server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML file with core settings (base url, stores, policy, users, containers)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on for HTTP requests [default: 8080]
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (error, warn, info, debug, trace) [default: info]
    #[arg(long)]
    log_level: Option<String>,

    /// Directory for daily-rolling log files
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Args {
    /// Flags given on the command line win; anything left out keeps the
    /// configured value.
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(port) = self.port {
            config.listen_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
        }
        if let Some(level) = &self.log_level {
            config.log_level = level
                .parse()
                .with_context(|| format!("invalid log level {level}"))?;
        }
        if let Some(dir) = &self.log_dir {
            config.log_dir = Some(dir.clone());
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config)?;

    service::spawn_service(&config).await;
    Ok(())
}
