use std::net::SocketAddr;

/// Upload ceiling when the acceptance policy sets none (500 MB).
pub const DEFAULT_BODY_LIMIT: usize = 500 * 1024 * 1024;

/// Room left over a policy size limit for multipart framing, so that an
/// oversized payload still reaches the ingest pipeline and is reported as
/// too large instead of being cut off by the transport.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    // level for per-request response logs
    pub log_level: tracing::Level,
    pub body_limit: usize,
}

impl Config {
    pub fn from_service(config: &crate::Config) -> Self {
        let body_limit = body_limit_for(config.sword.policy.max_upload_size);
        tracing::info!(
            listen_addr = %config.listen_addr,
            log_level = %config.log_level,
            body_limit,
            "http config"
        );
        Self {
            listen_addr: config.listen_addr,
            log_level: config.log_level,
            body_limit,
        }
    }
}

pub fn body_limit_for(max_upload_size: Option<u64>) -> usize {
    match max_upload_size {
        Some(limit) => usize::try_from(limit)
            .unwrap_or(usize::MAX)
            .saturating_add(MULTIPART_OVERHEAD),
        None => DEFAULT_BODY_LIMIT,
    }
}
