use serde::{Deserialize, Serialize};

use crate::model::DepositPackage;
use crate::negotiation::MediaRange;

/// Why a deposit was refused before or during ingest.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyViolation {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("unsupported packaging: {0}")]
    UnsupportedPackaging(String),
    #[error("package of {size} bytes exceeds the limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    #[error("checksum mismatch: declared {declared}, computed {computed}")]
    ChecksumMismatch { declared: String, computed: String },
    #[error("malformed package: {0}")]
    MalformedPackage(String),
}

/// What a deposit must satisfy before anything is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptPolicy {
    /// Accepted MIME types; `type/*` and `*/*` are allowed. Empty accepts all.
    pub accepted_mime_types: Vec<String>,
    /// Accepted packaging identifiers. Empty accepts every registered one.
    pub accepted_packaging: Vec<String>,
    pub max_upload_size: Option<u64>,
    /// Compare a declared Content-MD5 with the payload
    pub verify_checksum: bool,
}

impl Default for AcceptPolicy {
    fn default() -> Self {
        Self {
            accepted_mime_types: Vec::new(),
            accepted_packaging: Vec::new(),
            max_upload_size: None,
            verify_checksum: true,
        }
    }
}

impl AcceptPolicy {
    pub fn check(&self, package: &DepositPackage) -> Result<(), PolicyViolation> {
        if let Some(limit) = self.max_upload_size {
            if package.size() > limit {
                return Err(PolicyViolation::TooLarge {
                    size: package.size(),
                    limit,
                });
            }
        }

        let mime_type = package.mime_type().essence_str();
        if !self.accepted_mime_types.is_empty()
            && !self
                .accepted_mime_types
                .iter()
                .any(|accepted| mime_accepts(accepted, mime_type))
        {
            return Err(PolicyViolation::UnsupportedMediaType(mime_type.to_string()));
        }

        if !self.accepted_packaging.is_empty()
            && !self
                .accepted_packaging
                .iter()
                .any(|p| p == package.packaging())
        {
            return Err(PolicyViolation::UnsupportedPackaging(
                package.packaging().to_string(),
            ));
        }

        if self.verify_checksum {
            if let Some(declared) = package.declared_md5() {
                let computed = package.checksum();
                if !computed.matches(declared) {
                    return Err(PolicyViolation::ChecksumMismatch {
                        declared: declared.to_string(),
                        computed: computed.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn mime_accepts(accepted: &str, mime_type: &str) -> bool {
    match accepted.parse() {
        Ok(range) => MediaRange::new(range, 1.0).matches(mime_type),
        Err(_) => accepted.eq_ignore_ascii_case(mime_type),
    }
}
