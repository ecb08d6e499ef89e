use bytes::Bytes;
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::{Deserialize, Serialize};

use super::UnitId;

/// MD5 digest of a unit's bytes, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn md5(data: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(data)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare against a client-declared digest, ignoring hex case.
    pub fn matches(&self, declared: &str) -> bool {
        self.0.eq_ignore_ascii_case(declared.trim())
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One stored binary payload. A unit may be linked into groups of
/// several containers at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub id: UnitId,
    pub name: String,
    pub mime_type: String,
    pub checksum: Checksum,
    pub size: u64,
    pub created: DateTime<Utc>,
}

impl ContentUnit {
    /// Parsed MIME type, falling back to `application/octet-stream`.
    pub fn mime(&self) -> Mime {
        self.mime_type
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM)
    }
}

/// Bytes plus naming for a unit that does not exist yet.
#[derive(Debug, Clone)]
pub struct UnitDraft {
    pub name: String,
    pub mime_type: Mime,
    pub data: Bytes,
}

impl UnitDraft {
    pub fn new(name: impl Into<String>, mime_type: Mime, data: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type,
            data,
        }
    }
}
