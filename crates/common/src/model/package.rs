use bytes::Bytes;
use mime::Mime;
use serde::Serialize;
use uuid::Uuid;

use super::Checksum;

/// Packaging format identifiers.
pub mod packaging {
    /// A zip archive whose entries each become a content unit.
    pub const SIMPLE_ZIP: &str = "http://purl.org/net/sword/package/SimpleZip";
    /// An opaque file stored as a single content unit.
    pub const BINARY: &str = "http://purl.org/net/sword/package/Binary";
}

/// An inbound deposit: payload bytes plus the format metadata the client
/// declared for them. The packaging is fixed at construction and cannot be
/// changed afterwards.
#[derive(Debug, Clone)]
pub struct DepositPackage {
    id: Uuid,
    payload: Bytes,
    packaging: String,
    mime_type: Mime,
    filename: Option<String>,
    content_md5: Option<String>,
    entry: Option<Bytes>,
}

impl DepositPackage {
    /// A binary-packaged deposit of `payload`.
    pub fn new(payload: Bytes, mime_type: Mime) -> Self {
        Self::with_packaging(payload, mime_type, packaging::BINARY)
    }

    pub fn with_packaging(payload: Bytes, mime_type: Mime, packaging: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            packaging: packaging.into(),
            mime_type,
            filename: None,
            content_md5: None,
            entry: None,
        }
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn content_md5(mut self, md5: impl Into<String>) -> Self {
        self.content_md5 = Some(md5.into());
        self
    }

    /// Attach the descriptive part of a multipart submission.
    pub fn entry(mut self, entry: Bytes) -> Self {
        self.entry = Some(entry);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn packaging(&self) -> &str {
        &self.packaging
    }

    pub fn mime_type(&self) -> &Mime {
        &self.mime_type
    }

    pub fn declared_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn declared_md5(&self) -> Option<&str> {
        self.content_md5.as_deref()
    }

    pub fn entry_part(&self) -> Option<&Bytes> {
        self.entry.as_ref()
    }

    pub fn is_multipart(&self) -> bool {
        self.entry.is_some()
    }

    pub fn is_binary(&self) -> bool {
        self.packaging == packaging::BINARY
    }

    pub fn size(&self) -> u64 {
        self.payload.len() as u64
    }

    pub fn checksum(&self) -> Checksum {
        Checksum::md5(&self.payload)
    }

    pub fn descriptor(&self) -> PackageDescriptor {
        PackageDescriptor {
            id: self.id,
            packaging: self.packaging.clone(),
            mime_type: self.mime_type.to_string(),
            filename: self.filename.clone(),
            size: self.size(),
            multipart: self.is_multipart(),
        }
    }
}

/// Summary of a package without its bytes, handed to the workflow engine
/// and written next to retained packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageDescriptor {
    pub id: Uuid,
    pub packaging: String,
    pub mime_type: String,
    pub filename: Option<String>,
    pub size: u64,
    pub multipart: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_defaults_to_binary() {
        let package = DepositPackage::new(Bytes::from_static(b"abc"), mime::TEXT_PLAIN);
        assert!(package.is_binary());
        assert!(!package.is_multipart());
        assert_eq!(package.size(), 3);
    }

    #[test]
    fn test_package_descriptor() {
        let package = DepositPackage::with_packaging(
            Bytes::from_static(b"PK"),
            "application/zip".parse().unwrap(),
            packaging::SIMPLE_ZIP,
        )
        .filename("bundle.zip")
        .entry(Bytes::from_static(b"<entry/>"));

        let descriptor = package.descriptor();
        assert_eq!(descriptor.packaging, packaging::SIMPLE_ZIP);
        assert_eq!(descriptor.filename.as_deref(), Some("bundle.zip"));
        assert!(descriptor.multipart);
    }
}
