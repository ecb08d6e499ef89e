use std::collections::HashSet;
use std::io::{Cursor, Write};

use async_trait::async_trait;
use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{original_units, Disseminator};
use crate::error::SwordError;
use crate::model::{packaging, Container};
use crate::store::StoreScope;

/// Zip archive of every unit in the container's original group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleZipDisseminator;

#[async_trait]
impl Disseminator for SimpleZipDisseminator {
    fn name(&self) -> &'static str {
        "SimpleZip"
    }

    fn content_type(&self) -> &str {
        "application/zip"
    }

    fn packaging(&self) -> Option<&str> {
        Some(packaging::SIMPLE_ZIP)
    }

    async fn disseminate(
        &self,
        scope: &dyn StoreScope,
        container: &Container,
    ) -> Result<Bytes, SwordError> {
        let mut files = Vec::new();
        for unit in original_units(scope, container).await? {
            let data = scope.read_unit(unit.id).await?;
            files.push((unit.name, data));
        }
        write_archive(files)
    }
}

fn write_archive(files: Vec<(String, Bytes)>) -> Result<Bytes, SwordError> {
    let zip_err = |e: zip::result::ZipError| SwordError::Dissemination(e.to_string());
    let io_err = |e: std::io::Error| SwordError::Dissemination(e.to_string());

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let mut used = HashSet::new();

    for (index, (name, data)) in files.into_iter().enumerate() {
        // two units may carry the same name
        let name = if used.contains(&name) {
            format!("{index}-{name}")
        } else {
            name
        };
        used.insert(name.clone());

        writer.start_file(name, options).map_err(zip_err)?;
        writer.write_all(&data).map_err(io_err)?;
    }

    let cursor = writer.finish().map_err(zip_err)?;
    Ok(Bytes::from(cursor.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_archive_dedupes_names() {
        let archive = write_archive(vec![
            ("a.txt".into(), Bytes::from_static(b"one")),
            ("a.txt".into(), Bytes::from_static(b"two")),
        ])
        .unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
        assert_eq!(zip.len(), 2);
        let mut second = String::new();
        zip.by_name("1-a.txt")
            .unwrap()
            .read_to_string(&mut second)
            .unwrap();
        assert_eq!(second, "two");
    }

    #[test]
    fn test_empty_archive_is_valid() {
        let archive = write_archive(Vec::new()).unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(archive.to_vec())).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
