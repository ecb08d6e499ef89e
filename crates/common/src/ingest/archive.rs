use std::io::{Cursor, Read};

use async_trait::async_trait;
use bytes::Bytes;
use zip::ZipArchive;

use super::{AcceptPolicy, Ingester, PolicyViolation};
use crate::error::SwordError;
use crate::model::{packaging, ContentUnit, DepositPackage, UnitDraft};
use crate::store::StoreScope;
use crate::trace::Trace;

/// Unpacks a zip archive; every file entry becomes a unit whose MIME type
/// is guessed from its extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleZipIngester;

/// Read every file entry up front; the archive is not held across awaits.
///
/// `limit` bounds the total expanded size. Entry sizes declared in the
/// archive are not trusted; each entry is read through a cap of whatever
/// is left of the limit.
fn extract(payload: &Bytes, limit: Option<u64>) -> Result<Vec<(String, Bytes)>, SwordError> {
    let malformed = |e: zip::result::ZipError| PolicyViolation::MalformedPackage(e.to_string());
    let mut archive = ZipArchive::new(Cursor::new(payload.clone())).map_err(malformed)?;

    let mut expanded: u64 = 0;
    let mut files = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(malformed)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry
            .enclosed_name()
            .map(|path| path.to_string_lossy().replace('\\', "/"))
            .ok_or_else(|| {
                PolicyViolation::MalformedPackage(format!("unsafe entry name {}", entry.name()))
            })?;

        let mut data = Vec::new();
        let read = match limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(expanded);
                entry.by_ref().take(remaining.saturating_add(1)).read_to_end(&mut data)
            }
            None => entry.read_to_end(&mut data),
        };
        read.map_err(|e| SwordError::Ingest(format!("failed to read {name}: {e}")))?;

        expanded = expanded.saturating_add(data.len() as u64);
        if let Some(limit) = limit {
            if expanded > limit {
                return Err(PolicyViolation::TooLarge {
                    size: expanded,
                    limit,
                }
                .into());
            }
        }
        files.push((name, Bytes::from(data)));
    }

    if files.is_empty() {
        return Err(PolicyViolation::MalformedPackage("archive contains no files".into()).into());
    }
    Ok(files)
}

#[async_trait]
impl Ingester for SimpleZipIngester {
    fn name(&self) -> &'static str {
        "SimpleZip"
    }

    fn packaging(&self) -> &str {
        packaging::SIMPLE_ZIP
    }

    async fn ingest(
        &self,
        scope: &mut dyn StoreScope,
        package: &DepositPackage,
        policy: &AcceptPolicy,
        trace: &mut Trace,
    ) -> Result<Vec<ContentUnit>, SwordError> {
        let files = extract(package.payload(), policy.max_upload_size)?;
        trace.append(format!("Unpacked {} file(s) from archive", files.len()));

        let mut units = Vec::with_capacity(files.len());
        for (name, data) in files {
            let mime_type = mime_guess::from_path(&name).first_or_octet_stream();
            let unit = scope
                .create_unit(UnitDraft::new(name, mime_type, data))
                .await?;
            trace.append(format!("Stored file {} ({} bytes)", unit.name, unit.size));
            units.push(unit);
        }
        Ok(units)
    }
}
