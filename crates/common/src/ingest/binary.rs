use async_trait::async_trait;
use mime::Mime;

use super::{AcceptPolicy, Ingester};
use crate::error::SwordError;
use crate::model::{packaging, ContentUnit, DepositPackage, UnitDraft};
use crate::store::StoreScope;
use crate::trace::Trace;

/// Stores the payload as one opaque unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryIngester;

fn default_name(mime_type: &Mime) -> String {
    match mime_guess::get_mime_extensions(mime_type).and_then(|exts| exts.first()) {
        Some(ext) => format!("deposit.{ext}"),
        None => "deposit".to_string(),
    }
}

#[async_trait]
impl Ingester for BinaryIngester {
    fn name(&self) -> &'static str {
        "Binary"
    }

    fn packaging(&self) -> &str {
        packaging::BINARY
    }

    async fn ingest(
        &self,
        scope: &mut dyn StoreScope,
        package: &DepositPackage,
        _policy: &AcceptPolicy,
        trace: &mut Trace,
    ) -> Result<Vec<ContentUnit>, SwordError> {
        let name = package
            .declared_filename()
            .map(str::to_string)
            .unwrap_or_else(|| default_name(package.mime_type()));

        let unit = scope
            .create_unit(UnitDraft::new(
                name,
                package.mime_type().clone(),
                package.payload().clone(),
            ))
            .await?;
        trace.append(format!("Stored file {} ({} bytes)", unit.name, unit.size));
        Ok(vec![unit])
    }
}
