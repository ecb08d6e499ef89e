use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{ContainerId, ContentUnit};

/// What a successful deposit produced. Input to receipt rendering.
#[derive(Debug, Clone, Serialize)]
pub struct DepositResult {
    pub container: ContainerId,
    /// Units created by the ingester and linked into the original group.
    pub units: Vec<ContentUnit>,
    /// Verbatim copy of the deposit package, when originals are kept.
    pub stored_package: Option<ContentUnit>,
    pub ingester: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl DepositResult {
    /// The unit a bare file receipt points at.
    pub fn original_deposit(&self) -> Option<&ContentUnit> {
        self.units.first()
    }
}
