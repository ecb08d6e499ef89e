use serde::{Deserialize, Serialize};

use super::{ContainerId, GroupId, UnitId};

/// Group holding the deposited content of a container.
pub const ORIGINAL_GROUP: &str = "ORIGINAL";
/// Group holding verbatim copies of deposit packages.
pub const DEPOSIT_GROUP: &str = "SWORD";

/// A named partition of a container. Units are listed in link order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub container: ContainerId,
    pub name: String,
    pub units: Vec<UnitId>,
}

impl Group {
    pub fn is_original(&self) -> bool {
        self.name == ORIGINAL_GROUP
    }

    pub fn contains(&self, unit: UnitId) -> bool {
        self.units.contains(&unit)
    }
}
