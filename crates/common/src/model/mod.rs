mod container;
mod content;
mod group;
mod ids;
mod package;
mod principal;
mod result;

pub use container::Container;
pub use content::{Checksum, ContentUnit, UnitDraft};
pub use group::{Group, DEPOSIT_GROUP, ORIGINAL_GROUP};
pub use ids::{ContainerId, GroupId, UnitId};
pub use package::{packaging, DepositPackage, PackageDescriptor};
pub use principal::{Credentials, Principal};
pub use result::DepositResult;
