mod memory;
mod provider;

pub use memory::{MemoryContentStore, MemoryScope};
pub use provider::{Committed, ContentStore, StoreError, StoreScope};

use crate::model::{ContainerId, Group, UnitId};

/// Containers whose groups currently reference `unit`, in the order the
/// unit was first linked into each. Duplicates are removed.
pub async fn containers_referencing(
    scope: &dyn StoreScope,
    unit: UnitId,
) -> Result<Vec<ContainerId>, StoreError> {
    let mut containers = Vec::new();
    for group in scope.groups_referencing(unit).await? {
        if !containers.contains(&group.container) {
            containers.push(group.container);
        }
    }
    Ok(containers)
}

/// The group called `name` in `container`, if present.
pub async fn find_group(
    scope: &dyn StoreScope,
    container: ContainerId,
    name: &str,
) -> Result<Option<Group>, StoreError> {
    Ok(scope
        .groups(container)
        .await?
        .into_iter()
        .find(|g| g.name == name))
}

/// The group called `name` in `container`, created if missing.
pub async fn ensure_group(
    scope: &mut dyn StoreScope,
    container: ContainerId,
    name: &str,
) -> Result<Group, StoreError> {
    match find_group(&*scope, container, name).await? {
        Some(group) => Ok(group),
        None => scope.create_group(container, name).await,
    }
}
