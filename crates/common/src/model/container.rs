use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContainerId;

/// A repository object. Containers own named groups of content units;
/// they are created and owned by the store, this crate only references them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    /// Persistent handle, e.g. `123456789/42`
    pub handle: String,
    pub title: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl Container {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            id: ContainerId::generate(),
            handle: handle.into(),
            title: None,
            last_modified: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: ContainerId) -> Self {
        self.id = id;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title if set, otherwise the handle.
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.handle)
    }
}
