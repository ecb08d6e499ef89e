mod archive;
mod feed;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub use archive::SimpleZipDisseminator;
pub use feed::AtomFeedDisseminator;

use crate::error::SwordError;
use crate::model::{Container, ContentUnit, ORIGINAL_GROUP};
use crate::negotiation::MediaRange;
use crate::store::{find_group, StoreScope};
use crate::urls::UrlManager;

/// Renders a container's stored content into one external representation.
#[async_trait]
pub trait Disseminator: Send + Sync + Debug {
    fn name(&self) -> &'static str;

    fn content_type(&self) -> &str;

    /// Packaging identifier produced, if the representation is a package.
    fn packaging(&self) -> Option<&str>;

    fn is_syndication(&self) -> bool {
        false
    }

    fn produces(&self, range: &MediaRange) -> bool {
        range.matches(self.content_type())
    }

    /// A packaging constraint is only met by a disseminator producing
    /// exactly that packaging.
    fn supports_packaging(&self, packaging: Option<&str>) -> bool {
        match packaging {
            None => true,
            Some(p) => self.packaging() == Some(p),
        }
    }

    async fn disseminate(
        &self,
        scope: &dyn StoreScope,
        container: &Container,
    ) -> Result<Bytes, SwordError>;
}

/// Disseminators in registration order. The first registered one is the
/// default when any type is acceptable.
#[derive(Debug, Clone, Default)]
pub struct DisseminatorRegistry {
    disseminators: Vec<Arc<dyn Disseminator>>,
}

impl DisseminatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simple zip archive (default) and atom feed.
    pub fn with_defaults(urls: UrlManager) -> Self {
        Self::new()
            .register(Arc::new(SimpleZipDisseminator))
            .register(Arc::new(AtomFeedDisseminator::new(urls)))
    }

    pub fn register(mut self, disseminator: Arc<dyn Disseminator>) -> Self {
        self.disseminators.push(disseminator);
        self
    }

    /// Walk the ranked ranges best first and return the first disseminator
    /// that produces the range and meets the packaging constraint.
    pub fn select_by_accept<'r>(
        &self,
        ranked: &'r [MediaRange],
        packaging: Option<&str>,
    ) -> Option<(Arc<dyn Disseminator>, &'r MediaRange)> {
        ranked.iter().find_map(|range| {
            self.disseminators
                .iter()
                .find(|d| d.produces(range) && d.supports_packaging(packaging))
                .map(|d| (d.clone(), range))
        })
    }

    pub fn syndication(&self) -> Option<Arc<dyn Disseminator>> {
        self.disseminators
            .iter()
            .find(|d| d.is_syndication())
            .cloned()
    }
}

/// Units of the container's original group, in link order.
pub(crate) async fn original_units(
    scope: &dyn StoreScope,
    container: &Container,
) -> Result<Vec<ContentUnit>, SwordError> {
    let Some(group) = find_group(scope, container.id, ORIGINAL_GROUP).await? else {
        return Ok(Vec::new());
    };
    let mut units = Vec::with_capacity(group.units.len());
    for id in group.units {
        if let Some(unit) = scope.unit(id).await? {
            units.push(unit);
        }
    }
    Ok(units)
}
