use url::Url;

use crate::error::SwordError;
use crate::model::{ContainerId, UnitId};

const EDIT_MEDIA: &str = "edit-media";
const UNIT_SEGMENT: &str = "unit";
const FEED_SUFFIX: &str = ".atom";

/// What an edit-media URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaTarget {
    /// The media resource of a whole container. `feed` selects the
    /// syndication representation.
    Container { id: ContainerId, feed: bool },
    /// A single content unit.
    Unit(UnitId),
}

impl MediaTarget {
    pub fn is_feed(&self) -> bool {
        matches!(self, Self::Container { feed: true, .. })
    }
}

/// Maps between edit-media URIs and store targets.
#[derive(Debug, Clone)]
pub struct UrlManager {
    base: Url,
}

impl UrlManager {
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve an absolute URI or a path. Anything that does not name an
    /// edit-media resource is reported as not found.
    pub fn parse(&self, uri: &str) -> Result<MediaTarget, SwordError> {
        let url = self
            .base
            .join(uri)
            .map_err(|_| SwordError::not_found(format!("unable to resolve {uri}")))?;
        let not_found = || SwordError::not_found(format!("no media resource at {uri}"));
        if url.origin() != self.base.origin() {
            return Err(not_found());
        }

        let rest = url
            .path()
            .strip_prefix(self.base.path())
            .and_then(|p| p.strip_prefix(EDIT_MEDIA))
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(not_found)?;

        let segments: Vec<&str> = rest.split('/').collect();
        match segments.as_slice() {
            [UNIT_SEGMENT, id] => id.parse().map(MediaTarget::Unit).map_err(|_| not_found()),
            [id] => {
                let (id, feed) = match id.strip_suffix(FEED_SUFFIX) {
                    Some(id) => (id, true),
                    None => (*id, false),
                };
                id.parse()
                    .map(|id| MediaTarget::Container { id, feed })
                    .map_err(|_| not_found())
            }
            _ => Err(not_found()),
        }
    }

    fn join(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(&format!("{}{}", self.base.path(), path));
        url
    }

    pub fn edit_media(&self, container: ContainerId) -> Url {
        self.join(&format!("{EDIT_MEDIA}/{container}"))
    }

    pub fn feed(&self, container: ContainerId) -> Url {
        self.join(&format!("{EDIT_MEDIA}/{container}{FEED_SUFFIX}"))
    }

    pub fn unit(&self, unit: UnitId) -> Url {
        self.join(&format!("{EDIT_MEDIA}/{UNIT_SEGMENT}/{unit}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> UrlManager {
        UrlManager::new(Url::parse("http://repo.example/sword").unwrap())
    }

    #[test]
    fn test_parse_rejects_foreign_origin() {
        let urls = manager();
        let container = ContainerId::generate();

        for uri in [
            format!("http://elsewhere.example/sword/edit-media/{container}"),
            format!("https://repo.example/sword/edit-media/{container}"),
            format!("http://repo.example:8443/sword/edit-media/{container}"),
        ] {
            assert!(
                matches!(urls.parse(&uri), Err(SwordError::NotFound(_))),
                "{uri} should not resolve"
            );
        }
        assert!(urls.parse(&format!("edit-media/{container}")).is_ok());
    }

    #[test]
    fn test_parse_container_feed_and_unit() {
        let urls = manager();
        let container = ContainerId::generate();
        let unit = UnitId::generate();

        assert_eq!(
            urls.parse(urls.edit_media(container).as_str()).unwrap(),
            MediaTarget::Container {
                id: container,
                feed: false
            }
        );
        assert_eq!(
            urls.parse(urls.feed(container).as_str()).unwrap(),
            MediaTarget::Container {
                id: container,
                feed: true
            }
        );
        assert_eq!(
            urls.parse(&format!("/sword/edit-media/unit/{unit}")).unwrap(),
            MediaTarget::Unit(unit)
        );
    }

    #[test]
    fn test_parse_rejects_foreign_paths() {
        let urls = manager();
        for uri in [
            "http://repo.example/other/edit-media/x",
            "/sword/edit-media/not-a-uuid",
            "/sword/edit-media/unit",
            "/sword/collection/1",
        ] {
            assert!(
                matches!(urls.parse(uri), Err(SwordError::NotFound(_))),
                "{uri} should not resolve"
            );
        }
    }

    #[test]
    fn test_builds_locations_under_base() {
        let urls = manager();
        let unit = UnitId::generate();
        assert_eq!(
            urls.unit(unit).as_str(),
            format!("http://repo.example/sword/edit-media/unit/{unit}")
        );
    }
}
