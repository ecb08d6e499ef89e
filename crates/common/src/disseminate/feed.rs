use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{original_units, Disseminator};
use crate::error::SwordError;
use crate::model::{Container, ContentUnit};
use crate::negotiation::MediaRange;
use crate::store::StoreScope;
use crate::urls::UrlManager;

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
const FEED_CONTENT_TYPE: &str = "application/atom+xml;type=feed";

/// Atom feed listing the units of a container's original group, each
/// linked to its own edit-media URI.
#[derive(Debug, Clone)]
pub struct AtomFeedDisseminator {
    urls: UrlManager,
}

impl AtomFeedDisseminator {
    pub fn new(urls: UrlManager) -> Self {
        Self { urls }
    }

    fn render(&self, container: &Container, units: &[ContentUnit]) -> Result<Bytes, SwordError> {
        let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        let edit_media = self.urls.edit_media(container.id).to_string();

        write(&mut w, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(
            &mut w,
            Event::Start(BytesStart::new("feed").with_attributes([("xmlns", ATOM_NS)])),
        )?;
        text_element(&mut w, "id", &edit_media)?;
        text_element(&mut w, "title", container.display_name())?;
        text_element(&mut w, "updated", &container.last_modified.to_rfc3339())?;
        write(
            &mut w,
            Event::Empty(BytesStart::new("link").with_attributes([
                ("rel", "self"),
                ("href", self.urls.feed(container.id).as_str()),
            ])),
        )?;

        for unit in units {
            let href = self.urls.unit(unit.id).to_string();
            write(&mut w, Event::Start(BytesStart::new("entry")))?;
            text_element(&mut w, "id", &format!("urn:uuid:{}", unit.id))?;
            text_element(&mut w, "title", &unit.name)?;
            text_element(&mut w, "updated", &unit.created.to_rfc3339())?;
            write(
                &mut w,
                Event::Empty(BytesStart::new("content").with_attributes([
                    ("type", unit.mime_type.as_str()),
                    ("src", href.as_str()),
                ])),
            )?;
            write(
                &mut w,
                Event::Empty(
                    BytesStart::new("link")
                        .with_attributes([("rel", "edit-media"), ("href", href.as_str())]),
                ),
            )?;
            write(&mut w, Event::End(BytesEnd::new("entry")))?;
        }

        write(&mut w, Event::End(BytesEnd::new("feed")))?;
        Ok(Bytes::from(w.into_inner().into_inner()))
    }
}

fn write(w: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), SwordError> {
    w.write_event(event)
        .map_err(|e| SwordError::Dissemination(e.to_string()))
}

fn text_element(
    w: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<(), SwordError> {
    write(w, Event::Start(BytesStart::new(name)))?;
    write(w, Event::Text(BytesText::new(text)))?;
    write(w, Event::End(BytesEnd::new(name)))
}

#[async_trait]
impl Disseminator for AtomFeedDisseminator {
    fn name(&self) -> &'static str {
        "AtomFeed"
    }

    fn content_type(&self) -> &str {
        FEED_CONTENT_TYPE
    }

    fn packaging(&self) -> Option<&str> {
        None
    }

    fn is_syndication(&self) -> bool {
        true
    }

    fn produces(&self, range: &MediaRange) -> bool {
        range.matches(FEED_CONTENT_TYPE)
    }

    async fn disseminate(
        &self,
        scope: &dyn StoreScope,
        container: &Container,
    ) -> Result<Bytes, SwordError> {
        let units = original_units(scope, container).await?;
        self.render(container, &units)
    }
}
