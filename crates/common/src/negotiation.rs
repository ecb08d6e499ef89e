use std::sync::Arc;

use mime::Mime;

use crate::disseminate::{Disseminator, DisseminatorRegistry};
use crate::error::SwordError;
use crate::model::packaging;
use crate::trace::Trace;

/// One entry of an Accept header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub range: Mime,
    pub quality: f32,
    /// Position in the header, used to break quality ties
    pub position: usize,
}

impl MediaRange {
    pub fn new(range: Mime, quality: f32) -> Self {
        Self {
            range,
            quality,
            position: 0,
        }
    }

    /// Whether `content_type` falls inside this range. Parameters other
    /// than the type and subtype are ignored.
    pub fn matches(&self, content_type: &str) -> bool {
        let Ok(content_type) = content_type.parse::<Mime>() else {
            return false;
        };
        (self.range.type_() == mime::STAR || self.range.type_() == content_type.type_())
            && (self.range.subtype() == mime::STAR
                || self.range.subtype() == content_type.subtype())
    }
}

/// Parse an Accept header into media ranges ranked by quality, highest
/// first; equal qualities keep header order.
///
/// Quality defaults to 1.0. Entries that are not media ranges, or whose
/// quality is not a number in [0, 1], are skipped. Entries with quality 0
/// are dropped since they mark a type as unacceptable.
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    let mut ranges: Vec<MediaRange> = header
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .filter_map(|(position, entry)| {
            let range: Mime = match entry.parse() {
                Ok(range) => range,
                Err(_) => {
                    tracing::debug!(entry, "skipping malformed accept entry");
                    return None;
                }
            };
            let quality = match range.get_param("q") {
                None => 1.0,
                Some(q) => match q.as_str().parse::<f32>() {
                    Ok(q) if (0.0..=1.0).contains(&q) => q,
                    _ => {
                        tracing::debug!(entry, "skipping accept entry with invalid quality");
                        return None;
                    }
                },
            };
            Some(MediaRange {
                range,
                quality,
                position,
            })
        })
        .filter(|r| r.quality > 0.0)
        .collect();

    ranges.sort_by(|a, b| b.quality.total_cmp(&a.quality));
    ranges
}

/// Negotiation input taken from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegotiationRequest<'a> {
    pub accept: Option<&'a str>,
    pub accept_packaging: Option<&'a str>,
    /// Force the syndication representation, ignoring both headers
    pub feed: bool,
}

impl<'a> NegotiationRequest<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn accept_packaging(mut self, packaging: &'a str) -> Self {
        self.accept_packaging = Some(packaging);
        self
    }

    pub fn feed(mut self) -> Self {
        self.feed = true;
        self
    }
}

/// The chosen representation.
#[derive(Debug, Clone)]
pub struct Negotiated {
    pub disseminator: Arc<dyn Disseminator>,
    pub content_type: String,
    pub packaging: Option<String>,
    pub quality: f32,
}

#[derive(Debug, Clone)]
pub struct NegotiationEngine {
    registry: Arc<DisseminatorRegistry>,
    default_packaging: String,
}

impl NegotiationEngine {
    pub fn new(registry: Arc<DisseminatorRegistry>) -> Self {
        Self {
            registry,
            default_packaging: packaging::SIMPLE_ZIP.to_string(),
        }
    }

    /// Pick a disseminator for the request.
    ///
    /// Without an Accept header every type is acceptable at 1.0, so the
    /// first registered disseminator handling the packaging wins.
    pub fn negotiate(
        &self,
        request: &NegotiationRequest<'_>,
        trace: &mut Trace,
    ) -> Result<Negotiated, SwordError> {
        if request.feed {
            let disseminator = self.registry.syndication().ok_or_else(|| {
                SwordError::NotAcceptable("no syndication representation available".to_string())
            })?;
            trace.append(format!(
                "Feed requested; using {} disseminator",
                disseminator.name()
            ));
            return Ok(Negotiated {
                content_type: disseminator.content_type().to_string(),
                packaging: None,
                quality: 1.0,
                disseminator,
            });
        }

        let packaging = request
            .accept_packaging
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.default_packaging);

        let ranked = match request.accept.map(str::trim).filter(|a| !a.is_empty()) {
            None => vec![MediaRange::new(mime::STAR_STAR, 1.0)],
            Some(accept) => parse_accept(accept),
        };

        let (disseminator, range) = self
            .registry
            .select_by_accept(&ranked, Some(packaging))
            .ok_or_else(|| {
                SwordError::NotAcceptable(format!(
                    "no representation satisfies Accept: {} with packaging {}",
                    request.accept.unwrap_or("*/*"),
                    packaging
                ))
            })?;

        trace.append(format!(
            "Negotiated {} ({}) at q={}",
            disseminator.content_type(),
            packaging,
            range.quality
        ));
        Ok(Negotiated {
            content_type: disseminator.content_type().to_string(),
            packaging: disseminator.packaging().map(str::to_string),
            quality: range.quality,
            disseminator,
        })
    }
}
