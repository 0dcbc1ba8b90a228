// Link Extractor
// Turns a page snapshot into normalized channel identifiers

use crate::config::CrawlConfig;
use crate::domain::ChannelId;
use crate::error::{AppError, Result};
use crate::port::PageSnapshot;
use std::collections::HashSet;
use url::Url;

/// What one snapshot yielded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Distinct identifiers in document order
    pub ids: Vec<ChannelId>,
    /// Elements matched by the selector group that was used
    pub elements: usize,
}

/// Stateless extractor. Diffing against what was already collected is the caller's job.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    base: Url,
    primary_selector: String,
    fallback_selector: String,
}

impl LinkExtractor {
    pub fn new(
        base_url: &str,
        primary_selector: impl Into<String>,
        fallback_selector: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| AppError::Config(format!("invalid base_url {}: {}", base_url, e)))?;
        if base.host_str().is_none() {
            return Err(AppError::Config(format!("base_url has no host: {}", base_url)));
        }
        Ok(Self {
            base,
            primary_selector: primary_selector.into(),
            fallback_selector: fallback_selector.into(),
        })
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.primary_selector.clone(),
            config.fallback_selector.clone(),
        )
    }

    /// Selectors to request in a snapshot, primary first
    pub fn selectors(&self) -> [&str; 2] {
        [self.primary_selector.as_str(), self.fallback_selector.as_str()]
    }

    /// Extract identifiers from the primary group, or from the fallback
    /// group (video results) when the primary group matched nothing.
    pub fn extract(&self, snapshot: &PageSnapshot) -> Extraction {
        let mut hrefs = snapshot.hrefs(&self.primary_selector);
        if hrefs.is_empty() {
            hrefs = snapshot.hrefs(&self.fallback_selector);
        }

        let mut seen = HashSet::new();
        let ids = hrefs
            .iter()
            .filter_map(|href| self.normalize(href))
            .filter(|id| seen.insert(id.clone()))
            .collect();

        Extraction {
            ids,
            elements: hrefs.len(),
        }
    }

    /// Resolve `href` to `<base origin>/channel/<id>` or `<base origin>/@<handle>`.
    ///
    /// Query string, fragment and any sub-page after the id are dropped so
    /// that tracking variants of one link collapse. Links to other hosts are rejected;
    /// `www.` and `m.` variants of the base host count as the same host.
    pub fn normalize(&self, href: &str) -> Option<ChannelId> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        let resolved = self.base.join(href).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }
        if bare_host(resolved.host_str()?) != bare_host(self.base.host_str()?) {
            return None;
        }

        // Tabs like /videos or /featured belong to the same channel
        let mut segments = resolved.path_segments()?.filter(|s| !s.is_empty());
        let path = match segments.next()? {
            "channel" => format!("/channel/{}", segments.next()?),
            handle if handle.len() > 1 && handle.starts_with('@') => format!("/{}", handle),
            _ => return None,
        };

        let origin = self.base.origin().ascii_serialization();
        Some(ChannelId::new(format!("{}{}", origin, path)))
    }
}

fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.")
        .or_else(|| host.strip_prefix("m."))
        .unwrap_or(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMARY: &str = "a.channel";
    const FALLBACK: &str = "a.video";

    fn extractor() -> LinkExtractor {
        LinkExtractor::new("https://www.youtube.com", PRIMARY, FALLBACK).unwrap()
    }

    fn hrefs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalizes_both_reference_shapes() {
        let ex = extractor();
        assert_eq!(
            ex.normalize("/channel/UC123").unwrap().as_str(),
            "https://www.youtube.com/channel/UC123"
        );
        assert_eq!(
            ex.normalize("/@lofigirl").unwrap().as_str(),
            "https://www.youtube.com/@lofigirl"
        );
    }

    #[test]
    fn test_strips_query_and_collapses_tracking_variants() {
        let snapshot = PageSnapshot::new().with_group(
            PRIMARY,
            hrefs(&[
                "/@lofigirl?si=abc",
                "/@lofigirl?si=def&pp=1",
                "https://www.youtube.com/@lofigirl/",
                "https://m.youtube.com/@lofigirl#about",
                "/@lofigirl/videos",
            ]),
        );

        let extraction = extractor().extract(&snapshot);

        assert_eq!(extraction.elements, 5);
        assert_eq!(
            extraction.ids,
            vec![ChannelId::new("https://www.youtube.com/@lofigirl")]
        );
    }

    #[test]
    fn test_rejects_non_channel_links() {
        let ex = extractor();
        assert!(ex.normalize("/watch?v=abc").is_none());
        assert!(ex.normalize("/@").is_none());
        assert!(ex.normalize("/channel/").is_none());
        assert!(ex.normalize("https://example.com/@someone").is_none());
        assert!(ex.normalize("javascript:void(0)").is_none());
        assert!(ex.normalize("").is_none());
    }

    #[test]
    fn test_falls_back_to_video_results_when_primary_is_empty() {
        let snapshot = PageSnapshot::new()
            .with_group(PRIMARY, Vec::new())
            .with_group(FALLBACK, hrefs(&["/@one", "/channel/UC2"]));

        let extraction = extractor().extract(&snapshot);

        assert_eq!(extraction.elements, 2);
        assert_eq!(extraction.ids.len(), 2);
    }

    #[test]
    fn test_fallback_ignored_when_primary_matches() {
        let snapshot = PageSnapshot::new()
            .with_group(PRIMARY, hrefs(&["/@one"]))
            .with_group(FALLBACK, hrefs(&["/@two"]));

        let extraction = extractor().extract(&snapshot);

        assert_eq!(
            extraction.ids,
            vec![ChannelId::new("https://www.youtube.com/@one")]
        );
    }

    #[test]
    fn test_nothing_found_is_empty_not_error() {
        let extraction = extractor().extract(&PageSnapshot::new());
        assert_eq!(extraction, Extraction::default());
    }

    #[test]
    fn test_preserves_document_order() {
        let snapshot =
            PageSnapshot::new().with_group(PRIMARY, hrefs(&["/@c", "/@a", "/@b", "/@a"]));

        let ids: Vec<String> = extractor()
            .extract(&snapshot)
            .ids
            .into_iter()
            .map(ChannelId::into_string)
            .collect();

        assert_eq!(
            ids,
            vec![
                "https://www.youtube.com/@c",
                "https://www.youtube.com/@a",
                "https://www.youtube.com/@b",
            ]
        );
    }
}
