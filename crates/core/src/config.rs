// Crawl Configuration
// Defaults reproduce the pacing of the production scraper

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Query that selects the bounded homepage strategy instead of a search
pub const DEFAULT_DISCOVERY_KEYWORD: &str = "random";

pub const DEFAULT_TARGET_COUNT: usize = 1000;

pub const DEFAULT_PRIMARY_SELECTOR: &str =
    r#"ytd-channel-renderer a[href*="/channel/"], ytd-channel-renderer a[href*="/@"]"#;

pub const DEFAULT_FALLBACK_SELECTOR: &str =
    r#"ytd-video-renderer a[href*="/channel/"], ytd-video-renderer a[href*="/@"]"#;

pub const DEFAULT_READY_SELECTOR: &str =
    "ytd-channel-renderer, ytd-grid-channel-renderer, ytd-video-renderer";

/// Crawl and scheduling settings shared by every job of a registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    pub base_url: String,
    pub discovery_keyword: String,

    /// Target used by `JobRegistry::submit`
    pub target_count: usize,
    /// Upper bound on simultaneously open browser sessions
    pub max_concurrent_jobs: usize,
    /// Cycle bound of the discovery strategy
    pub discovery_cycles: u32,

    pub navigation_timeout_ms: u64,
    pub selector_timeout_ms: u64,
    /// Wait after the seed page loaded
    pub seed_settle_ms: u64,
    pub search_settle_min_ms: u64,
    pub search_settle_max_ms: u64,
    pub discovery_settle_min_ms: u64,
    pub discovery_settle_max_ms: u64,
    /// No growth for this long ends the crawl as exhausted
    pub growth_window_ms: u64,
    /// Re-check interval inside the growth wait
    pub poll_interval_ms: u64,

    pub primary_selector: String,
    pub fallback_selector: String,
    pub ready_selector: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            discovery_keyword: DEFAULT_DISCOVERY_KEYWORD.to_string(),
            target_count: DEFAULT_TARGET_COUNT,
            max_concurrent_jobs: 2,
            discovery_cycles: 10,
            navigation_timeout_ms: 90_000,
            selector_timeout_ms: 10_000,
            seed_settle_ms: 5_000,
            search_settle_min_ms: 3_000,
            search_settle_max_ms: 5_000,
            discovery_settle_min_ms: 2_000,
            discovery_settle_max_ms: 4_000,
            growth_window_ms: 15_000,
            poll_interval_ms: 1_000,
            primary_selector: DEFAULT_PRIMARY_SELECTOR.to_string(),
            fallback_selector: DEFAULT_FALLBACK_SELECTOR.to_string(),
            ready_selector: DEFAULT_READY_SELECTOR.to_string(),
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.target_count == 0 {
            return Err(AppError::Config("target_count must be at least 1".into()));
        }
        if self.max_concurrent_jobs == 0 {
            return Err(AppError::Config(
                "max_concurrent_jobs must be at least 1".into(),
            ));
        }
        if self.growth_window_ms == 0 {
            return Err(AppError::Config("growth_window_ms must be positive".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config("poll_interval_ms must be positive".into()));
        }
        if self.search_settle_min_ms > self.search_settle_max_ms {
            return Err(AppError::Config(format!(
                "search settle range is inverted: {}..{}",
                self.search_settle_min_ms, self.search_settle_max_ms
            )));
        }
        if self.discovery_settle_min_ms > self.discovery_settle_max_ms {
            return Err(AppError::Config(format!(
                "discovery settle range is inverted: {}..{}",
                self.discovery_settle_min_ms, self.discovery_settle_max_ms
            )));
        }
        if self.discovery_keyword.trim().is_empty() {
            return Err(AppError::Config("discovery_keyword must not be empty".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| AppError::Config(format!("invalid base_url {}: {}", self.base_url, e)))?;
        Ok(())
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_millis(self.selector_timeout_ms)
    }

    pub fn seed_settle(&self) -> Duration {
        Duration::from_millis(self.seed_settle_ms)
    }

    pub fn growth_window(&self) -> Duration {
        Duration::from_millis(self.growth_window_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// True when `query` selects the discovery strategy
    pub fn is_discovery(&self, query: &str) -> bool {
        query.trim().eq_ignore_ascii_case(self.discovery_keyword.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(CrawlConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_target() {
        let config = CrawlConfig {
            target_count: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("target_count"));
    }

    #[test]
    fn test_rejects_inverted_settle_range() {
        let config = CrawlConfig {
            search_settle_min_ms: 6_000,
            search_settle_max_ms: 5_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        let config = CrawlConfig {
            base_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_discovery_keyword_is_case_insensitive() {
        let config = CrawlConfig::default();
        assert!(config.is_discovery("random"));
        assert!(config.is_discovery("  Random "));
        assert!(!config.is_discovery("random music"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: CrawlConfig =
            serde_json::from_str(r#"{"target_count": 50, "max_concurrent_jobs": 4}"#).unwrap();
        assert_eq!(config.target_count, 50);
        assert_eq!(config.max_concurrent_jobs, 4);
        assert_eq!(config.growth_window_ms, 15_000);
    }
}
