// Acquisition strategies: seed page, scroll actions and cycle bound

use crate::config::CrawlConfig;
use rand::Rng;
use std::time::Duration;

/// Channel-type filter appended to search URLs
const SEARCH_CHANNEL_FILTER: &str = "EgIQAg%253D%253D";

pub const SCROLL_KEY: &str = "End";
pub const SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollBy(0, document.body.scrollHeight);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    /// Unbounded: cycle until the policy stops
    Search,
    /// Bounded homepage browsing
    Discovery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollAction {
    Key(&'static str),
    Script(&'static str),
}

/// Uniform jitter range for the per-cycle settle wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleRange {
    pub min: Duration,
    pub max: Duration,
}

impl SettleRange {
    pub fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max.max(min)),
        }
    }

    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub seed_url: String,
    pub max_cycles: Option<u32>,
    pub settle: SettleRange,
    pub scroll_actions: Vec<ScrollAction>,
}

impl Strategy {
    pub fn for_query(query: &str, config: &CrawlConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');

        if config.is_discovery(query) {
            return Self {
                kind: StrategyKind::Discovery,
                seed_url: format!("{}/", base),
                max_cycles: Some(config.discovery_cycles),
                settle: SettleRange::from_millis(
                    config.discovery_settle_min_ms,
                    config.discovery_settle_max_ms,
                ),
                scroll_actions: vec![ScrollAction::Key(SCROLL_KEY)],
            };
        }

        let encoded: String = url::form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        Self {
            kind: StrategyKind::Search,
            seed_url: format!(
                "{}/results?search_query={}&sp={}",
                base, encoded, SEARCH_CHANNEL_FILTER
            ),
            max_cycles: None,
            settle: SettleRange::from_millis(
                config.search_settle_min_ms,
                config.search_settle_max_ms,
            ),
            scroll_actions: vec![
                ScrollAction::Key(SCROLL_KEY),
                ScrollAction::Script(SCROLL_TO_BOTTOM_SCRIPT),
            ],
        }
    }
}
