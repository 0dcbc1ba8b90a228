//! Shared fixtures for the scenario tests

use chanscout_core::application::{CrawlLoop, JobRegistry, LinkExtractor};
use chanscout_core::port::browser::mocks::ScriptedBrowser;
use chanscout_core::port::clock::mocks::ManualClock;
use chanscout_core::port::completion::mocks::RecordingListener;
use chanscout_core::port::id_provider::mocks::SequentialIdProvider;
use chanscout_core::CrawlConfig;
use std::sync::Arc;

pub const BASE: &str = "https://www.youtube.com";

/// Relative handle link as it appears in page markup
pub fn href(name: &str) -> String {
    format!("/@{}", name)
}

/// Normalized identifier the extractor produces for `href(name)`
pub fn channel(name: &str) -> String {
    format!("{}/@{}", BASE, name)
}

pub fn channels(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| channel(n)).collect()
}

pub fn crawl_loop(browser: &ScriptedBrowser, clock: Arc<ManualClock>, config: CrawlConfig) -> CrawlLoop {
    let extractor = Arc::new(LinkExtractor::from_config(&config).unwrap());
    CrawlLoop::new(
        Arc::new(browser.clone()),
        clock,
        extractor,
        Arc::new(config),
    )
}

pub struct Harness {
    pub registry: JobRegistry,
    pub browser: ScriptedBrowser,
    pub clock: Arc<ManualClock>,
    pub listener: Arc<RecordingListener>,
}

pub fn harness(browser: ScriptedBrowser, config: CrawlConfig) -> Harness {
    let clock = Arc::new(ManualClock::default());
    let listener = Arc::new(RecordingListener::new());
    let registry = JobRegistry::new(
        config,
        Arc::new(browser.clone()),
        Arc::new(SequentialIdProvider::new()),
        clock.clone(),
        listener.clone(),
    )
    .unwrap();
    Harness {
        registry,
        browser,
        clock,
        listener,
    }
}

/// Yield to other tasks until `cond` holds
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..100_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
