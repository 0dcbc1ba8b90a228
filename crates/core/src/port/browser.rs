// Browser Capability Port
// The core drives page navigation, scrolling and DOM queries only through these traits

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Any failure from the automation layer (navigation, crashed session,
/// selector wait timeout). The core does not distinguish between them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Browser interaction failed: {0}")]
pub struct BrowserError(String);

impl BrowserError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// When `navigate` may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyCondition {
    /// Load fired and network activity has settled
    NetworkIdle,
}

/// `href` values found under each queried selector
///
/// Groups keep the order the selectors were requested in, and hrefs keep
/// document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    groups: Vec<(String, Vec<String>)>,
}

impl PageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, selector: impl Into<String>, hrefs: Vec<String>) -> Self {
        self.push_group(selector, hrefs);
        self
    }

    pub fn push_group(&mut self, selector: impl Into<String>, hrefs: Vec<String>) {
        self.groups.push((selector.into(), hrefs));
    }

    /// Hrefs matched by `selector`; empty if it was not queried or matched nothing
    pub fn hrefs(&self, selector: &str) -> &[String] {
        self.groups
            .iter()
            .find(|(s, _)| s == selector)
            .map(|(_, hrefs)| hrefs.as_slice())
            .unwrap_or(&[])
    }

    pub fn element_count(&self) -> usize {
        self.groups.iter().map(|(_, hrefs)| hrefs.len()).sum()
    }
}

/// One live browser page. Owned by exactly one crawl loop.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        ready: ReadyCondition,
        timeout: Duration,
    ) -> Result<(), BrowserError>;

    /// Press a key on the page (e.g. "End")
    async fn send_key(&self, key: &str) -> Result<(), BrowserError>;

    async fn evaluate_script(&self, script: &str) -> Result<(), BrowserError>;

    /// Wait until `selector` matches at least one element
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    async fn query_snapshot(&self, selectors: &[&str]) -> Result<PageSnapshot, BrowserError>;

    /// End-of-results predicate.
    ///
    /// How "no more results" is recognized belongs to the adapter; the core
    /// only consumes the answer.
    async fn end_of_results(&self) -> Result<bool, BrowserError>;

    /// Release the page and its browser
    async fn close(&mut self) -> Result<(), BrowserError>;
}

/// Opens one session per crawl
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Hook = Box<dyn Fn() + Send + Sync>;

    /// Page state after a given number of End-key presses
    #[derive(Debug, Clone, Default)]
    pub struct Frame {
        /// Hrefs under the first queried selector
        pub primary: Vec<String>,
        /// Hrefs under the second queried selector
        pub fallback: Vec<String>,
    }

    impl Frame {
        pub fn primary<S: AsRef<str>>(hrefs: &[S]) -> Self {
            Self {
                primary: hrefs.iter().map(|h| h.as_ref().to_string()).collect(),
                fallback: Vec::new(),
            }
        }

        pub fn fallback<S: AsRef<str>>(hrefs: &[S]) -> Self {
            Self {
                primary: Vec::new(),
                fallback: hrefs.iter().map(|h| h.as_ref().to_string()).collect(),
            }
        }

        pub fn empty() -> Self {
            Self::default()
        }
    }

    /// Which call should fail
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FailPoint {
        Open,
        Navigate,
        /// The n-th (1-based) End-key press
        KeyPress(usize),
        Snapshot,
    }

    #[derive(Default)]
    struct State {
        frames: Vec<Frame>,
        end_after_keys: Option<usize>,
        fail_at: Option<FailPoint>,
        key_hooks: Vec<(usize, Hook)>,
        visited: Vec<String>,
        ready_conditions: Vec<ReadyCondition>,
        scripts: Vec<String>,
        navigate_hook: Option<Hook>,
    }

    /// Scripted browser: the page "grows" by one frame per End-key press
    ///
    /// Frame `n - 1` is served after the n-th press; the last frame repeats.
    /// Before any press the page shows nothing.
    #[derive(Clone, Default)]
    pub struct ScriptedBrowser {
        state: Arc<Mutex<State>>,
        interactions: Arc<AtomicUsize>,
        key_presses: Arc<AtomicUsize>,
        snapshots: Arc<AtomicUsize>,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
        open_now: Arc<AtomicUsize>,
        max_open: Arc<AtomicUsize>,
        hold: Arc<AtomicBool>,
    }

    impl ScriptedBrowser {
        pub fn new(frames: Vec<Frame>) -> Self {
            let browser = Self::default();
            browser.state.lock().unwrap().frames = frames;
            browser
        }

        /// Report end-of-results once `presses` End keys were sent
        pub fn end_signal_after(self, presses: usize) -> Self {
            self.state.lock().unwrap().end_after_keys = Some(presses);
            self
        }

        pub fn fail_at(self, point: FailPoint) -> Self {
            self.state.lock().unwrap().fail_at = Some(point);
            self
        }

        /// Run `hook` right after the n-th (1-based) End-key press
        pub fn on_key_press(self, press: usize, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.state
                .lock()
                .unwrap()
                .key_hooks
                .push((press, Box::new(hook)));
            self
        }

        /// Run `hook` once navigation finished, before `navigate` returns
        pub fn on_navigate(self, hook: impl Fn() + Send + Sync + 'static) -> Self {
            self.state.lock().unwrap().navigate_hook = Some(Box::new(hook));
            self
        }

        /// While held, every End-key press yields until `release` is called
        pub fn hold(&self) {
            self.hold.store(true, Ordering::SeqCst);
        }

        pub fn release(&self) {
            self.hold.store(false, Ordering::SeqCst);
        }

        /// Every call made through a session, close excluded
        pub fn interactions(&self) -> usize {
            self.interactions.load(Ordering::SeqCst)
        }

        pub fn key_presses(&self) -> usize {
            self.key_presses.load(Ordering::SeqCst)
        }

        pub fn snapshots(&self) -> usize {
            self.snapshots.load(Ordering::SeqCst)
        }

        pub fn opened(&self) -> usize {
            self.opened.load(Ordering::SeqCst)
        }

        pub fn closed(&self) -> usize {
            self.closed.load(Ordering::SeqCst)
        }

        /// Highest number of simultaneously open sessions seen
        pub fn max_concurrent_sessions(&self) -> usize {
            self.max_open.load(Ordering::SeqCst)
        }

        pub fn visited(&self) -> Vec<String> {
            self.state.lock().unwrap().visited.clone()
        }

        /// Ready condition requested by each `navigate`
        pub fn ready_conditions(&self) -> Vec<ReadyCondition> {
            self.state.lock().unwrap().ready_conditions.clone()
        }

        pub fn scripts(&self) -> Vec<String> {
            self.state.lock().unwrap().scripts.clone()
        }

        fn fails_at(&self, point: FailPoint) -> bool {
            self.state.lock().unwrap().fail_at == Some(point)
        }

        fn touch(&self) {
            self.interactions.fetch_add(1, Ordering::SeqCst);
        }

        fn current_frame(&self) -> Frame {
            let presses = self.key_presses();
            let state = self.state.lock().unwrap();
            if presses == 0 || state.frames.is_empty() {
                return Frame::empty();
            }
            let idx = (presses - 1).min(state.frames.len() - 1);
            state.frames[idx].clone()
        }
    }

    #[async_trait]
    impl BrowserLauncher for ScriptedBrowser {
        async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
            if self.fails_at(FailPoint::Open) {
                return Err(BrowserError::new("scripted launch failure"));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            let now_open = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_open.fetch_max(now_open, Ordering::SeqCst);
            Ok(Box::new(ScriptedSession {
                browser: self.clone(),
                closed: false,
            }))
        }
    }

    pub struct ScriptedSession {
        browser: ScriptedBrowser,
        closed: bool,
    }

    #[async_trait]
    impl BrowserSession for ScriptedSession {
        async fn navigate(
            &self,
            url: &str,
            ready: ReadyCondition,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            self.browser.touch();
            if self.browser.fails_at(FailPoint::Navigate) {
                return Err(BrowserError::new(format!("navigation timeout: {url}")));
            }
            let mut state = self.browser.state.lock().unwrap();
            state.visited.push(url.to_string());
            state.ready_conditions.push(ready);
            if let Some(hook) = &state.navigate_hook {
                hook();
            }
            Ok(())
        }

        async fn send_key(&self, _key: &str) -> Result<(), BrowserError> {
            self.browser.touch();
            while self.browser.hold.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
            let press = self.browser.key_presses.fetch_add(1, Ordering::SeqCst) + 1;
            if self.browser.fails_at(FailPoint::KeyPress(press)) {
                return Err(BrowserError::new("session crashed"));
            }
            let state = self.browser.state.lock().unwrap();
            for (at, hook) in &state.key_hooks {
                if *at == press {
                    hook();
                }
            }
            Ok(())
        }

        async fn evaluate_script(&self, script: &str) -> Result<(), BrowserError> {
            self.browser.touch();
            self.browser
                .state
                .lock()
                .unwrap()
                .scripts
                .push(script.to_string());
            Ok(())
        }

        async fn wait_for_selector(
            &self,
            _selector: &str,
            _timeout: Duration,
        ) -> Result<(), BrowserError> {
            self.browser.touch();
            Ok(())
        }

        async fn query_snapshot(&self, selectors: &[&str]) -> Result<PageSnapshot, BrowserError> {
            self.browser.touch();
            self.browser.snapshots.fetch_add(1, Ordering::SeqCst);
            if self.browser.fails_at(FailPoint::Snapshot) {
                return Err(BrowserError::new("selector wait timeout"));
            }
            let frame = self.browser.current_frame();
            let mut snapshot = PageSnapshot::new();
            if let Some(primary) = selectors.first() {
                snapshot.push_group(*primary, frame.primary);
            }
            if let Some(fallback) = selectors.get(1) {
                snapshot.push_group(*fallback, frame.fallback);
            }
            Ok(snapshot)
        }

        async fn end_of_results(&self) -> Result<bool, BrowserError> {
            self.browser.touch();
            let presses = self.browser.key_presses();
            let state = self.browser.state.lock().unwrap();
            Ok(state.end_after_keys.is_some_and(|n| presses >= n))
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            if !self.closed {
                self.closed = true;
                self.browser.closed.fetch_add(1, Ordering::SeqCst);
                self.browser.open_now.fetch_sub(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_lookup_by_selector() {
        let snapshot = PageSnapshot::new()
            .with_group("a.primary", vec!["/@one".to_string()])
            .with_group("a.fallback", vec!["/@two".to_string(), "/@three".to_string()]);

        assert_eq!(snapshot.hrefs("a.primary"), &["/@one".to_string()]);
        assert_eq!(snapshot.hrefs("a.fallback").len(), 2);
        assert!(snapshot.hrefs("a.missing").is_empty());
        assert_eq!(snapshot.element_count(), 3);
    }
}
