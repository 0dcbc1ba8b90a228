// Crawl Loop - scroll, settle, extract, evaluate until the policy stops

pub mod strategy;

pub use strategy::{ScrollAction, SettleRange, Strategy, StrategyKind};

use crate::application::cancellation::CancellationToken;
use crate::application::extractor::LinkExtractor;
use crate::application::termination::{CycleObservation, Decision, TerminationPolicy};
use crate::config::CrawlConfig;
use crate::domain::{ChannelId, CollectedSet, StopReason};
use crate::port::{BrowserError, BrowserLauncher, BrowserSession, Clock, ReadyCondition};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Per-cycle phases (logged at debug level)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Idle,
    Scrolling,
    Extracting,
    Evaluating,
    Stopped,
}

/// How a crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    Stopped(StopReason),
    Cancelled,
    Failed(BrowserError),
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub status: CrawlStatus,
    /// First-discovery order, never longer than the target
    pub collected: Vec<ChannelId>,
    pub cycles: u32,
}

/// Mutable state of one crawl invocation
struct CrawlState {
    collected: CollectedSet,
    cycles: u32,
    last_growth_at: i64,
    no_growth_cycles: u32,
}

/// Drives one job at a time; clone it to run jobs side by side.
#[derive(Clone)]
pub struct CrawlLoop {
    launcher: Arc<dyn BrowserLauncher>,
    clock: Arc<dyn Clock>,
    extractor: Arc<LinkExtractor>,
    config: Arc<CrawlConfig>,
}

impl CrawlLoop {
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        clock: Arc<dyn Clock>,
        extractor: Arc<LinkExtractor>,
        config: Arc<CrawlConfig>,
    ) -> Self {
        Self {
            launcher,
            clock,
            extractor,
            config,
        }
    }

    /// Run one crawl to completion.
    ///
    /// Never returns an error: browser failures become `CrawlStatus::Failed`.
    /// The session is closed on every path once it was opened.
    pub async fn run(&self, query: &str, target: usize, token: &CancellationToken) -> CrawlOutcome {
        let mut state = CrawlState {
            collected: CollectedSet::with_capacity(target),
            cycles: 0,
            last_growth_at: self.clock.now_millis(),
            no_growth_cycles: 0,
        };

        if token.is_cancelled() {
            info!("Cancelled before start, browser not opened");
            return Self::outcome(CrawlStatus::Cancelled, state);
        }

        let strategy = Strategy::for_query(query, &self.config);
        info!(
            strategy = ?strategy.kind,
            seed_url = %strategy.seed_url,
            target_count = target,
            "Launching browser"
        );

        let mut session = match self.launcher.open().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Browser launch failed");
                return Self::outcome(CrawlStatus::Failed(e), state);
            }
        };

        let status = match self
            .drive(session.as_ref(), &strategy, token, &mut state)
            .await
        {
            Ok(status) => status,
            Err(e) => {
                error!(
                    error = %e,
                    cycle = state.cycles,
                    collected = state.collected.len(),
                    "Browser interaction failed, stopping crawl"
                );
                CrawlStatus::Failed(e)
            }
        };

        debug!("Closing browser");
        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to close browser session (non-fatal)");
        }

        info!(
            status = ?status,
            cycles = state.cycles,
            collected = state.collected.len(),
            "Crawl finished"
        );
        Self::outcome(status, state)
    }

    fn outcome(status: CrawlStatus, state: CrawlState) -> CrawlOutcome {
        CrawlOutcome {
            status,
            collected: state.collected.into_vec(),
            cycles: state.cycles,
        }
    }

    async fn drive(
        &self,
        session: &dyn BrowserSession,
        strategy: &Strategy,
        token: &CancellationToken,
        state: &mut CrawlState,
    ) -> Result<CrawlStatus, BrowserError> {
        let policy = TerminationPolicy::new(self.config.growth_window(), strategy.max_cycles);

        session
            .navigate(
                &strategy.seed_url,
                ReadyCondition::NetworkIdle,
                self.config.navigation_timeout(),
            )
            .await?;
        if token.is_cancelled() {
            info!("Cancellation observed after seed navigation, skipping settle");
            return Ok(CrawlStatus::Cancelled);
        }
        self.clock.sleep(self.config.seed_settle()).await;
        state.last_growth_at = self.clock.now_millis();
        self.enter(CrawlPhase::Idle, state.cycles);

        loop {
            if token.is_cancelled() {
                info!(
                    cycle = state.cycles,
                    collected = state.collected.len(),
                    "Cancellation observed at cycle boundary"
                );
                return Ok(CrawlStatus::Cancelled);
            }
            state.cycles += 1;
            let cycle = state.cycles;

            self.enter(CrawlPhase::Scrolling, cycle);
            for action in &strategy.scroll_actions {
                match action {
                    ScrollAction::Key(key) => session.send_key(key).await?,
                    ScrollAction::Script(script) => session.evaluate_script(script).await?,
                }
            }
            self.clock.sleep(strategy.settle.sample()).await;

            self.enter(CrawlPhase::Extracting, cycle);
            let before = state.collected.len();
            let elements = self.await_growth(session, state, &policy, cycle).await?;
            let grew = state.collected.len() > before;
            if grew {
                state.last_growth_at = self.clock.now_millis();
                state.no_growth_cycles = 0;
            } else {
                state.no_growth_cycles += 1;
            }

            self.enter(CrawlPhase::Evaluating, cycle);
            let end_signal_seen = session.end_of_results().await?;
            let observation = CycleObservation {
                cycle,
                collected: state.collected.len(),
                target: state.collected.capacity(),
                grew,
                end_signal_seen,
                consecutive_no_growth_cycles: state.no_growth_cycles,
                since_last_growth: self.since(state.last_growth_at),
                extractable_elements: elements,
            };
            debug!(?observation, "Cycle observed");

            match policy.evaluate(&observation) {
                Decision::Continue => continue,
                Decision::Stop(reason) => {
                    self.enter(CrawlPhase::Stopped, cycle);
                    if reason.is_success() {
                        info!(reason = %reason, cycle, collected = observation.collected, "Stopping crawl");
                    } else {
                        warn!(
                            reason = %reason,
                            cycle,
                            "No extractable elements on first cycle, stopping to avoid an endless loop"
                        );
                    }
                    return Ok(CrawlStatus::Stopped(reason));
                }
            }
        }
    }

    /// Snapshot and merge until something new appears, the set fills up,
    /// the pristine page proves empty, or the growth window runs out.
    /// Returns the element count of the last snapshot.
    async fn await_growth(
        &self,
        session: &dyn BrowserSession,
        state: &mut CrawlState,
        policy: &TerminationPolicy,
        cycle: u32,
    ) -> Result<usize, BrowserError> {
        let selectors = self.extractor.selectors();
        loop {
            session
                .wait_for_selector(&self.config.ready_selector, self.config.selector_timeout())
                .await?;
            let snapshot = session.query_snapshot(&selectors).await?;
            let extraction = self.extractor.extract(&snapshot);
            let elements = extraction.elements;
            let added = state.collected.merge(extraction.ids);

            debug!(cycle, elements, added, total = state.collected.len(), "Snapshot extracted");

            if added > 0 || state.collected.is_full() {
                return Ok(elements);
            }
            if cycle == 1 && state.collected.is_empty() && elements == 0 {
                return Ok(elements);
            }
            if self.since(state.last_growth_at) >= policy.growth_window() {
                return Ok(elements);
            }
            self.clock.sleep(self.config.poll_interval()).await;
        }
    }

    fn since(&self, earlier_millis: i64) -> Duration {
        let elapsed = self.clock.now_millis().saturating_sub(earlier_millis);
        Duration::from_millis(elapsed.max(0) as u64)
    }

    fn enter(&self, phase: CrawlPhase, cycle: u32) {
        debug!(?phase, cycle, "Crawl phase");
    }
}
