// Clock Port (for testability)

use async_trait::async_trait;
use std::time::Duration;

/// Time source and sleeper for every wait in the crawl loop
///
/// Settle intervals, growth polling and the growth window all go through
/// this trait, so tests can run a full crawl in virtual time.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Suspend for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock + tokio timer (production)
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    /// Virtual clock: `sleep` advances time instantly
    pub struct ManualClock {
        now: AtomicI64,
        sleeps: AtomicUsize,
    }

    impl ManualClock {
        pub fn new(start_millis: i64) -> Self {
            Self {
                now: AtomicI64::new(start_millis),
                sleeps: AtomicUsize::new(0),
            }
        }

        pub fn advance(&self, duration: Duration) {
            self.now
                .fetch_add(duration.as_millis() as i64, Ordering::SeqCst);
        }

        /// Number of `sleep` calls observed so far
        pub fn sleep_count(&self) -> usize {
            self.sleeps.load(Ordering::SeqCst)
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(1_000)
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }

        async fn sleep(&self, duration: Duration) {
            self.sleeps.fetch_add(1, Ordering::SeqCst);
            self.advance(duration);
            // Let other tasks observe the new time
            tokio::task::yield_now().await;
        }
    }
}
