// Termination Policy
// Decides after every cycle whether the crawl continues

use crate::domain::StopReason;
use std::time::Duration;

/// Inputs consulted once per cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleObservation {
    /// 1-based cycle number
    pub cycle: u32,
    pub collected: usize,
    pub target: usize,
    /// At least one new identifier this cycle
    pub grew: bool,
    pub end_signal_seen: bool,
    pub consecutive_no_growth_cycles: u32,
    pub since_last_growth: Duration,
    /// Elements the extractor matched on its last snapshot this cycle
    pub extractable_elements: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

#[derive(Debug, Clone)]
pub struct TerminationPolicy {
    growth_window: Duration,
    max_cycles: Option<u32>,
}

impl TerminationPolicy {
    /// `max_cycles` is `Some` only for bounded strategies
    pub fn new(growth_window: Duration, max_cycles: Option<u32>) -> Self {
        Self {
            growth_window,
            max_cycles,
        }
    }

    pub fn growth_window(&self) -> Duration {
        self.growth_window
    }

    /// Rules in priority order; the first match wins.
    ///
    /// The target always beats an end signal seen in the same cycle, and the
    /// no-elements guard only fires on a first cycle that never grew.
    pub fn evaluate(&self, obs: &CycleObservation) -> Decision {
        if obs.collected >= obs.target {
            return Decision::Stop(StopReason::TargetReached);
        }
        if obs.end_signal_seen {
            return Decision::Stop(StopReason::EndOfResults);
        }
        if obs.since_last_growth >= self.growth_window {
            return Decision::Stop(StopReason::Exhausted);
        }
        if obs.cycle == 1 && obs.collected == 0 && obs.extractable_elements == 0 {
            return Decision::Stop(StopReason::NoExtractableElements);
        }
        if let Some(max) = self.max_cycles {
            if obs.cycle >= max {
                return Decision::Stop(StopReason::CycleLimit);
            }
        }
        Decision::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15);

    fn obs() -> CycleObservation {
        CycleObservation {
            cycle: 2,
            collected: 5,
            target: 10,
            grew: true,
            end_signal_seen: false,
            consecutive_no_growth_cycles: 0,
            since_last_growth: Duration::ZERO,
            extractable_elements: 8,
        }
    }

    fn policy() -> TerminationPolicy {
        TerminationPolicy::new(WINDOW, None)
    }

    #[test]
    fn test_continue_while_growing() {
        assert_eq!(policy().evaluate(&obs()), Decision::Continue);
    }

    #[test]
    fn test_target_reached() {
        let o = CycleObservation {
            collected: 10,
            ..obs()
        };
        assert_eq!(
            policy().evaluate(&o),
            Decision::Stop(StopReason::TargetReached)
        );
    }

    #[test]
    fn test_target_wins_over_end_signal() {
        let o = CycleObservation {
            collected: 10,
            end_signal_seen: true,
            ..obs()
        };
        assert_eq!(
            policy().evaluate(&o),
            Decision::Stop(StopReason::TargetReached)
        );
    }

    #[test]
    fn test_end_signal_stops_partial() {
        let o = CycleObservation {
            end_signal_seen: true,
            ..obs()
        };
        assert_eq!(
            policy().evaluate(&o),
            Decision::Stop(StopReason::EndOfResults)
        );
    }

    #[test]
    fn test_growth_window_elapsed_is_exhausted() {
        let o = CycleObservation {
            grew: false,
            consecutive_no_growth_cycles: 3,
            since_last_growth: WINDOW,
            ..obs()
        };
        assert_eq!(policy().evaluate(&o), Decision::Stop(StopReason::Exhausted));
    }

    #[test]
    fn test_just_under_window_continues() {
        let o = CycleObservation {
            grew: false,
            since_last_growth: WINDOW - Duration::from_millis(1),
            ..obs()
        };
        assert_eq!(policy().evaluate(&o), Decision::Continue);
    }

    #[test]
    fn test_guard_fires_on_pristine_first_cycle() {
        let o = CycleObservation {
            cycle: 1,
            collected: 0,
            grew: false,
            since_last_growth: Duration::from_secs(8),
            extractable_elements: 0,
            ..obs()
        };
        assert_eq!(
            policy().evaluate(&o),
            Decision::Stop(StopReason::NoExtractableElements)
        );
    }

    #[test]
    fn test_guard_ignores_later_cycles() {
        let o = CycleObservation {
            cycle: 3,
            collected: 0,
            grew: false,
            since_last_growth: Duration::from_secs(8),
            extractable_elements: 0,
            ..obs()
        };
        assert_eq!(policy().evaluate(&o), Decision::Continue);
    }

    #[test]
    fn test_guard_ignores_first_cycle_with_elements() {
        let o = CycleObservation {
            cycle: 1,
            collected: 0,
            grew: false,
            extractable_elements: 4,
            ..obs()
        };
        assert_eq!(policy().evaluate(&o), Decision::Continue);
    }

    #[test]
    fn test_cycle_limit_for_bounded_strategy() {
        let bounded = TerminationPolicy::new(WINDOW, Some(10));
        let o = CycleObservation { cycle: 10, ..obs() };
        assert_eq!(bounded.evaluate(&o), Decision::Stop(StopReason::CycleLimit));

        let o = CycleObservation { cycle: 9, ..obs() };
        assert_eq!(bounded.evaluate(&o), Decision::Continue);
    }
}
