// Job Domain Model

use crate::domain::channel::ChannelId;
use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Job ID (UUID v4)
pub type JobId = String;

/// Failure context recorded when a crawl stops successfully but collects nothing
pub const EMPTY_RESULT_ERROR: &str = "no channels found";

/// Job State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Completed => write!(f, "COMPLETED"),
            JobState::Failed => write!(f, "FAILED"),
            JobState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Why a crawl stopped (audit reason code)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    /// Collected count reached the target
    TargetReached,
    /// The results page reported that nothing further exists
    EndOfResults,
    /// No growth within the wait window
    Exhausted,
    /// Bounded strategy ran all of its cycles
    CycleLimit,
    /// Pristine first cycle found no extractable elements at all
    NoExtractableElements,
}

impl StopReason {
    /// Success reasons may still yield a partial (or empty) result.
    pub fn is_success(&self) -> bool {
        !matches!(self, StopReason::NoExtractableElements)
    }

    pub fn code(&self) -> &'static str {
        match self {
            StopReason::TargetReached => "TARGET_REACHED",
            StopReason::EndOfResults => "END_OF_RESULTS",
            StopReason::Exhausted => "EXHAUSTED",
            StopReason::CycleLimit => "CYCLE_LIMIT",
            StopReason::NoExtractableElements => "NO_EXTRACTABLE_ELEMENTS",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Job Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub query: String,
    pub target_count: usize,
    pub state: JobState,

    /// Channel URLs in first-discovery order
    pub result: Vec<String>,

    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,

    pub stop_reason: Option<StopReason>,
    pub error: Option<String>,
    pub cycles: u32,
}

impl Job {
    /// Create a new Job in `Queued`
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `query` - Search query, or the discovery keyword
    /// * `target_count` - Upper bound on collected channels
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        query: impl Into<String>,
        target_count: usize,
    ) -> Self {
        Self {
            id: id.into(),
            query: query.into(),
            target_count,
            state: JobState::Queued,
            result: Vec::new(),
            created_at,
            started_at: None,
            finished_at: None,
            stop_reason: None,
            error: None,
            cycles: 0,
        }
    }

    /// Transition to Running state with explicit timestamp
    pub fn start(&mut self, now_millis: i64) -> Result<()> {
        self.expect_state(JobState::Queued, JobState::Running)?;
        self.state = JobState::Running;
        self.started_at = Some(now_millis);
        Ok(())
    }

    /// Apply a crawl stop decision.
    ///
    /// Success with a non-empty result completes the job. Failure, or success
    /// with nothing collected, fails it. Returns the resulting state.
    pub fn finish(
        &mut self,
        now_millis: i64,
        reason: StopReason,
        result: Vec<ChannelId>,
        cycles: u32,
    ) -> Result<JobState> {
        let next = if reason.is_success() && !result.is_empty() {
            JobState::Completed
        } else {
            JobState::Failed
        };
        self.expect_state(JobState::Running, next)?;

        if next == JobState::Failed && reason.is_success() {
            self.error = Some(EMPTY_RESULT_ERROR.to_string());
        }
        self.state = next;
        self.stop_reason = Some(reason);
        self.result = result.into_iter().map(ChannelId::into_string).collect();
        self.cycles = cycles;
        self.finished_at = Some(now_millis);
        Ok(next)
    }

    /// Mark as Failed after an interaction error, keeping the context
    pub fn fail(&mut self, now_millis: i64, error: impl Into<String>, cycles: u32) -> Result<()> {
        self.expect_state(JobState::Running, JobState::Failed)?;
        self.state = JobState::Failed;
        self.error = Some(error.into());
        self.cycles = cycles;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Mark as Cancelled, keeping whatever was collected before the token was observed
    pub fn cancel(&mut self, now_millis: i64, partial: Vec<ChannelId>, cycles: u32) -> Result<()> {
        self.expect_state(JobState::Running, JobState::Cancelled)?;
        self.state = JobState::Cancelled;
        self.result = partial.into_iter().map(ChannelId::into_string).collect();
        self.cycles = cycles;
        self.finished_at = Some(now_millis);
        Ok(())
    }

    fn expect_state(&self, required: JobState, to: JobState) -> Result<()> {
        if self.state != required {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}
