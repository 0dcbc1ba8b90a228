// Completion Listener Port
// Lets the outer layer persist a job's result once it reaches COMPLETED

use crate::domain::Job;
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait CompletionListener: Send + Sync {
    /// Called exactly once per job, after its state is COMPLETED in the registry
    async fn on_completed(&self, job: &Job) -> Result<()>;
}

/// Listener that does nothing (library use without persistence)
pub struct NoopListener;

#[async_trait]
impl CompletionListener for NoopListener {
    async fn on_completed(&self, _job: &Job) -> Result<()> {
        Ok(())
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Records every completed job it is handed
    #[derive(Default)]
    pub struct RecordingListener {
        completed: Mutex<Vec<Job>>,
    }

    impl RecordingListener {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn completed(&self) -> Vec<Job> {
            self.completed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionListener for RecordingListener {
        async fn on_completed(&self, job: &Job) -> Result<()> {
            self.completed.lock().unwrap().push(job.clone());
            Ok(())
        }
    }
}
