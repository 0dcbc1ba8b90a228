// Domain Layer - Pure business logic and entities

pub mod channel;
pub mod error;
pub mod job;

// Re-exports
pub use channel::{ChannelId, CollectedSet};
pub use error::DomainError;
pub use job::{Job, JobId, JobState, StopReason};
