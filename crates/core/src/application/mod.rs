// Application Layer - Crawl engine and job orchestration

pub mod cancellation;
pub mod crawl;
pub mod extractor;
pub mod registry;
pub mod termination;

// Re-exports
pub use cancellation::{cancel_channel, CancelHandle, CancellationToken};
pub use crawl::{CrawlLoop, CrawlOutcome, CrawlStatus};
pub use extractor::{Extraction, LinkExtractor};
pub use registry::JobRegistry;
pub use termination::{CycleObservation, Decision, TerminationPolicy};
