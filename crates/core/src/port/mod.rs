// Port Layer - Interfaces for external dependencies

pub mod browser;
pub mod clock; // Injectable for deterministic waits
pub mod completion;
pub mod id_provider; // For deterministic testing

// Re-exports
pub use browser::{BrowserError, BrowserLauncher, BrowserSession, PageSnapshot, ReadyCondition};
pub use clock::Clock;
pub use completion::CompletionListener;
pub use id_provider::IdProvider;
