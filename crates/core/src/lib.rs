// Chanscout Core - Job lifecycle, crawl loop and termination policy
// NO browser driver, NO file I/O: adapters plug in through `port`

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod port;

pub use config::CrawlConfig;
pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
