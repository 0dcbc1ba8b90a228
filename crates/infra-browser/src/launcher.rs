// Chromium launcher: one browser process per crawl
// reason: chromiumoxide drives Chrome over CDP; its event handler must be polled on a task

use async_trait::async_trait;
use chanscout_core::port::{BrowserError, BrowserLauncher, BrowserSession};
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::session::{cdp_error, ChromiumSession, EndOfResultsMarker};

/// Element that carries YouTube's end-of-feed message
pub const DEFAULT_END_SELECTOR: &str = "yt-formatted-string#message-text";

pub const DEFAULT_END_PHRASES: [&str; 2] = ["No more results", "No results found"];

/// How each browser is started
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Required when running as root or inside containers
    pub no_sandbox: bool,
    /// Chrome binary; auto-detected when `None`
    pub executable: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub end_selector: String,
    pub end_phrases: Vec<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: true,
            executable: None,
            window_size: (1280, 2000),
            end_selector: DEFAULT_END_SELECTOR.to_string(),
            end_phrases: DEFAULT_END_PHRASES.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl LaunchOptions {
    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder().window_size(self.window_size.0, self.window_size.1);
        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|e| BrowserError::new(format!("invalid browser config: {}", e)))
    }
}

/// Launches a fresh Chromium process for every session
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

impl Default for ChromiumLauncher {
    fn default() -> Self {
        Self::new(LaunchOptions::default())
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn open(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let config = self.options.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| cdp_error("launch", e))?;

        // CDP events are only processed while the handler stream is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler stopped");
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "Failed to close browser after page error");
                }
                handler_task.abort();
                return Err(cdp_error("new page", e));
            }
        };

        info!(headless = self.options.headless, "Browser launched");
        Ok(Box::new(ChromiumSession::new(
            browser,
            page,
            handler_task,
            EndOfResultsMarker::new(
                self.options.end_selector.clone(),
                self.options.end_phrases.clone(),
            ),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_are_headless_without_sandbox() {
        let options = LaunchOptions::default();
        assert!(options.headless);
        assert!(options.no_sandbox);
        assert_eq!(options.end_selector, DEFAULT_END_SELECTOR);
        assert_eq!(
            options.end_phrases,
            vec!["No more results".to_string(), "No results found".to_string()]
        );
    }
}
