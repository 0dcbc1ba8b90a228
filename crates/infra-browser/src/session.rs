// Chromium session: one page of one browser, owned by a single crawl

use async_trait::async_trait;
use chanscout_core::port::{BrowserError, BrowserSession, PageSnapshot, ReadyCondition};
use chromiumoxide::browser::Browser;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

/// Re-check interval while waiting for a selector
const SELECTOR_POLL: Duration = Duration::from_millis(250);

pub(crate) fn cdp_error(action: &str, e: CdpError) -> BrowserError {
    BrowserError::new(format!("{} failed: {}", action, e))
}

/// Recognizes the end-of-feed message by its text
#[derive(Debug, Clone)]
pub struct EndOfResultsMarker {
    selector: String,
    phrases: Vec<String>,
}

impl EndOfResultsMarker {
    pub fn new(selector: String, phrases: Vec<String>) -> Self {
        Self { selector, phrases }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.phrases.iter().any(|phrase| text.contains(phrase.as_str()))
    }
}

pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    end_marker: EndOfResultsMarker,
    closed: bool,
}

impl ChromiumSession {
    pub(crate) fn new(
        browser: Browser,
        page: Page,
        handler: JoinHandle<()>,
        end_marker: EndOfResultsMarker,
    ) -> Self {
        Self {
            browser,
            page,
            handler,
            end_marker,
            closed: false,
        }
    }

    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, BrowserError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(|e| cdp_error("query selector", e))?;

        let mut hrefs = Vec::with_capacity(elements.len());
        for element in elements {
            // Nodes can detach between query and read; skip them
            match element.attribute("href").await {
                Ok(Some(href)) => hrefs.push(href),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Skipping detached element"),
            }
        }
        Ok(hrefs)
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(
        &self,
        url: &str,
        ready: ReadyCondition,
        limit: Duration,
    ) -> Result<(), BrowserError> {
        let load = async {
            self.page.goto(url).await.map_err(|e| cdp_error("navigation", e))?;
            match ready {
                ReadyCondition::NetworkIdle => {
                    self.page
                        .wait_for_navigation()
                        .await
                        .map_err(|e| cdp_error("page load", e))?;
                }
            }
            Ok::<(), BrowserError>(())
        };

        timeout(limit, load)
            .await
            .map_err(|_| BrowserError::new(format!("navigation timeout after {:?}: {}", limit, url)))?
    }

    async fn send_key(&self, key: &str) -> Result<(), BrowserError> {
        let body = self
            .page
            .find_element("body")
            .await
            .map_err(|e| cdp_error("find body", e))?;
        body.press_key(key)
            .await
            .map_err(|e| cdp_error("key press", e))?;
        Ok(())
    }

    async fn evaluate_script(&self, script: &str) -> Result<(), BrowserError> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| cdp_error("evaluate", e))?;
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, limit: Duration) -> Result<(), BrowserError> {
        let deadline = Instant::now() + limit;
        loop {
            if let Ok(found) = self.page.find_elements(selector).await {
                if !found.is_empty() {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::new(format!(
                    "selector wait timeout after {:?}: {}",
                    limit, selector
                )));
            }
            tokio::time::sleep(SELECTOR_POLL).await;
        }
    }

    async fn query_snapshot(&self, selectors: &[&str]) -> Result<PageSnapshot, BrowserError> {
        let mut snapshot = PageSnapshot::new();
        for selector in selectors {
            let hrefs = self.hrefs(selector).await?;
            snapshot.push_group(*selector, hrefs);
        }
        Ok(snapshot)
    }

    async fn end_of_results(&self) -> Result<bool, BrowserError> {
        // Absent message element is the common case, not an error
        let element = match self.page.find_element(self.end_marker.selector.as_str()).await {
            Ok(element) => element,
            Err(_) => return Ok(false),
        };
        let text = element
            .inner_text()
            .await
            .map_err(|e| cdp_error("read message text", e))?
            .unwrap_or_default();
        Ok(self.end_marker.matches(&text))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Err(e) = self.page.clone().close().await {
            warn!(error = %e, "Failed to close page (non-fatal)");
        }
        let result = self
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| cdp_error("browser close", e));
        if let Err(e) = self.browser.wait().await {
            warn!(error = %e, "Browser process did not exit cleanly");
        }
        self.handler.abort();
        debug!("Browser closed");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker() -> EndOfResultsMarker {
        EndOfResultsMarker::new(
            "yt-formatted-string#message-text".to_string(),
            vec!["No more results".to_string(), "No results found".to_string()],
        )
    }

    #[test]
    fn test_marker_matches_known_phrases() {
        assert!(marker().matches("No more results"));
        assert!(marker().matches("  No results found for \"xyz\"  "));
    }

    #[test]
    fn test_marker_ignores_other_messages() {
        assert!(!marker().matches(""));
        assert!(!marker().matches("Try different keywords"));
        assert!(!marker().matches("no more results"));
    }
}
