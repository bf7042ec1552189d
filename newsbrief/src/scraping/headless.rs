use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{ContentFetcher, Document};
use crate::error::{FetchStage, PipelineError, Result};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Slack added to the CDP request timeout so our own stage timeouts fire first
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Renders pages in a throwaway headless Chromium.
///
/// Every call launches its own browser with a fresh profile directory and
/// shuts it down before returning, so nothing leaks between runs.
pub struct HeadlessFetcher {
    ready_selector: String,
    ready_timeout: Duration,
    user_agent: String,
    executable: Option<String>,
}

impl HeadlessFetcher {
    pub fn new(
        ready_selector: &str,
        ready_timeout: Duration,
        user_agent: &str,
        executable: Option<String>,
    ) -> Self {
        Self {
            ready_selector: ready_selector.to_string(),
            ready_timeout,
            user_agent: user_agent.to_string(),
            executable,
        }
    }

    /// CDP commands must outlive both stage bounds, otherwise chromiumoxide
    /// abandons a slow navigation before `timeout` is reached.
    fn request_timeout(&self, navigation_timeout: Duration) -> Duration {
        navigation_timeout.max(self.ready_timeout) + REQUEST_TIMEOUT_MARGIN
    }

    fn browser_config(
        &self,
        profile_dir: &Path,
        navigation_timeout: Duration,
    ) -> std::result::Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir)
            .request_timeout(self.request_timeout(navigation_timeout))
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage");
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build()
    }

    /// Navigate, wait for the readiness selector, capture the DOM.
    /// Browser teardown is the caller's job.
    async fn render(&self, browser: &Browser, url: &str, timeout: Duration) -> Result<String> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| PipelineError::fetch(url, format!("failed to open page: {}", e)))?;
        page.set_user_agent(self.user_agent.as_str())
            .await
            .map_err(|e| PipelineError::fetch(url, format!("failed to set user agent: {}", e)))?;

        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => debug!("headless: navigation to {} complete", url),
            Ok(Err(e)) => return Err(navigation_error(url, e, timeout)),
            Err(_) => {
                return Err(PipelineError::timeout(
                    url,
                    FetchStage::Navigation,
                    timeout.as_millis() as u64,
                ))
            }
        }

        if tokio::time::timeout(self.ready_timeout, wait_for_selector(&page, &self.ready_selector))
            .await
            .is_err()
        {
            return Err(PipelineError::timeout(
                url,
                FetchStage::ReadySelector,
                self.ready_timeout.as_millis() as u64,
            ));
        }

        page.content()
            .await
            .map_err(|e| PipelineError::fetch(url, format!("failed to capture page content: {}", e)))
    }
}

/// Poll until `selector` matches at least one node. Unbounded; the caller
/// wraps it in a timeout.
async fn wait_for_selector(page: &Page, selector: &str) {
    loop {
        if page.find_element(selector).await.is_ok() {
            return;
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}

/// A CDP-level timeout during `goto` is still a navigation timeout
fn navigation_error(url: &str, error: CdpError, timeout: Duration) -> PipelineError {
    match error {
        CdpError::Timeout => PipelineError::timeout(url, FetchStage::Navigation, timeout.as_millis() as u64),
        other => PipelineError::fetch(url, format!("navigation failed: {}", other)),
    }
}

#[async_trait]
impl ContentFetcher for HeadlessFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Document> {
        // Removed on drop, including when the job is cancelled mid-fetch
        let profile_dir = tempfile::Builder::new()
            .prefix("newsbrief-chromium-")
            .tempdir()
            .map_err(|e| PipelineError::fetch(url, format!("failed to create browser profile dir: {}", e)))?;
        let config = self
            .browser_config(profile_dir.path(), timeout)
            .map_err(|e| PipelineError::fetch(url, format!("invalid browser config: {}", e)))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PipelineError::fetch(url, format!("failed to launch browser: {}", e)))?;

        // The CDP event loop must be driven for any page command to complete
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let rendered = self.render(&browser, url, timeout).await;

        // Teardown runs on every path, success or not
        if let Err(e) = browser.close().await {
            warn!("headless: graceful close failed ({}), killing browser", e);
            if let Some(Err(kill_err)) = browser.kill().await {
                warn!("headless: failed to kill browser process: {}", kill_err);
            }
        }
        if let Err(e) = browser.wait().await {
            warn!("headless: failed to reap browser process: {}", e);
        }
        events.abort();
        let profile_path = profile_dir.path().to_path_buf();
        if let Err(e) = profile_dir.close() {
            debug!("headless: could not remove profile dir {}: {}", profile_path.display(), e);
        }

        let html = rendered?;
        info!("headless: rendered {} bytes of HTML from {}", html.len(), url);
        Ok(Document::new(url, html))
    }
}
