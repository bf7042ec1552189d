use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{RenderMode, SourceConfig};
use std::time::Duration;

use crate::error::Result;

pub mod headless;
pub mod http;

pub use headless::HeadlessFetcher;
pub use http::HttpFetcher;

/// A rendered page. Lives only until extraction is done.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub html: String,
    pub fetched_at: DateTime<Utc>,
}

impl Document {
    pub fn new(url: impl Into<String>, html: String) -> Self {
        Self {
            url: url.into(),
            html,
            fetched_at: Utc::now(),
        }
    }
}

/// Turns a URL into HTML. Implementations own every resource they open
/// and release it before returning, whatever the outcome.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch `url`, giving up on navigation after `timeout`.
    /// No retry happens at this layer.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Document>;
}

/// Build the fetcher selected by `source.render`
pub fn build_fetcher(source: &SourceConfig) -> anyhow::Result<Box<dyn ContentFetcher>> {
    match source.render {
        RenderMode::Headless => Ok(Box::new(HeadlessFetcher::new(
            &source.ready_selector,
            Duration::from_millis(source.ready_timeout_ms),
            &source.user_agent,
            source.chrome_executable.clone(),
        ))),
        RenderMode::Static => Ok(Box::new(HttpFetcher::new(&source.user_agent)?)),
    }
}
