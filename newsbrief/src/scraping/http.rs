use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

use super::{ContentFetcher, Document};
use crate::error::{FetchStage, PipelineError, Result};

/// Fetches raw markup with a single GET. No scripts run, so pages that build
/// their article list client-side will come back mostly empty.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("failed to build reqwest client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Document> {
        let timeout_ms = timeout.as_millis() as u64;
        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                PipelineError::timeout(url, FetchStage::Navigation, timeout_ms)
            } else {
                PipelineError::fetch(url, e)
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::fetch(url, format!("page fetch failed with status: {}", status)));
        }

        let html = response.text().await.map_err(classify)?;
        info!("scraping: fetched {} bytes of raw HTML from {}", html.len(), url);
        Ok(Document::new(url, html))
    }
}
