use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::extraction::TextExtractor;
use crate::notification::Notifier;
use crate::scraping::ContentFetcher;
use crate::summarization::{summarize_text, TextSummarizer};

/// Something the scheduler can run. `run` must not fail outward.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> JobOutcome;
}

/// How a job ended. None of these stop the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Summary delivered
    Delivered,
    /// Pipeline finished but every delivery attempt failed
    Undelivered,
    /// A stage failed; carries the error kind and message
    Failed { kind: &'static str, message: String },
}

/// Where to fetch from and how the digest is shaped
#[derive(Debug, Clone)]
pub struct DigestSettings {
    pub url: String,
    pub fetch_timeout: Duration,
    pub sentence_count: usize,
    pub subject: String,
}

/// The fetch → extract → summarize → notify pipeline
pub struct DigestJob {
    settings: DigestSettings,
    fetcher: Box<dyn ContentFetcher>,
    extractor: TextExtractor,
    summarizer: Box<dyn TextSummarizer>,
    notifier: Notifier,
}

impl DigestJob {
    pub fn new(
        settings: DigestSettings,
        fetcher: Box<dyn ContentFetcher>,
        extractor: TextExtractor,
        summarizer: Box<dyn TextSummarizer>,
        notifier: Notifier,
    ) -> Self {
        Self {
            settings,
            fetcher,
            extractor,
            summarizer,
            notifier,
        }
    }

    /// Stages composed with `?`. Delivery reports a bool instead of an error.
    async fn pipeline(&self) -> Result<bool> {
        let document = self
            .fetcher
            .fetch(&self.settings.url, self.settings.fetch_timeout)
            .await?;
        info!("Successfully fetched content from {}", document.url);

        let text = self.extractor.extract_document(&document);
        drop(document);

        let summary = summarize_text(self.summarizer.as_ref(), text.as_str(), self.settings.sentence_count)?;
        info!("Summary:\n{}", summary);

        Ok(self.notifier.send(&self.settings.subject, &summary).await)
    }
}

#[async_trait]
impl Job for DigestJob {
    async fn run(&self) -> JobOutcome {
        let started = Instant::now();
        info!(url = %self.settings.url, "Starting news summary job");

        let outcome = match self.pipeline().await {
            Ok(true) => JobOutcome::Delivered,
            Ok(false) => {
                warn!("Job finished but the summary was not delivered");
                JobOutcome::Undelivered
            }
            Err(e) => {
                error!(kind = e.kind(), "Job failed: {}", e);
                JobOutcome::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        };

        info!(elapsed_ms = started.elapsed().as_millis() as u64, ?outcome, "News summary job finished");
        outcome
    }
}
