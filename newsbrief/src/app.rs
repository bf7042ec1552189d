use anyhow::Context;
use common::{Cadence, Config, MailCredentials};
use std::future::Future;
use std::time::Duration;
use tracing::info;

use crate::extraction::TextExtractor;
use crate::job::{DigestJob, DigestSettings, Job, JobOutcome};
use crate::notification::{Notifier, SmtpMailer};
use crate::scheduler::{Scheduler, SystemClock};
use crate::scraping::build_fetcher;
use crate::summarization::LsaSummarizer;

/// Everything the process needs once startup checks have passed
pub struct App {
    pub job: DigestJob,
    pub cadence: Cadence,
    pub tick: Duration,
}

impl App {
    /// Validate configuration and wire the pipeline.
    ///
    /// `env` supplies the mail credentials. Any [`common::ConfigError`] is
    /// returned inside the `anyhow::Error` and can be downcast.
    pub fn from_config<F>(config: &Config, env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        config.validate()?;
        let credentials = MailCredentials::from_lookup(env)?;
        let cadence = config.scheduler.cadence()?;
        let extractor = TextExtractor::new(&config.extraction)?;
        let fetcher = build_fetcher(&config.source).context("failed to build content fetcher")?;

        let mailer = SmtpMailer::new(&config.mail, &credentials);
        let notifier = Notifier::new(Box::new(mailer), credentials.from.clone(), credentials.to.clone())
            .with_retry(config.mail.max_attempts, Duration::from_secs(config.mail.backoff_seconds));

        info!(from = %credentials.from, to = %credentials.to, "Mail credentials loaded");

        let settings = DigestSettings {
            url: config.source.url.clone(),
            fetch_timeout: Duration::from_millis(config.source.navigation_timeout_ms),
            sentence_count: config.summary.sentence_count,
            subject: config.mail.subject.clone(),
        };
        let job = DigestJob::new(
            settings,
            fetcher,
            extractor,
            Box::new(LsaSummarizer::from_config(&config.summary)),
            notifier,
        );

        Ok(Self {
            job,
            cadence,
            tick: Duration::from_secs(config.scheduler.tick_seconds),
        })
    }

    /// Run the job a single time
    pub async fn run_once(&self) -> JobOutcome {
        self.job.run().await
    }

    /// Optionally run immediately, then poll the schedule until `shutdown` completes.
    pub async fn run<F>(self, run_now: bool, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut scheduler = Scheduler::new(self.cadence, self.tick, SystemClock);
        if run_now {
            info!("Running job manually");
            scheduler.run_job(&self.job).await;
        }
        scheduler.run_until(&self.job, shutdown).await;
    }
}
