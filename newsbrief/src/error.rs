//! Error types for the digest pipeline.
//!
//! Every stage returns `Result<T, PipelineError>`; the job boundary in
//! [`crate::job`] is the only place these are turned into log entries.
//! Startup failures use [`common::ConfigError`] instead.

use thiserror::Error;

/// Failures a single pipeline stage can report.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Navigation or the readiness wait exceeded its bound
    #[error("timed out during {stage} of {url} after {timeout_ms} ms")]
    FetchTimeout {
        url: String,
        stage: FetchStage,
        timeout_ms: u64,
    },

    /// Any other render or navigation failure
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    /// Tokenization or the SVD step failed unexpectedly
    #[error("summarization failed: {0}")]
    Summarization(String),
}

impl PipelineError {
    pub fn fetch(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn timeout(url: impl Into<String>, stage: FetchStage, timeout_ms: u64) -> Self {
        Self::FetchTimeout {
            url: url.into(),
            stage,
            timeout_ms,
        }
    }

    /// Short machine-friendly tag used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FetchTimeout { .. } => "fetch_timeout",
            Self::Fetch { .. } => "fetch_error",
            Self::Summarization(_) => "summarization_failure",
        }
    }
}

/// Which bounded wait of a fetch expired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Navigation,
    ReadySelector,
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Navigation => f.write_str("navigation"),
            Self::ReadySelector => f.write_str("ready-selector wait"),
        }
    }
}

/// Result type alias using PipelineError.
pub type Result<T> = std::result::Result<T, PipelineError>;
