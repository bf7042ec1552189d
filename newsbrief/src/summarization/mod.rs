use tracing::info;

use crate::error::Result;

pub mod lsa;
pub mod tokenize;

pub use lsa::LsaSummarizer;

/// Returned instead of a summary when extraction produced nothing.
pub const EMPTY_TEXT_PLACEHOLDER: &str = "No content available to summarize.";

/// Core trait for extractive summarizers
pub trait TextSummarizer: Send + Sync {
    /// Pick at most `sentence_count` sentences from `text`, verbatim and in source order.
    fn summarize(&self, text: &str, sentence_count: usize) -> Result<Summary>;
}

/// Sentences chosen from the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Verbatim source sentences, in the order they appear in the source
    pub sentences: Vec<String>,
    pub requested_count: usize,
}

impl Summary {
    /// One `- sentence` line per sentence
    pub fn to_bullets(&self) -> String {
        self.sentences
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Summarize extracted text into a bulleted block.
///
/// Empty text short-circuits to [`EMPTY_TEXT_PLACEHOLDER`]; the summarizer is
/// never called in that case.
pub fn summarize_text<S: TextSummarizer + ?Sized>(
    summarizer: &S,
    text: &str,
    sentence_count: usize,
) -> Result<String> {
    if text.trim().is_empty() {
        info!("summarization: no text to summarize, using placeholder");
        return Ok(EMPTY_TEXT_PLACEHOLDER.to_string());
    }

    let summary = summarizer.summarize(text, sentence_count)?;
    info!(
        "summarization: generated summary with {} sentences ({} requested)",
        summary.sentences.len(),
        summary.requested_count
    );
    Ok(summary.to_bullets())
}
