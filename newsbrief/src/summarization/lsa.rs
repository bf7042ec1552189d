use common::SummaryConfig;
use nalgebra::DMatrix;
use std::collections::HashMap;
use tracing::debug;

use super::tokenize::{split_sentences, terms};
use super::{Summary, TextSummarizer};
use crate::error::{PipelineError, Result};

/// Weight given to every term cell of a sentence that has any terms at all
const TF_SMOOTHING: f64 = 0.4;
const SVD_MAX_ITERATIONS: usize = 10_000;

/// Latent semantic analysis summarizer.
///
/// Builds a term x sentence frequency matrix, decomposes it with SVD and
/// scores each sentence by the length of its vector in the space of the
/// dominant singular dimensions, weighted by the squared singular values.
#[derive(Debug, Clone)]
pub struct LsaSummarizer {
    reduction_ratio: f64,
    min_dimensions: usize,
}

impl Default for LsaSummarizer {
    fn default() -> Self {
        Self::from_config(&SummaryConfig::default())
    }
}

impl LsaSummarizer {
    pub fn from_config(config: &SummaryConfig) -> Self {
        Self {
            reduction_ratio: config.reduction_ratio,
            min_dimensions: config.min_dimensions,
        }
    }

    /// Importance score per sentence, in sentence order.
    /// `None` when no sentence contains a single term.
    fn rank_sentences(&self, sentences: &[&str]) -> Result<Option<Vec<f64>>> {
        let sentence_terms: Vec<Vec<String>> = sentences.iter().map(|s| terms(s)).collect();

        let mut vocabulary: HashMap<&str, usize> = HashMap::new();
        for term in sentence_terms.iter().flatten() {
            let next = vocabulary.len();
            vocabulary.entry(term.as_str()).or_insert(next);
        }
        if vocabulary.is_empty() {
            return Ok(None);
        }

        let matrix = term_frequency_matrix(&vocabulary, &sentence_terms);
        let svd = matrix
            .try_svd(false, true, f64::EPSILON, SVD_MAX_ITERATIONS)
            .ok_or_else(|| PipelineError::Summarization("SVD did not converge".to_string()))?;
        let v_t = svd
            .v_t
            .ok_or_else(|| PipelineError::Summarization("SVD returned no right singular vectors".to_string()))?;

        // Strongest dimensions first
        let sigma = svd.singular_values;
        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&a, &b| sigma[b].total_cmp(&sigma[a]));

        let wanted = ((sigma.len() as f64) * self.reduction_ratio) as usize;
        let dimensions = wanted.max(self.min_dimensions).min(sigma.len());
        debug!(
            "lsa: {} terms x {} sentences, keeping {} of {} dimensions",
            vocabulary.len(),
            sentences.len(),
            dimensions,
            sigma.len()
        );

        let ranks = (0..sentences.len())
            .map(|col| {
                order
                    .iter()
                    .take(dimensions)
                    .map(|&dim| sigma[dim].powi(2) * v_t[(dim, col)].powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .collect();
        Ok(Some(ranks))
    }
}

/// Rows are terms, columns sentences. Each column is scaled by its most
/// frequent term and smoothed so that every cell of a non-empty column is at
/// least [`TF_SMOOTHING`].
fn term_frequency_matrix(vocabulary: &HashMap<&str, usize>, sentence_terms: &[Vec<String>]) -> DMatrix<f64> {
    let mut matrix = DMatrix::<f64>::zeros(vocabulary.len(), sentence_terms.len());

    for (col, words) in sentence_terms.iter().enumerate() {
        for word in words {
            matrix[(vocabulary[word.as_str()], col)] += 1.0;
        }
        let max = matrix.column(col).max();
        if max > 0.0 {
            for row in 0..vocabulary.len() {
                let frequency = matrix[(row, col)] / max;
                matrix[(row, col)] = TF_SMOOTHING + (1.0 - TF_SMOOTHING) * frequency;
            }
        }
    }
    matrix
}

/// Indices of the `count` best ranks, ties going to the earlier sentence,
/// returned in ascending (source) order.
fn top_in_source_order(ranks: &[f64], count: usize) -> Vec<usize> {
    let mut by_rank: Vec<usize> = (0..ranks.len()).collect();
    by_rank.sort_by(|&a, &b| ranks[b].total_cmp(&ranks[a]).then(a.cmp(&b)));
    let mut chosen: Vec<usize> = by_rank.into_iter().take(count).collect();
    chosen.sort_unstable();
    chosen
}

impl TextSummarizer for LsaSummarizer {
    fn summarize(&self, text: &str, sentence_count: usize) -> Result<Summary> {
        let sentences = split_sentences(text);

        let chosen: Vec<usize> = if sentences.len() <= sentence_count {
            (0..sentences.len()).collect()
        } else {
            match self.rank_sentences(&sentences)? {
                Some(ranks) => top_in_source_order(&ranks, sentence_count),
                None => (0..sentence_count).collect(),
            }
        };

        Ok(Summary {
            sentences: chosen.into_iter().map(|i| sentences[i].to_string()).collect(),
            requested_count: sentence_count,
        })
    }
}
