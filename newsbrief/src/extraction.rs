use common::{ConfigError, ExtractionConfig};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use crate::scraping::Document;

/// Article text pulled out of a page. Empty is a valid value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtractedText {
    pub clean_text: String,
}

impl ExtractedText {
    pub fn is_empty(&self) -> bool {
        self.clean_text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.clean_text
    }
}

/// Applies a fixed rule set to HTML. Output depends only on the markup and the rules.
#[derive(Debug)]
pub struct TextExtractor {
    selectors: Vec<Selector>,
    min_length: usize,
    boilerplate: Vec<String>,
}

impl TextExtractor {
    /// Compile the rule set. Fails on the first selector that does not parse.
    pub fn new(rules: &ExtractionConfig) -> Result<Self, ConfigError> {
        let selectors = rules
            .selectors
            .iter()
            .map(|s| {
                Selector::parse(s).map_err(|e| ConfigError::InvalidSelector {
                    selector: s.clone(),
                    reason: format!("{:?}", e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            selectors,
            min_length: rules.min_length,
            boilerplate: rules
                .boilerplate_phrases
                .iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        })
    }

    /// Extract from a fetched document
    pub fn extract_document(&self, document: &Document) -> ExtractedText {
        let text = self.extract(&document.html);
        info!(
            "extraction: {} characters of text from {}",
            text.clean_text.chars().count(),
            document.url
        );
        if text.is_empty() {
            warn!("extraction: no text extracted from {}", document.url);
        }
        text
    }

    /// Select matching nodes in document order, drop short or boilerplate
    /// ones, join the rest with single spaces.
    pub fn extract(&self, html: &str) -> ExtractedText {
        let document = Html::parse_document(html);

        let kept: Vec<String> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| self.selectors.iter().any(|s| s.matches(el)))
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
            .filter(|text| self.keep(text))
            .collect();

        ExtractedText {
            clean_text: kept.join(" "),
        }
    }

    fn keep(&self, text: &str) -> bool {
        if text.chars().count() <= self.min_length {
            return false;
        }
        let lowered = text.to_lowercase();
        !self.boilerplate.iter().any(|phrase| lowered.contains(phrase.as_str()))
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_extractor() -> TextExtractor {
        TextExtractor::new(&ExtractionConfig::default()).expect("default rules compile")
    }

    #[test]
    fn keeps_long_paragraphs_and_drops_short_ones() {
        let html = "<article><p>AAAAAAAAAAAAAAAAAAAAAA relevant sentence one.</p><p>short</p></article>";
        let text = default_extractor().extract(html);
        assert_eq!(text.clean_text, "AAAAAAAAAAAAAAAAAAAAAA relevant sentence one.");
    }

    #[test]
    fn no_matching_selectors_yields_empty() {
        let html = "<html><body><div><p>This paragraph is long enough but not inside an article.</p></div></body></html>";
        let text = default_extractor().extract(html);
        assert!(text.is_empty());
        assert_eq!(text.clean_text, "");
    }

    #[test]
    fn length_threshold_is_exclusive() {
        // exactly 20 characters is dropped, 21 is kept
        let html = "<article><p>12345678901234567890</p><p>123456789012345678901</p></article>";
        let text = default_extractor().extract(html);
        assert_eq!(text.clean_text, "123456789012345678901");
    }

    #[test]
    fn read_more_is_filtered_case_insensitively() {
        let html = r#"<article>
            <p>Ministers met on Tuesday to discuss the budget.</p>
            <p>READ MORE: the full story behind the vote</p>
            <p>Analysts expect a decision before the weekend.</p>
        </article>"#;
        let text = default_extractor().extract(html);
        assert_eq!(
            text.clean_text,
            "Ministers met on Tuesday to discuss the budget. Analysts expect a decision before the weekend."
        );
    }

    #[test]
    fn promo_summaries_are_excluded_and_order_is_preserved() {
        let html = r#"<body>
            <div class="gs-c-promo-body">
                <p class="gs-c-promo-summary">A summary line that should never be kept.</p>
                <p>First promo paragraph with enough text.</p>
            </div>
            <article><p>Article paragraph that comes second.</p></article>
            <div class="gs-c-promo-body"><p>Third paragraph, from another promo.</p></div>
        </body>"#;
        let text = default_extractor().extract(html);
        assert_eq!(
            text.clean_text,
            "First promo paragraph with enough text. Article paragraph that comes second. Third paragraph, from another promo."
        );
    }

    #[test]
    fn whitespace_inside_nodes_is_collapsed() {
        let html = "<article><p>  Spread   across\n   several <b>lines</b> of markup  </p></article>";
        let text = default_extractor().extract(html);
        assert_eq!(text.clean_text, "Spread across several lines of markup");
    }

    #[test]
    fn custom_rules_are_honoured() {
        let rules = ExtractionConfig {
            selectors: vec!["section.story h2".to_string()],
            min_length: 5,
            boilerplate_phrases: vec!["Sponsored".to_string()],
        };
        let extractor = TextExtractor::new(&rules).unwrap();
        let html = r#"<section class="story"><h2>Election results</h2><h2>Sponsored content</h2><p>Ignored paragraph text here.</p></section>"#;
        assert_eq!(extractor.extract(html).clean_text, "Election results");
    }

    #[test]
    fn invalid_selector_is_a_config_error() {
        let rules = ExtractionConfig {
            selectors: vec!["p[".to_string()],
            ..ExtractionConfig::default()
        };
        let err = TextExtractor::new(&rules).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { ref selector, .. } if selector == "p["));
    }

    #[test]
    fn extract_document_uses_document_html() {
        let doc = Document::new(
            "https://example.com",
            "<article><p>Document level extraction works fine.</p></article>".to_string(),
        );
        let text = default_extractor().extract_document(&doc);
        assert_eq!(text.as_str(), "Document level extraction works fine.");
    }
}
