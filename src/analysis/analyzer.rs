//! Analyzers that convert text into index terms.
//!
//! # Examples
//!
//! ```
//! use docindex::analysis::analyzer::{Analyzer, StandardAnalyzer};
//!
//! let analyzer = StandardAnalyzer::new();
//! let terms: Vec<String> = analyzer
//!     .analyze("Hello, World!")
//!     .unwrap()
//!     .map(|t| t.text)
//!     .collect();
//!
//! assert_eq!(terms, vec!["hello", "world"]);
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::analysis::token::{Token, TokenStream};
use crate::error::Result;

/// Trait for analyzers that convert text into processed tokens.
pub trait Analyzer: Send + Sync + std::fmt::Debug {
    /// Analyze the given text and return a stream of tokens.
    fn analyze(&self, text: &str) -> Result<TokenStream>;

    /// Get the name of this analyzer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Splits on Unicode word boundaries (UAX #29) and lowercases each word.
///
/// Segments without any alphanumeric character (whitespace, punctuation)
/// are dropped.
#[derive(Clone, Debug, Default)]
pub struct StandardAnalyzer;

impl StandardAnalyzer {
    /// Create a new standard analyzer.
    pub fn new() -> Self {
        StandardAnalyzer
    }
}

impl Analyzer for StandardAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        let tokens: Vec<Token> = text
            .split_word_bound_indices()
            .filter(|(_, word)| word.chars().any(|c| c.is_alphanumeric()))
            .enumerate()
            .map(|(position, (start, word))| {
                Token::with_offsets(word.to_lowercase(), position, start, start + word.len())
            })
            .collect();

        Ok(Box::new(tokens.into_iter()))
    }

    fn name(&self) -> &'static str {
        "standard"
    }
}

/// Treats the entire input as a single token.
#[derive(Clone, Debug, Default)]
pub struct KeywordAnalyzer;

impl KeywordAnalyzer {
    /// Create a new keyword analyzer.
    pub fn new() -> Self {
        KeywordAnalyzer
    }
}

impl Analyzer for KeywordAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        if text.is_empty() {
            return Ok(Box::new(std::iter::empty()));
        }
        Ok(Box::new(std::iter::once(Token::new(text, 0))))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Analyzer selection for configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    #[default]
    Standard,
    Keyword,
}

impl AnalyzerKind {
    /// Build the configured analyzer.
    pub fn build(self) -> Arc<dyn Analyzer> {
        match self {
            AnalyzerKind::Standard => Arc::new(StandardAnalyzer::new()),
            AnalyzerKind::Keyword => Arc::new(KeywordAnalyzer::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_analyzer() {
        let analyzer = StandardAnalyzer::new();
        let tokens: Vec<Token> = analyzer.analyze("Goodbye, cruel World").unwrap().collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].text, "goodbye");
        assert_eq!(tokens[1].text, "cruel");
        assert_eq!(tokens[1].position, 1);
        assert_eq!(tokens[2].text, "world");
        assert_eq!(tokens[2].start_offset, 15);
        assert_eq!(tokens[2].end_offset, 20);
    }

    #[test]
    fn test_standard_analyzer_unicode() {
        let analyzer = StandardAnalyzer::new();
        let texts: Vec<String> = analyzer
            .analyze("Café RÉSUMÉ")
            .unwrap()
            .map(|t| t.text)
            .collect();

        assert_eq!(texts, vec!["café", "résumé"]);
    }

    #[test]
    fn test_keyword_analyzer() {
        let analyzer = KeywordAnalyzer::new();
        let tokens: Vec<Token> = analyzer.analyze("user-123 ABC").unwrap().collect();

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "user-123 ABC");
        assert_eq!(analyzer.analyze("").unwrap().count(), 0);
    }

    #[test]
    fn test_analyzer_kind() {
        assert_eq!(AnalyzerKind::default().build().name(), "standard");
        assert_eq!(AnalyzerKind::Keyword.build().name(), "keyword");
    }
}
