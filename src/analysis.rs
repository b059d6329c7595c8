//! Text analysis for indexed fields and queries.
//!
//! The analyzer splits text on Unicode word boundaries (UAX #29), lower-cases
//! every token and removes English stop words. It is the analyzer the
//! in-memory index applies both at indexing time and to incoming queries, so
//! that query terms and term-vector keys agree.
//!
//! Indices of entity URIs use [`Analyzer::uri`] instead, which splits on
//! whitespace and keeps every token as it is.
//!
//! # Examples
//!
//! ```
//! use lexlink::analysis::Analyzer;
//!
//! let analyzer = Analyzer::new();
//! assert_eq!(analyzer.tokenize("The Music of Paris"), vec!["music", "paris"]);
//! ```

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use unicode_segmentation::UnicodeSegmentation;

/// Default English stop words list.
const DEFAULT_ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is", "it",
    "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there", "these",
    "they", "this", "to", "was", "will", "with",
];

/// Default English stop words as a HashSet.
pub static DEFAULT_ENGLISH_STOP_WORDS_SET: LazyLock<HashSet<String>> = LazyLock::new(|| {
    DEFAULT_ENGLISH_STOP_WORDS
        .iter()
        .map(|&s| s.to_string())
        .collect()
});

/// How text is split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenizer {
    /// Unicode words, lower-cased.
    Words,
    /// Whitespace-separated tokens, kept verbatim.
    Whitespace,
}

/// Word tokenizer with lower-casing and stop word removal.
#[derive(Debug, Clone)]
pub struct Analyzer {
    tokenizer: Tokenizer,
    /// The set of stop words to remove.
    stop_words: Arc<HashSet<String>>,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    /// Create an analyzer with the default English stop words.
    pub fn new() -> Self {
        Analyzer {
            tokenizer: Tokenizer::Words,
            stop_words: Arc::new(DEFAULT_ENGLISH_STOP_WORDS_SET.clone()),
        }
    }

    /// Create an analyzer with a custom stop word list.
    pub fn with_stop_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Analyzer {
            tokenizer: Tokenizer::Words,
            stop_words: Arc::new(words.into_iter().map(Into::into).collect()),
        }
    }

    /// Create an analyzer that keeps every word.
    pub fn without_stop_words() -> Self {
        Analyzer {
            tokenizer: Tokenizer::Words,
            stop_words: Arc::new(HashSet::new()),
        }
    }

    /// Create an analyzer for fields of entity URIs such as
    /// `<dbpedia:Barack_Obama>`.
    pub fn uri() -> Self {
        Analyzer {
            tokenizer: Tokenizer::Whitespace,
            stop_words: Arc::new(HashSet::new()),
        }
    }

    pub fn tokenizer(&self) -> Tokenizer {
        self.tokenizer
    }

    /// Check whether a (lower-cased) word is a stop word.
    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Split text into lower-cased, non-stop-word tokens.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        match self.tokenizer {
            Tokenizer::Words => text
                .unicode_words()
                .map(|word| word.to_lowercase())
                .filter(|word| !self.stop_words.contains(word))
                .collect(),
            Tokenizer::Whitespace => text
                .split_whitespace()
                .filter(|token| !self.stop_words.contains(*token))
                .map(str::to_string)
                .collect(),
        }
    }

    /// Analyze text into a single space-separated string of terms.
    pub fn analyze(&self, text: &str) -> String {
        self.tokenize(text).join(" ")
    }
}
