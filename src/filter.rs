//! Banned-word censorship of displayed answers.
//!
//! A word-list file holds one entry per line. Entries before a line reading
//! `expressions` are banned words, matched fuzzily; entries after it are
//! banned expressions, removed verbatim.
//!
//! ```text
//! imbécile
//! crétin
//! expressions
//! va te faire voir
//! ```

use std::path::Path;

use tracing::debug;

use crate::error::Result;

/// Line separating banned words from banned expressions.
pub const EXPRESSIONS_SECTION: &str = "expressions";

/// Maximum edit distance at which a word is censored.
pub const MAX_EDIT_DISTANCE: usize = 1;

/// Fuzzy banned-word filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BannedWordFilter {
    words: Vec<String>,
    expressions: Vec<String>,
    label: String,
}

impl Default for BannedWordFilter {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl BannedWordFilter {
    pub fn new(words: Vec<String>, expressions: Vec<String>) -> Self {
        Self {
            words,
            expressions,
            label: "censuré".to_string(),
        }
    }

    /// Parse word-list text.
    pub fn parse(content: &str) -> Self {
        let mut words = Vec::new();
        let mut expressions = Vec::new();
        let mut in_expressions = false;

        for line in content.lines() {
            let entry = line.trim();
            if entry.is_empty() {
                continue;
            }
            if entry == EXPRESSIONS_SECTION {
                in_expressions = true;
                continue;
            }
            if in_expressions {
                expressions.push(entry.to_string());
            } else {
                words.push(entry.to_string());
            }
        }

        Self::new(words, expressions)
    }

    /// Load a word-list file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let filter = Self::parse(&content);
        debug!(
            path = %path.as_ref().display(),
            words = filter.words.len(),
            expressions = filter.expressions.len(),
            "loaded banned-word list"
        );
        Ok(filter)
    }

    /// Use a different replacement label (e.g. a language pack's).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.expressions.is_empty()
    }

    /// Whether a single word is within edit distance of a banned word.
    pub fn is_banned(&self, word: &str) -> bool {
        let cleaned = strip_quoting(word);
        !cleaned.is_empty()
            && self
                .words
                .iter()
                .any(|banned| strsim::levenshtein(banned, &cleaned) <= MAX_EDIT_DISTANCE)
    }

    /// Remove banned expressions, then censor banned words.
    pub fn apply(&self, text: &str) -> String {
        let mut stripped = text.to_string();
        for expression in &self.expressions {
            stripped = stripped.replace(expression.as_str(), "");
        }

        stripped
            .split(' ')
            .map(|word| {
                if self.is_banned(word) {
                    format!("{} ({})", self.label, strip_quoting(word))
                } else {
                    word.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn strip_quoting(word: &str) -> String {
    word.replace(['*', '"'], "")
}
