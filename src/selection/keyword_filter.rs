//! Keyword exclusion and duplicate removal.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::AppError;
use crate::ingest::EmailSource;

/// Case-insensitive substrings that exclude an address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    /// Builds a set, dropping blank terms and repeats while keeping order.
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .filter(|t| seen.insert(t.to_lowercase()))
            .collect();
        Self { terms }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Compiles the terms into one case-insensitive alternation.
    ///
    /// Returns `None` for an empty set.
    pub fn matcher(&self) -> Result<Option<Regex>, AppError> {
        if self.terms.is_empty() {
            return Ok(None);
        }

        let pattern = self
            .terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");

        RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .map(Some)
            .map_err(|e| AppError::Internal(format!("Failed to compile keyword filter: {}", e)))
    }
}

/// Removes every record containing any keyword. Survivors keep their order.
pub fn filter(source: EmailSource, keywords: &KeywordSet) -> Result<EmailSource, AppError> {
    let Some(matcher) = keywords.matcher()? else {
        return Ok(source);
    };

    Ok(source
        .into_records()
        .into_iter()
        .filter(|record| !matcher.is_match(record))
        .collect())
}

/// Drops repeated addresses, keeping the first occurrence.
///
/// Comparison ignores case. Empty records are never treated as duplicates.
pub fn dedupe(source: EmailSource) -> EmailSource {
    let mut seen = HashSet::new();
    source
        .into_records()
        .into_iter()
        .filter(|record| record.is_empty() || seen.insert(record.to_lowercase()))
        .collect()
}
