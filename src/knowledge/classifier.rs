//! Sensitivity classification for knowledge queries
//!
//! Pure and deterministic: a fixed vocabulary of sensitive financial
//! terms, matched case-insensitively as substrings. No I/O, no state.

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Query sensitivity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    /// No sensitive terms present
    Low,
    /// One or two sensitive terms
    Medium,
    /// Three or more sensitive terms
    High,
}

/// Classification result for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    /// Whether the secure source should be consulted
    pub requires_secure_data: bool,
    /// Overall sensitivity level
    pub level: Sensitivity,
    /// Vocabulary terms found in the query
    pub matched_terms: Vec<String>,
}

struct CompiledTerm {
    term: String,
    pattern: Regex,
}

/// Sensitive-term classifier over a fixed vocabulary
pub struct SensitivityClassifier {
    terms: Vec<CompiledTerm>,
}

impl SensitivityClassifier {
    /// Compile a vocabulary into case-insensitive substring matchers
    pub fn new(vocabulary: &[String]) -> Result<Self> {
        let terms = vocabulary
            .iter()
            .map(|term| {
                let pattern = Regex::new(&format!("(?i){}", regex::escape(term)))
                    .map_err(|e| Error::Config(format!("invalid term '{}': {}", term, e)))?;
                Ok(CompiledTerm {
                    term: term.clone(),
                    pattern,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { terms })
    }

    /// Classifier over the default financial vocabulary
    pub fn default_vocabulary() -> Self {
        // The default vocabulary contains only literal terms, so compilation
        // cannot fail
        Self::new(&crate::config::default_sensitive_terms())
            .unwrap_or_else(|_| Self { terms: Vec::new() })
    }

    /// Classify one query
    pub fn classify(&self, query: &str) -> SensitivityReport {
        let matched_terms: Vec<String> = self
            .terms
            .iter()
            .filter(|t| t.pattern.is_match(query))
            .map(|t| t.term.clone())
            .collect();

        let level = match matched_terms.len() {
            0 => Sensitivity::Low,
            1 | 2 => Sensitivity::Medium,
            _ => Sensitivity::High,
        };

        SensitivityReport {
            requires_secure_data: !matched_terms.is_empty(),
            level,
            matched_terms,
        }
    }
}
