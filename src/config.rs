//! ClubMind configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main ClubMind configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClubMindConfig {
    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Knowledge federation configuration
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Sensitivity classification configuration
    #[serde(default)]
    pub sensitivity: SensitivityConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

impl ClubMindConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Club (tenant) used when callers do not pass one explicitly
    pub default_club_id: String,

    /// Session time-to-live in hours, renewed on every write
    pub ttl_hours: u64,

    /// Timeout for a single primary-store operation in milliseconds
    pub store_timeout_ms: u64,

    /// Minimum user-message length (chars) that triggers embedding
    pub min_embed_chars: usize,

    /// Directory for fallback-store persistence (None = memory only)
    #[serde(default)]
    pub fallback_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_club_id: "default".to_string(),
            ttl_hours: 24,
            store_timeout_ms: 2_000,
            min_embed_chars: 10,
            fallback_dir: None,
        }
    }
}

/// Knowledge federation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    /// Hard cap on the ranked result list
    pub max_ranked_results: usize,

    /// Confidence window treated as a near-tie during ranking
    pub confidence_epsilon: f32,

    /// Timeout for a single knowledge-source query in milliseconds
    pub source_timeout_ms: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            max_ranked_results: 5,
            confidence_epsilon: 0.1,
            source_timeout_ms: 3_000,
        }
    }
}

/// Sensitivity classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityConfig {
    /// Terms matched case-insensitively as substrings of the query
    pub terms: Vec<String>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            terms: default_sensitive_terms(),
        }
    }
}

/// Default vocabulary of sensitive financial terms
pub fn default_sensitive_terms() -> Vec<String> {
    [
        "wage",
        "wage bill",
        "salary",
        "salaries",
        "payroll",
        "earnings",
        "contract",
        "release",
        "clause",
        "release clause",
        "termination clause",
        "transfer fee",
        "signing fee",
        "agent fee",
        "bonus",
        "buyout",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name ("hash" = deterministic stub)
    pub provider: String,

    /// Vector dimension produced by the provider
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            dimension: 384,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClubMindConfig::default();
        assert_eq!(config.session.ttl_hours, 24);
        assert_eq!(config.knowledge.max_ranked_results, 5);
        assert!(config.sensitivity.terms.contains(&"salary".to_string()));
        assert_eq!(config.embedding.dimension, 384);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clubmind.toml");
        std::fs::write(
            &path,
            r#"
[session]
default_club_id = "fc-united"
ttl_hours = 12
store_timeout_ms = 500
min_embed_chars = 5

[knowledge]
max_ranked_results = 3
confidence_epsilon = 0.05
source_timeout_ms = 1000
"#,
        )
        .unwrap();

        let config = ClubMindConfig::load(&path).unwrap();
        assert_eq!(config.session.default_club_id, "fc-united");
        assert_eq!(config.session.ttl_hours, 12);
        assert_eq!(config.knowledge.max_ranked_results, 3);
        // Unspecified sections fall back to defaults
        assert_eq!(config.embedding.provider, "hash");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(ClubMindConfig::load("/nonexistent/clubmind.toml").is_err());
    }
}
