//! Knowledge federation — classification, authorization, routing, ranking
//!
//! Queries always hit the fast public source; the secure financial source
//! is consulted only when the query contains sensitive terms AND the
//! caller's role is cleared for at least one confidentiality tier.

pub mod classifier;
pub mod policy;
pub mod ranker;
pub mod router;
pub mod source;

pub use classifier::{Sensitivity, SensitivityClassifier, SensitivityReport};
pub use policy::{AccessPolicy, Tier};
pub use ranker::ResultRanker;
pub use router::{KnowledgeAnswer, KnowledgeRouter};
pub use source::{KnowledgeSource, StaticPublicSource, StaticSecureSource};

use serde::{Deserialize, Serialize};

/// One knowledge record returned by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeResult {
    /// Record ID within its source
    pub id: String,
    /// Short record title
    pub title: String,
    /// Record body
    pub content: String,
    /// Name of the source that produced the record
    pub source: String,
    /// Source-assigned relevance confidence in [0, 1]
    pub confidence: f32,
    /// End-to-end latency of the producing source call, stamped by the
    /// router
    pub latency_ms: u64,
    /// Confidentiality tier; `None` for public records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidentiality: Option<Tier>,
}
