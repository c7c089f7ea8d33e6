//! Semantic index — vector similarity over embedded user messages
//!
//! Records are written once per qualifying message and survive session
//! end, giving cross-session recall. Every query is scoped by tenant
//! before any scoring happens; the filter is a security invariant, not a
//! convenience.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One embedded user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Composite id: `tenant:session:message`
    pub id: String,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Club (tenant) partition key
    pub tenant_id: String,
    /// Session the message belongs to
    pub session_id: String,
    /// Message id within the session
    pub message_id: String,
    /// Original message text
    pub content: String,
    /// Recognized intent, if any
    pub intent: Option<String>,
    /// Message timestamp (Unix millis)
    pub timestamp: i64,
}

impl EmbeddingRecord {
    /// Composite id for a (tenant, session, message) triple
    pub fn composite_id(tenant_id: &str, session_id: &str, message_id: &str) -> String {
        format!("{}:{}:{}", tenant_id, session_id, message_id)
    }
}

/// A conversation snippet returned by similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetMatch {
    /// Session the snippet came from
    pub session_id: String,
    /// Message id within that session
    pub message_id: String,
    /// Snippet text
    pub content: String,
    /// Recognized intent, if any
    pub intent: Option<String>,
    /// Message timestamp (Unix millis)
    pub timestamp: i64,
    /// Cosine similarity against the query vector
    pub score: f32,
}

/// Vector similarity index over embedded user messages
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    /// Store a record; ids are write-once, a second write is a no-op
    async fn upsert(&self, record: EmbeddingRecord) -> Result<()>;

    /// Top-`limit` records for one tenant by cosine similarity
    async fn search(
        &self,
        tenant_id: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SnippetMatch>>;

    /// Liveness probe
    async fn ping(&self) -> Result<()>;
}

/// In-memory semantic index
pub struct InMemoryIndex {
    records: Arc<RwLock<HashMap<String, EmbeddingRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl SemanticIndex for InMemoryIndex {
    async fn upsert(&self, record: EmbeddingRecord) -> Result<()> {
        let mut records = self.records.write().await;
        // Embeddings are immutable once written
        records.entry(record.id.clone()).or_insert(record);
        Ok(())
    }

    async fn search(
        &self,
        tenant_id: &str,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SnippetMatch>> {
        let records = self.records.read().await;

        let mut matches: Vec<SnippetMatch> = records
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| SnippetMatch {
                session_id: r.session_id.clone(),
                message_id: r.message_id.clone(),
                content: r.content.clone(),
                intent: r.intent.clone(),
                timestamp: r.timestamp,
                score: cosine_similarity(&r.vector, query_vector),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        Ok(matches)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
