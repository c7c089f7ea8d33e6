//! Text embedding — pluggable provider with a deterministic default
//!
//! The conversational core only needs "text in, fixed-length vector out";
//! which model produces the vector is a deployment decision injected at
//! construction time.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Text to fixed-length vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimension of every vector this provider produces
    fn dimension(&self) -> usize;
}

/// Deterministic hash-derived pseudo-vector provider
///
/// Stand-in for a real embedding model: folds character trigrams into
/// hashed buckets and L2-normalizes. Stable across calls and processes,
/// which is all the tests and the write-once index contract need. Its
/// numeric properties carry no semantic meaning; deployments that depend
/// on recall quality must inject a genuine model behind
/// [`EmbeddingProvider`].
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, gram: &str) -> (usize, f32) {
        let mut hasher = DefaultHasher::new();
        gram.hash(&mut hasher);
        let h = hasher.finish();
        let index = (h % self.dimension as u64) as usize;
        // Sign bit from the high half keeps buckets from only accumulating
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        (index, sign)
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimension];

        let normalized = text.to_lowercase();
        let chars: Vec<char> = normalized.chars().collect();
        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3.min(chars.len())) {
            let gram: String = window.iter().collect();
            let (index, sign) = self.bucket(&gram);
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
