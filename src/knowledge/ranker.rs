//! Result ranking across heterogeneous sources
//!
//! Confidence decides the order; within a near-tie window the cheaper
//! (lower-latency) source wins, since near-tied relevance should not cost
//! a conversational turn extra wait.

use super::KnowledgeResult;

/// Merges and orders result sets from multiple sources
pub struct ResultRanker {
    /// Confidence window treated as a near-tie
    epsilon: f32,
    /// Hard cap on the ranked list
    cap: usize,
}

impl ResultRanker {
    pub fn new(epsilon: f32, cap: usize) -> Self {
        Self { epsilon, cap }
    }

    /// Order by confidence descending, break near-ties by ascending
    /// latency, truncate to the cap
    pub fn rank(&self, mut results: Vec<KnowledgeResult>) -> Vec<KnowledgeResult> {
        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        // Re-order each near-tie window by latency. A window spans all
        // results within epsilon of its head, so any two members are
        // within epsilon of each other.
        let mut start = 0;
        while start < results.len() {
            let head = results[start].confidence;
            let mut end = start + 1;
            while end < results.len() && head - results[end].confidence <= self.epsilon {
                end += 1;
            }
            results[start..end].sort_by_key(|r| r.latency_ms);
            start = end;
        }

        results.truncate(self.cap);
        results
    }
}

impl Default for ResultRanker {
    fn default() -> Self {
        Self::new(0.1, 5)
    }
}
