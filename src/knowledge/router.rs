//! Knowledge routing — security-aware federation of two sources
//!
//! The public source is always consulted. The secure source is consulted
//! only when the query carries sensitive terms and the caller's role has
//! at least one permitted tier; otherwise it is skipped entirely and the
//! refusal is surfaced as a recommendation. A failed or timed-out source
//! contributes an empty set; the caller always receives a well-formed
//! envelope.

use super::classifier::SensitivityClassifier;
use super::policy::{AccessPolicy, Tier};
use super::ranker::ResultRanker;
use super::source::KnowledgeSource;
use super::KnowledgeResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// Federated query envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    /// Ranked, merged results
    pub results: Vec<KnowledgeResult>,
    /// Source of the top-ranked result (public source when empty)
    pub primary_source: String,
    /// Wall-clock time spent answering
    pub total_latency_ms: u64,
    /// Whether sensitive terms were detected in the query
    pub sensitivity_detected: bool,
    /// Observable notes: authorization refusals, degraded sources
    pub recommendations: Vec<String>,
}

/// Routes queries across the public and secure sources
pub struct KnowledgeRouter {
    public: Arc<dyn KnowledgeSource>,
    secure: Arc<dyn KnowledgeSource>,
    classifier: SensitivityClassifier,
    ranker: ResultRanker,
    source_timeout: Duration,
}

impl KnowledgeRouter {
    pub fn new(
        public: Arc<dyn KnowledgeSource>,
        secure: Arc<dyn KnowledgeSource>,
        classifier: SensitivityClassifier,
        ranker: ResultRanker,
        source_timeout: Duration,
    ) -> Self {
        Self {
            public,
            secure,
            classifier,
            ranker,
            source_timeout,
        }
    }

    /// Answer a query for the given caller role
    pub async fn query(&self, query: &str, caller_role: &str, max_results: usize) -> KnowledgeAnswer {
        let started = Instant::now();
        let mut recommendations = Vec::new();

        let report = self.classifier.classify(query);
        let permitted = AccessPolicy::permitted_tiers(caller_role);
        let consult_secure = report.requires_secure_data && !permitted.is_empty();

        if report.requires_secure_data && permitted.is_empty() {
            tracing::info!(
                "Skipping secure source for role '{}' (terms: {:?})",
                caller_role,
                report.matched_terms
            );
            recommendations.push(format!(
                "Sensitive financial terms were detected, but the '{}' role is not cleared \
                 for confidential club records; only public sources were consulted.",
                caller_role
            ));
        }

        let public_call = self.consult(self.public.as_ref(), query, max_results, &[]);
        let secure_call = async {
            if consult_secure {
                Some(
                    self.consult(self.secure.as_ref(), query, max_results, permitted)
                        .await,
                )
            } else {
                None
            }
        };
        let ((public_results, public_note), secure_outcome) =
            futures::future::join(public_call, secure_call).await;

        let mut merged = public_results;
        if let Some((secure_results, secure_note)) = secure_outcome {
            // The source already filtered by tier; filter again so an
            // untagged or mis-tagged record can never leak through
            merged.extend(
                secure_results
                    .into_iter()
                    .filter(|r| r.confidentiality.is_some_and(|t| permitted.contains(&t))),
            );
            if let Some(note) = secure_note {
                recommendations.push(note);
            }
        }
        if let Some(note) = public_note {
            recommendations.push(note);
        }

        let results = self.ranker.rank(merged);
        let primary_source = results
            .first()
            .map(|r| r.source.clone())
            .unwrap_or_else(|| self.public.name().to_string());

        KnowledgeAnswer {
            results,
            primary_source,
            total_latency_ms: started.elapsed().as_millis() as u64,
            sensitivity_detected: report.requires_secure_data,
            recommendations,
        }
    }

    /// Query one source under the bounded timeout, stamping per-result
    /// latency; failure yields an empty set plus a diagnostic note
    async fn consult(
        &self,
        source: &dyn KnowledgeSource,
        query: &str,
        limit: usize,
        permitted: &[Tier],
    ) -> (Vec<KnowledgeResult>, Option<String>) {
        let started = Instant::now();
        match timeout(self.source_timeout, source.search(query, limit, permitted)).await {
            Ok(Ok(mut results)) => {
                let elapsed = started.elapsed().as_millis() as u64;
                for result in &mut results {
                    result.latency_ms = elapsed;
                }
                (results, None)
            }
            Ok(Err(e)) => {
                tracing::warn!("Knowledge source '{}' failed: {}", source.name(), e);
                (
                    Vec::new(),
                    Some(format!(
                        "The '{}' knowledge source was unavailable; results may be incomplete.",
                        source.name()
                    )),
                )
            }
            Err(_) => {
                tracing::warn!("Knowledge source '{}' timed out", source.name());
                (
                    Vec::new(),
                    Some(format!(
                        "The '{}' knowledge source timed out; results may be incomplete.",
                        source.name()
                    )),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::source::{StaticPublicSource, StaticSecureSource};
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;

    struct FailingSource;

    #[async_trait]
    impl KnowledgeSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search(
            &self,
            _query: &str,
            _limit: usize,
            _permitted: &[Tier],
        ) -> Result<Vec<KnowledgeResult>> {
            Err(Error::Unavailable("source offline".to_string()))
        }
    }

    fn router() -> KnowledgeRouter {
        KnowledgeRouter::new(
            Arc::new(StaticPublicSource::new()),
            Arc::new(StaticSecureSource::new()),
            SensitivityClassifier::default_vocabulary(),
            ResultRanker::default(),
            Duration::from_millis(500),
        )
    }

    #[tokio::test]
    async fn test_public_only_for_plain_query() {
        let answer = router().query("club history", "general", 5).await;

        assert!(!answer.sensitivity_detected);
        assert!(!answer.results.is_empty());
        assert!(answer.results.iter().all(|r| r.source == "public-kb"));
        assert!(answer.results.iter().all(|r| r.confidentiality.is_none()));
        assert!(answer.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_blended_results_for_cleared_role() {
        let answer = router().query("salary details", "finance", 5).await;

        assert!(answer.sensitivity_detected);
        let secure: Vec<_> = answer
            .results
            .iter()
            .filter(|r| r.source == "secure-financial")
            .collect();
        assert!(!secure.is_empty());
        assert!(secure.iter().all(|r| matches!(
            r.confidentiality,
            Some(Tier::Restricted) | Some(Tier::Confidential)
        )));
    }

    #[tokio::test]
    async fn test_unauthorized_role_fails_closed_with_recommendation() {
        let answer = router().query("salary details", "general", 5).await;

        assert!(answer.sensitivity_detected);
        assert!(answer
            .results
            .iter()
            .all(|r| r.confidentiality.is_none()));
        assert_eq!(answer.recommendations.len(), 1);
        assert!(answer.recommendations[0].contains("general"));
    }

    #[tokio::test]
    async fn test_secret_tier_never_reaches_finance() {
        let answer = router()
            .query("termination clause and agent fee details", "finance", 10)
            .await;

        assert!(answer
            .results
            .iter()
            .all(|r| r.confidentiality != Some(Tier::Secret)));
    }

    #[tokio::test]
    async fn test_failed_public_source_yields_wellformed_envelope() {
        let router = KnowledgeRouter::new(
            Arc::new(FailingSource),
            Arc::new(StaticSecureSource::new()),
            SensitivityClassifier::default_vocabulary(),
            ResultRanker::default(),
            Duration::from_millis(200),
        );

        let answer = router.query("club history", "general", 5).await;
        assert!(answer.results.is_empty());
        assert_eq!(answer.primary_source, "failing");
        assert!(answer
            .recommendations
            .iter()
            .any(|r| r.contains("unavailable")));
    }

    #[tokio::test]
    async fn test_total_failure_still_answers() {
        let router = KnowledgeRouter::new(
            Arc::new(FailingSource),
            Arc::new(FailingSource),
            SensitivityClassifier::default_vocabulary(),
            ResultRanker::default(),
            Duration::from_millis(200),
        );

        let answer = router.query("salary details", "board", 5).await;
        assert!(answer.results.is_empty());
        assert!(answer.sensitivity_detected);
        // Both source failures surface as diagnostics
        assert_eq!(answer.recommendations.len(), 2);
    }

    #[tokio::test]
    async fn test_results_capped() {
        let answer = router()
            .query(
                "wage salary bonus contract transfer budget release clause history stadium",
                "board",
                50,
            )
            .await;
        assert!(answer.results.len() <= 5);
    }
}
