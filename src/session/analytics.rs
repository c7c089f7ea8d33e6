//! Analytics rollups — per-user lifetime statistics
//!
//! Aggregation happens on demand from the stored sessions; nothing is
//! persisted incrementally across sessions, so the result can never drift
//! from the underlying data.

use super::store::SessionStore;
use super::UserAnalytics;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// On-demand per-user analytics over the session store
pub struct AnalyticsAggregator {
    store: Arc<SessionStore>,
}

impl AnalyticsAggregator {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    /// Roll up all of one user's sessions within a tenant
    pub async fn user_analytics(&self, tenant_id: &str, user_id: &str) -> Result<UserAnalytics> {
        let sessions = self.store.list_by_user(tenant_id, user_id).await?;
        if sessions.is_empty() {
            return Err(Error::NotFound(format!(
                "no sessions for user {}",
                user_id
            )));
        }

        let mut total_messages = 0u64;
        let mut duration_sum = 0i64;
        let mut common_queries: HashMap<String, u64> = HashMap::new();
        let mut successful_actions: HashMap<String, u64> = HashMap::new();
        let mut preferred_topics: HashMap<String, u64> = HashMap::new();

        for session in &sessions {
            total_messages += session.analytics.total_messages;
            duration_sum += session.duration_ms();
            for (intent, count) in &session.analytics.common_queries {
                *common_queries.entry(intent.clone()).or_insert(0) += count;
            }
            for (action, count) in &session.analytics.successful_actions {
                *successful_actions.entry(action.clone()).or_insert(0) += count;
            }
            for (topic, count) in &session.analytics.preferred_topics {
                *preferred_topics.entry(topic.clone()).or_insert(0) += count;
            }
        }

        Ok(UserAnalytics {
            user_id: user_id.to_string(),
            total_sessions: sessions.len() as u64,
            total_messages,
            avg_session_duration_ms: duration_sum / sessions.len() as i64,
            common_queries,
            successful_actions,
            preferred_topics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::manager::SessionManager;
    use super::super::store::{LocalSessionStore, MemoryBackend, SessionStore};
    use super::*;
    use std::time::Duration;

    fn fixture() -> (AnalyticsAggregator, Arc<SessionManager>) {
        let store = Arc::new(SessionStore::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(LocalSessionStore::new()),
            Duration::from_millis(500),
        ));
        let manager = Arc::new(SessionManager::new(store.clone(), Duration::from_secs(3600)));
        (AnalyticsAggregator::new(store), manager)
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (aggregator, _) = fixture();
        let err = aggregator
            .user_analytics("fc-united", "nobody")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_rollup_sums_across_sessions() {
        let (aggregator, manager) = fixture();

        let first = manager.create("fc-united", "user-1", None).await.unwrap();
        manager
            .update_with("fc-united", &first.session_id, |s| {
                s.analytics.total_messages = 3;
                s.analytics.common_queries.insert("contract_query".to_string(), 2);
                s.analytics.successful_actions.insert("pin_chart".to_string(), 1);
            })
            .await
            .unwrap();

        let second = manager.create("fc-united", "user-1", None).await.unwrap();
        manager
            .update_with("fc-united", &second.session_id, |s| {
                s.analytics.total_messages = 2;
                s.analytics.common_queries.insert("contract_query".to_string(), 1);
                s.analytics.preferred_topics.insert("budget".to_string(), 4);
            })
            .await
            .unwrap();

        // Another user's session must not leak into the rollup
        manager.create("fc-united", "user-2", None).await.unwrap();

        let analytics = aggregator
            .user_analytics("fc-united", "user-1")
            .await
            .unwrap();
        assert_eq!(analytics.total_sessions, 2);
        assert_eq!(analytics.total_messages, 5);
        assert_eq!(analytics.common_queries.get("contract_query"), Some(&3));
        assert_eq!(analytics.successful_actions.get("pin_chart"), Some(&1));
        assert_eq!(analytics.preferred_topics.get("budget"), Some(&4));
        assert!(analytics.avg_session_duration_ms >= 0);
    }

    #[tokio::test]
    async fn test_rollup_matches_fresh_recomputation() {
        let (aggregator, manager) = fixture();
        let session = manager.create("fc-united", "user-1", None).await.unwrap();
        manager
            .update_with("fc-united", &session.session_id, |s| {
                s.analytics.total_messages = 1;
            })
            .await
            .unwrap();

        let first = aggregator
            .user_analytics("fc-united", "user-1")
            .await
            .unwrap();
        let second = aggregator
            .user_analytics("fc-united", "user-1")
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
