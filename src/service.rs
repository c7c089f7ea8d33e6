//! Action-based RPC surface handed to the endpoint layer
//!
//! [`AssistantService`] owns the wired component graph and exposes one
//! method per conversational action. Transport, auth and JSON marshalling
//! live in the (external) endpoint layer; everything here is typed.

use crate::config::ClubMindConfig;
use crate::embedding::{EmbeddingProvider, HashEmbedder};
use crate::error::{Error, Result};
use crate::knowledge::{
    KnowledgeAnswer, KnowledgeRouter, ResultRanker, SensitivityClassifier, StaticPublicSource,
    StaticSecureSource,
};
use crate::semantic::{InMemoryIndex, SemanticIndex, SnippetMatch};
use crate::session::log::MessageDraft;
use crate::session::store::{LocalSessionStore, MemoryBackend, SessionBackend, SessionStore};
use crate::session::{
    AnalyticsAggregator, ContextPatch, ContextTracker, ConversationLog, ConversationState,
    Message, Preferences, Scenario, Session, SessionManager, UserAnalytics,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Dependency health snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthStatus {
    pub primary_store_healthy: bool,
    pub fallback_store_healthy: bool,
    pub semantic_index_healthy: bool,
}

/// Conversational-memory and knowledge-federation service
pub struct AssistantService {
    default_club_id: String,
    manager: Arc<SessionManager>,
    log: ConversationLog,
    tracker: ContextTracker,
    aggregator: AnalyticsAggregator,
    router: KnowledgeRouter,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SemanticIndex>,
}

impl AssistantService {
    /// Default wiring from configuration
    ///
    /// Uses the in-memory primary backend, a local fallback (file-backed
    /// when `session.fallback_dir` is set), the hash embedder and the
    /// static knowledge sources. Deployments swap components with
    /// [`AssistantService::with_components`].
    pub async fn new(config: ClubMindConfig) -> Result<Self> {
        let primary: Arc<dyn SessionBackend> = Arc::new(MemoryBackend::new());
        let fallback: Arc<dyn SessionBackend> = match &config.session.fallback_dir {
            Some(dir) => Arc::new(LocalSessionStore::with_dir(dir.clone()).await?),
            None => Arc::new(LocalSessionStore::new()),
        };

        let embedder: Arc<dyn EmbeddingProvider> = match config.embedding.provider.as_str() {
            "hash" => Arc::new(HashEmbedder::new(config.embedding.dimension)),
            other => {
                return Err(Error::Config(format!(
                    "unknown embedding provider '{}'",
                    other
                )))
            }
        };

        Self::with_components(
            config,
            primary,
            fallback,
            embedder,
            Arc::new(InMemoryIndex::new()),
            Arc::new(StaticPublicSource::new()),
            Arc::new(StaticSecureSource::new()),
        )
    }

    /// Explicit component injection
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        config: ClubMindConfig,
        primary: Arc<dyn SessionBackend>,
        fallback: Arc<dyn SessionBackend>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SemanticIndex>,
        public_source: Arc<dyn crate::knowledge::KnowledgeSource>,
        secure_source: Arc<dyn crate::knowledge::KnowledgeSource>,
    ) -> Result<Self> {
        let store_timeout = Duration::from_millis(config.session.store_timeout_ms);
        let source_timeout = Duration::from_millis(config.knowledge.source_timeout_ms);
        let ttl = Duration::from_secs(config.session.ttl_hours * 3600);

        let store = Arc::new(SessionStore::new(primary, fallback, store_timeout));
        let manager = Arc::new(SessionManager::new(store.clone(), ttl));

        let classifier = SensitivityClassifier::new(&config.sensitivity.terms)?;
        let ranker = ResultRanker::new(
            config.knowledge.confidence_epsilon,
            config.knowledge.max_ranked_results,
        );

        Ok(Self {
            default_club_id: config.session.default_club_id.clone(),
            log: ConversationLog::new(
                manager.clone(),
                embedder.clone(),
                index.clone(),
                config.session.min_embed_chars,
            ),
            tracker: ContextTracker::new(manager.clone()),
            aggregator: AnalyticsAggregator::new(store),
            router: KnowledgeRouter::new(
                public_source,
                secure_source,
                classifier,
                ranker,
                source_timeout,
            ),
            manager,
            embedder,
            index,
        })
    }

    /// Create a session for a user, under the default club unless given
    pub async fn create_session(
        &self,
        user_id: &str,
        club_id: Option<&str>,
        preferences: Option<Preferences>,
    ) -> Result<Session> {
        let club = club_id.unwrap_or(&self.default_club_id);
        self.manager.create(club, user_id, preferences).await
    }

    /// Fetch a session
    pub async fn get_session(&self, club_id: &str, session_id: &str) -> Result<Session> {
        self.manager.get(club_id, session_id).await
    }

    /// Append a message to a session's conversation log
    pub async fn add_message(
        &self,
        club_id: &str,
        session_id: &str,
        draft: MessageDraft,
    ) -> Result<Message> {
        self.log.append(club_id, session_id, draft).await
    }

    /// Full ordered conversation log
    pub async fn get_messages(&self, club_id: &str, session_id: &str) -> Result<Vec<Message>> {
        self.log.read(club_id, session_id).await
    }

    /// Apply a field-level context patch
    pub async fn update_context(
        &self,
        club_id: &str,
        session_id: &str,
        patch: ContextPatch,
    ) -> Result<Session> {
        self.tracker.update_context(club_id, session_id, patch).await
    }

    /// Set or clear the highlighted entity
    pub async fn highlight_entity(
        &self,
        club_id: &str,
        session_id: &str,
        entity: Option<String>,
    ) -> Result<Session> {
        self.tracker.set_highlighted(club_id, session_id, entity).await
    }

    /// Switch the active dashboard scenario
    pub async fn set_scenario(
        &self,
        club_id: &str,
        session_id: &str,
        scenario: Scenario,
    ) -> Result<Session> {
        self.tracker.set_scenario(club_id, session_id, scenario).await
    }

    /// Record a completed dashboard action
    pub async fn record_action(
        &self,
        club_id: &str,
        session_id: &str,
        label: &str,
    ) -> Result<Session> {
        self.tracker.record_action(club_id, session_id, label).await
    }

    /// Move the conversation state machine
    pub async fn update_conversation_state(
        &self,
        club_id: &str,
        session_id: &str,
        state: ConversationState,
        topic: Option<String>,
    ) -> Result<Session> {
        self.tracker
            .update_conversation_state(club_id, session_id, state, topic)
            .await
    }

    /// Similar past conversation snippets, scoped to the club
    ///
    /// Degrades to an empty list if the embedder or index is unavailable;
    /// a conversational turn never fails on recall.
    pub async fn search_similar(
        &self,
        club_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SnippetMatch>> {
        if query.trim().is_empty() {
            return Err(Error::MalformedInput("query must not be empty".to_string()));
        }

        let vector = match self.embedder.embed(query).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("Embedding failed for similarity search: {}", e);
                return Ok(Vec::new());
            }
        };
        match self.index.search(club_id, &vector, limit).await {
            Ok(matches) => Ok(matches),
            Err(e) => {
                tracing::warn!("Semantic index unavailable: {}", e);
                Ok(Vec::new())
            }
        }
    }

    /// Lifetime analytics for one user
    pub async fn get_analytics(&self, club_id: &str, user_id: &str) -> Result<UserAnalytics> {
        self.aggregator.user_analytics(club_id, user_id).await
    }

    /// End a session (terminal state, final write)
    pub async fn end_session(&self, club_id: &str, session_id: &str) -> Result<()> {
        self.manager.end(club_id, session_id).await
    }

    /// Federated knowledge query
    pub async fn query_knowledge(
        &self,
        query: &str,
        caller_role: &str,
        max_results: usize,
    ) -> Result<KnowledgeAnswer> {
        if query.trim().is_empty() {
            return Err(Error::MalformedInput("query must not be empty".to_string()));
        }
        if max_results == 0 {
            return Err(Error::MalformedInput(
                "max_results must be at least 1".to_string(),
            ));
        }

        Ok(self.router.query(query, caller_role, max_results).await)
    }

    /// Probe every backing dependency
    pub async fn health_check(&self) -> HealthStatus {
        let store = self.manager.store().health().await;
        let semantic_index_healthy = self.index.ping().await.is_ok();

        HealthStatus {
            primary_store_healthy: store.primary_healthy,
            fallback_store_healthy: store.fallback_healthy,
            semantic_index_healthy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::Tier;
    use crate::session::store::testing::FailingBackend;
    use crate::session::MessageRole;

    async fn service() -> AssistantService {
        AssistantService::new(ClubMindConfig::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_contract_query_scenario() {
        let service = service().await;
        let session = service
            .create_session("user-1", Some("fc-united"), None)
            .await
            .unwrap();

        let message = service
            .add_message(
                "fc-united",
                &session.session_id,
                MessageDraft::user("out of contract in 2025").with_intent("contract_query"),
            )
            .await
            .unwrap();
        assert_eq!(message.role, MessageRole::User);

        let fetched = service
            .get_session("fc-united", &session.session_id)
            .await
            .unwrap();
        assert_eq!(fetched.analytics.common_queries.get("contract_query"), Some(&1));

        let highlighted = service
            .highlight_entity(
                "fc-united",
                &session.session_id,
                Some("J. Smith".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(
            highlighted.context.highlighted_entity.as_deref(),
            Some("J. Smith")
        );

        let cleared = service
            .highlight_entity("fc-united", &session.session_id, None)
            .await
            .unwrap();
        assert_eq!(cleared.context.highlighted_entity, None);
    }

    #[tokio::test]
    async fn test_default_club_fallback() {
        let service = service().await;
        let session = service.create_session("user-1", None, None).await.unwrap();
        assert_eq!(session.tenant_id, "default");

        let fetched = service
            .get_session("default", &session.session_id)
            .await
            .unwrap();
        assert_eq!(fetched.session_id, session.session_id);
    }

    #[tokio::test]
    async fn test_federation_public_only_for_general_role() {
        let service = service().await;
        let answer = service
            .query_knowledge("club history", "general", 5)
            .await
            .unwrap();

        assert!(!answer.sensitivity_detected);
        assert!(!answer.results.is_empty());
        assert!(answer.results.iter().all(|r| r.confidentiality.is_none()));
    }

    #[tokio::test]
    async fn test_federation_blended_for_finance_role() {
        let service = service().await;
        let answer = service
            .query_knowledge("salary details", "finance", 5)
            .await
            .unwrap();

        assert!(answer.sensitivity_detected);
        assert!(answer.results.iter().any(|r| matches!(
            r.confidentiality,
            Some(Tier::Restricted) | Some(Tier::Confidential)
        )));
    }

    #[tokio::test]
    async fn test_query_knowledge_validates_input() {
        let service = service().await;
        assert!(matches!(
            service.query_knowledge("  ", "general", 5).await.unwrap_err(),
            Error::MalformedInput(_)
        ));
        assert!(matches!(
            service.query_knowledge("club history", "general", 0).await.unwrap_err(),
            Error::MalformedInput(_)
        ));
    }

    #[tokio::test]
    async fn test_search_similar_finds_past_message() {
        let service = service().await;
        let session = service
            .create_session("user-1", Some("fc-united"), None)
            .await
            .unwrap();

        service
            .add_message(
                "fc-united",
                &session.session_id,
                MessageDraft::user("which players are out of contract in 2025"),
            )
            .await
            .unwrap();

        let matches = service
            .search_similar("fc-united", "which players are out of contract in 2025", 5)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].session_id, session.session_id);

        // Another club sees nothing
        let cross = service
            .search_similar("rival-fc", "out of contract in 2025", 5)
            .await
            .unwrap();
        assert!(cross.is_empty());
    }

    #[tokio::test]
    async fn test_recall_survives_session_end() {
        let service = service().await;
        let session = service
            .create_session("user-1", Some("fc-united"), None)
            .await
            .unwrap();
        service
            .add_message(
                "fc-united",
                &session.session_id,
                MessageDraft::user("compare our wage bill to last season"),
            )
            .await
            .unwrap();

        service
            .end_session("fc-united", &session.session_id)
            .await
            .unwrap();

        let matches = service
            .search_similar("fc-united", "compare our wage bill to last season", 5)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[tokio::test]
    async fn test_analytics_roundtrip_and_not_found() {
        let service = service().await;
        assert!(matches!(
            service.get_analytics("fc-united", "nobody").await.unwrap_err(),
            Error::NotFound(_)
        ));

        let session = service
            .create_session("user-1", Some("fc-united"), None)
            .await
            .unwrap();
        service
            .add_message(
                "fc-united",
                &session.session_id,
                MessageDraft::user("show contract expiry dates").with_intent("contract_query"),
            )
            .await
            .unwrap();
        service
            .record_action("fc-united", &session.session_id, "open_contract_view")
            .await
            .unwrap();

        let analytics = service.get_analytics("fc-united", "user-1").await.unwrap();
        assert_eq!(analytics.total_sessions, 1);
        assert_eq!(analytics.total_messages, 1);
        assert_eq!(analytics.common_queries.get("contract_query"), Some(&1));
        assert_eq!(
            analytics.successful_actions.get("open_contract_view"),
            Some(&1)
        );
    }

    #[tokio::test]
    async fn test_health_check_all_green() {
        let service = service().await;
        let health = service.health_check().await;
        assert!(health.primary_store_healthy);
        assert!(health.fallback_store_healthy);
        assert!(health.semantic_index_healthy);
    }

    #[tokio::test]
    async fn test_turns_survive_primary_store_outage() {
        let service = AssistantService::with_components(
            ClubMindConfig::default(),
            Arc::new(FailingBackend),
            Arc::new(LocalSessionStore::new()),
            Arc::new(HashEmbedder::default()),
            Arc::new(InMemoryIndex::new()),
            Arc::new(StaticPublicSource::new()),
            Arc::new(StaticSecureSource::new()),
        )
        .unwrap();

        let session = service
            .create_session("user-1", Some("fc-united"), None)
            .await
            .unwrap();
        service
            .add_message(
                "fc-united",
                &session.session_id,
                MessageDraft::user("hello there, assistant"),
            )
            .await
            .unwrap();

        let fetched = service
            .get_session("fc-united", &session.session_id)
            .await
            .unwrap();
        assert_eq!(fetched.analytics.total_messages, 1);

        let health = service.health_check().await;
        assert!(!health.primary_store_healthy);
        assert!(health.fallback_store_healthy);
    }

    #[tokio::test]
    async fn test_conversation_state_updates() {
        let service = service().await;
        let session = service
            .create_session("user-1", Some("fc-united"), None)
            .await
            .unwrap();

        let updated = service
            .update_conversation_state(
                "fc-united",
                &session.session_id,
                ConversationState::Clarifying,
                Some("transfers".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.conversation.state, ConversationState::Clarifying);
        assert_eq!(updated.analytics.preferred_topics.get("transfers"), Some(&1));

        service
            .end_session("fc-united", &session.session_id)
            .await
            .unwrap();
        let ended = service
            .get_session("fc-united", &session.session_id)
            .await
            .unwrap();
        assert!(ended.is_ended());
    }
}
