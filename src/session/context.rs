//! Context tracking — current-focus state per session

use super::manager::SessionManager;
use super::{ContextPatch, ConversationState, Scenario, Session};
use crate::error::Result;
use std::sync::Arc;

/// Convenience wrappers over session context updates
pub struct ContextTracker {
    manager: Arc<SessionManager>,
}

impl ContextTracker {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Apply a field-level partial update to the session context
    pub async fn update_context(
        &self,
        tenant_id: &str,
        session_id: &str,
        patch: ContextPatch,
    ) -> Result<Session> {
        self.manager
            .update_with(tenant_id, session_id, move |session| {
                if let Some(focus) = patch.focus {
                    session.context.focus = focus;
                }
                if let Some(scenario) = patch.active_scenario {
                    session.context.active_scenario = scenario;
                }
                if let Some(last_action) = patch.last_action {
                    session.context.last_action = Some(last_action);
                }
            })
            .await
    }

    /// Set or clear the highlighted entity (`None` clears)
    pub async fn set_highlighted(
        &self,
        tenant_id: &str,
        session_id: &str,
        entity: Option<String>,
    ) -> Result<Session> {
        self.manager
            .update_with(tenant_id, session_id, move |session| {
                session.context.highlighted_entity = entity;
            })
            .await
    }

    /// Switch the active dashboard scenario
    pub async fn set_scenario(
        &self,
        tenant_id: &str,
        session_id: &str,
        scenario: Scenario,
    ) -> Result<Session> {
        self.manager
            .update_with(tenant_id, session_id, move |session| {
                session.context.active_scenario = scenario;
            })
            .await
    }

    /// Record a completed action and bump its counter
    pub async fn record_action(
        &self,
        tenant_id: &str,
        session_id: &str,
        label: &str,
    ) -> Result<Session> {
        let label = label.to_string();
        self.manager
            .update_with(tenant_id, session_id, move |session| {
                *session
                    .analytics
                    .successful_actions
                    .entry(label.clone())
                    .or_insert(0) += 1;
                session.context.last_action = Some(label);
            })
            .await
    }

    /// Move the conversation state machine, optionally switching topic
    ///
    /// A topic switch also bumps the session's preferred-topics counter.
    pub async fn update_conversation_state(
        &self,
        tenant_id: &str,
        session_id: &str,
        state: ConversationState,
        topic: Option<String>,
    ) -> Result<Session> {
        self.manager
            .update_with(tenant_id, session_id, move |session| {
                session.conversation.state = state;
                if let Some(topic) = topic {
                    *session
                        .analytics
                        .preferred_topics
                        .entry(topic.clone())
                        .or_insert(0) += 1;
                    session.conversation.current_topic = Some(topic);
                }
            })
            .await
    }
}
