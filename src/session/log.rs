//! Conversation log — append-only message sequence per session
//!
//! Appends assign server-side ids and timestamps, bump the per-session
//! counters and, for qualifying user messages, feed the semantic index on
//! a best-effort basis: an index or embedding failure is logged and never
//! fails the append.

use super::manager::SessionManager;
use super::{now_millis, ConversationState, Message, MessageMetadata, MessageRole};
use crate::embedding::EmbeddingProvider;
use crate::error::{Error, Result};
use crate::semantic::{EmbeddingRecord, SemanticIndex};
use std::sync::Arc;
use uuid::Uuid;

/// A message before the log assigns id and timestamp
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub role: MessageRole,
    pub content: String,
    pub intent: Option<String>,
    pub metadata: Option<MessageMetadata>,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            intent: None,
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            intent: None,
            metadata: None,
        }
    }

    pub fn with_intent(mut self, intent: impl Into<String>) -> Self {
        self.intent = Some(intent.into());
        self
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Append-only conversation log over the session manager
pub struct ConversationLog {
    manager: Arc<SessionManager>,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn SemanticIndex>,
    /// Minimum user-message length (chars) that triggers embedding
    min_embed_chars: usize,
}

impl ConversationLog {
    pub fn new(
        manager: Arc<SessionManager>,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn SemanticIndex>,
        min_embed_chars: usize,
    ) -> Self {
        Self {
            manager,
            embedder,
            index,
            min_embed_chars,
        }
    }

    /// Append a message, returning it with id and timestamp assigned
    pub async fn append(
        &self,
        tenant_id: &str,
        session_id: &str,
        draft: MessageDraft,
    ) -> Result<Message> {
        if draft.content.trim().is_empty() {
            return Err(Error::MalformedInput(
                "message content must not be empty".to_string(),
            ));
        }

        let message = Message {
            id: format!("msg-{}", Uuid::new_v4()),
            timestamp: now_millis(),
            role: draft.role,
            content: draft.content,
            intent: draft.intent,
            metadata: draft.metadata,
        };

        let updated = self
            .manager
            .update_with(tenant_id, session_id, move |session| {
                let mut message = message;
                // Timestamps never decrease within one session's log
                if let Some(last) = session.conversation.messages.last() {
                    message.timestamp = message.timestamp.max(last.timestamp);
                }

                session.analytics.total_messages += 1;
                if let Some(intent) = &message.intent {
                    *session
                        .analytics
                        .common_queries
                        .entry(intent.clone())
                        .or_insert(0) += 1;
                    session.conversation.intent = Some(intent.clone());
                }

                match message.role {
                    MessageRole::User => {
                        // First user turn moves the conversation out of greeting
                        if session.conversation.state == ConversationState::Greeting {
                            session.conversation.state = ConversationState::Active;
                        }
                        session.conversation.awaiting_response = true;
                    }
                    MessageRole::Assistant => {
                        session.conversation.awaiting_response = false;
                    }
                    MessageRole::System => {}
                }

                session.conversation.messages.push(message);
            })
            .await?;

        let appended = updated
            .conversation
            .messages
            .last()
            .cloned()
            .ok_or_else(|| Error::Internal("appended message missing from session".to_string()))?;

        if appended.role == MessageRole::User
            && appended.content.chars().count() >= self.min_embed_chars
        {
            if let Err(e) = self.index_message(tenant_id, session_id, &appended).await {
                tracing::warn!(
                    "Failed to index message {} from session {}: {}",
                    appended.id,
                    session_id,
                    e
                );
            }
        }

        Ok(appended)
    }

    /// Full ordered message log for a session
    pub async fn read(&self, tenant_id: &str, session_id: &str) -> Result<Vec<Message>> {
        let session = self.manager.get(tenant_id, session_id).await?;
        Ok(session.conversation.messages)
    }

    async fn index_message(
        &self,
        tenant_id: &str,
        session_id: &str,
        message: &Message,
    ) -> Result<()> {
        let vector = self.embedder.embed(&message.content).await?;
        self.index
            .upsert(EmbeddingRecord {
                id: EmbeddingRecord::composite_id(tenant_id, session_id, &message.id),
                vector,
                tenant_id: tenant_id.to_string(),
                session_id: session_id.to_string(),
                message_id: message.id.clone(),
                content: message.content.clone(),
                intent: message.intent.clone(),
                timestamp: message.timestamp,
            })
            .await
    }
}
