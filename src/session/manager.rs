//! Session lifecycle — create, read-modify-write, end
//!
//! All mutation goes through [`SessionManager::update_with`], which holds a
//! per-session async mutex for the whole read-modify-write window. That
//! gives single-logical-writer semantics within one process; the backend
//! itself offers no compare-and-swap.

use super::store::SessionStore;
use super::{Preferences, Session};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Session lifecycle manager over the degrading store
pub struct SessionManager {
    store: Arc<SessionStore>,
    ttl: Duration,
    /// Per-session write locks, keyed by `tenant:session`
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionManager {
    /// Create a manager writing sessions with the given TTL
    pub fn new(store: Arc<SessionStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The degrading store behind this manager
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    async fn write_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn require_id(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(Error::MalformedInput(format!("{} must not be empty", field)));
        }
        Ok(())
    }

    /// Create a new session in the `Greeting` state and persist it
    pub async fn create(
        &self,
        tenant_id: &str,
        user_id: &str,
        preferences: Option<Preferences>,
    ) -> Result<Session> {
        Self::require_id(tenant_id, "tenant_id")?;
        Self::require_id(user_id, "user_id")?;

        let session = Session::new(tenant_id, user_id, preferences);
        self.store.put(&session, Some(self.ttl)).await?;

        tracing::info!(
            "Created session {} for user {} in club {}",
            session.session_id,
            user_id,
            tenant_id
        );

        Ok(session)
    }

    /// Get a session by id, scoped by tenant
    pub async fn get(&self, tenant_id: &str, session_id: &str) -> Result<Session> {
        Self::require_id(tenant_id, "tenant_id")?;
        Self::require_id(session_id, "session_id")?;

        self.store
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))
    }

    /// Read-modify-write under the per-session lock
    ///
    /// Loads the session, applies `mutate`, refreshes `last_active_at`
    /// (never backwards) and writes back with a renewed TTL. Ended
    /// sessions accept no further writes.
    pub async fn update_with<F>(
        &self,
        tenant_id: &str,
        session_id: &str,
        mutate: F,
    ) -> Result<Session>
    where
        F: FnOnce(&mut Session),
    {
        Self::require_id(tenant_id, "tenant_id")?;
        Self::require_id(session_id, "session_id")?;

        let key = format!("{}:{}", tenant_id, session_id);
        let lock = self.write_lock(&key).await;
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        if session.is_ended() {
            return Err(Error::NotFound(format!(
                "session {} has ended",
                session_id
            )));
        }

        mutate(&mut session);
        session.touch();
        self.store.put(&session, Some(self.ttl)).await?;

        Ok(session)
    }

    /// End a session: write the terminal state as the final write
    ///
    /// Idempotent — ending an already-ended session is a no-op.
    pub async fn end(&self, tenant_id: &str, session_id: &str) -> Result<()> {
        Self::require_id(tenant_id, "tenant_id")?;
        Self::require_id(session_id, "session_id")?;

        let key = format!("{}:{}", tenant_id, session_id);
        let lock = self.write_lock(&key).await;
        let _guard = lock.lock().await;

        let mut session = self
            .store
            .get(tenant_id, session_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("session {}", session_id)))?;

        if session.is_ended() {
            return Ok(());
        }

        session.conversation.state = super::ConversationState::Ended;
        session.conversation.awaiting_response = false;
        session.touch();
        self.store.put(&session, Some(self.ttl)).await?;

        drop(_guard);
        self.locks.lock().await.remove(&key);

        tracing::info!("Ended session {} in club {}", session_id, tenant_id);

        Ok(())
    }
}
