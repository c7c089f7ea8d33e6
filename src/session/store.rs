//! Session persistence — primary backend, local fallback, degradation
//!
//! Every operation targets the primary backend first under a bounded
//! timeout. The first operational failure flips a one-way `degraded` flag
//! for the remaining process lifetime and the identical operation is
//! re-issued against the local fallback, which keeps byte-identical
//! session schema but does not enforce TTL.
//!
//! Fallback directory layout (when persistence is enabled):
//! ```text
//! <fallback_dir>/
//! ├── <session-uuid>.json
//! └── ...
//! ```

use super::Session;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;

/// Keyed session storage, partitioned by club (tenant)
///
/// `session_id` is unique per tenant; implementations must never return a
/// session to a caller asking under a different tenant.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Write a session, replacing any existing record, with an optional TTL
    async fn put(&self, session: &Session, ttl: Option<Duration>) -> Result<()>;

    /// Read a session scoped by tenant
    async fn get(&self, tenant_id: &str, session_id: &str) -> Result<Option<Session>>;

    /// Remove a session scoped by tenant, returning whether it existed
    async fn delete(&self, tenant_id: &str, session_id: &str) -> Result<bool>;

    /// All sessions for one user within one tenant
    async fn list_by_user(&self, tenant_id: &str, user_id: &str) -> Result<Vec<Session>>;

    /// Liveness probe
    async fn ping(&self) -> Result<()>;
}

fn session_key(tenant_id: &str, session_id: &str) -> String {
    format!("{}:{}", tenant_id, session_id)
}

struct StoredSession {
    session: Session,
    /// Unix millis after which the record is treated as absent
    expires_at: Option<i64>,
}

impl StoredSession {
    fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory primary-store stand-in with lazy TTL expiry on read
///
/// Production deployments inject a remote implementation behind
/// [`SessionBackend`]; this one backs tests and single-process use.
pub struct MemoryBackend {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl MemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn put(&self, session: &Session, ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map(|t| super::now_millis() + t.as_millis() as i64);
        let key = session_key(&session.tenant_id, &session.session_id);
        self.sessions.write().await.insert(
            key,
            StoredSession {
                session: session.clone(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn get(&self, tenant_id: &str, session_id: &str) -> Result<Option<Session>> {
        let key = session_key(tenant_id, session_id);
        let now = super::now_millis();

        {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                Some(stored) if !stored.is_expired(now) => {
                    return Ok(Some(stored.session.clone()))
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired record: drop it so list_by_user stays consistent
        self.sessions.write().await.remove(&key);
        Ok(None)
    }

    async fn delete(&self, tenant_id: &str, session_id: &str) -> Result<bool> {
        let key = session_key(tenant_id, session_id);
        Ok(self.sessions.write().await.remove(&key).is_some())
    }

    async fn list_by_user(&self, tenant_id: &str, user_id: &str) -> Result<Vec<Session>> {
        let now = super::now_millis();
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| !s.is_expired(now))
            .filter(|s| s.session.tenant_id == tenant_id && s.session.user_id == user_id)
            .map(|s| s.session.clone())
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Client-resident fallback store with identical session schema
///
/// TTL is not enforceable here: fallback sessions persist until explicitly
/// ended. With a directory configured, each session is mirrored to one JSON
/// file (fire-and-forget) and reloaded on startup; corrupt files are
/// skipped.
pub struct LocalSessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    dir: Option<PathBuf>,
}

impl LocalSessionStore {
    /// Memory-only fallback store
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            dir: None,
        }
    }

    /// Fallback store persisted under `dir`, loading any existing sessions
    pub async fn with_dir(dir: PathBuf) -> Result<Self> {
        tokio::fs::create_dir_all(&dir).await?;

        let mut sessions = HashMap::new();
        for session in Self::load_json_files(&dir) {
            let key = session_key(&session.tenant_id, &session.session_id);
            sessions.insert(key, session);
        }

        Ok(Self {
            sessions: Arc::new(RwLock::new(sessions)),
            dir: Some(dir),
        })
    }

    /// Load all parseable session files from a directory
    fn load_json_files(dir: &Path) -> Vec<Session> {
        let mut items = Vec::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to read fallback dir {}: {}", dir.display(), e);
                }
                return items;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(session) => items.push(session),
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", path.display(), e);
                }
            }
        }

        items
    }

    /// Mirror a session to disk (fire-and-forget)
    fn persist(&self, session: &Session) {
        let Some(dir) = self.dir.clone() else {
            return;
        };
        let session = session.clone();
        tokio::spawn(async move {
            let path = dir.join(format!("{}.json", session.session_id));
            match serde_json::to_string_pretty(&session) {
                Ok(json) => {
                    if let Err(e) = tokio::fs::write(&path, json).await {
                        tracing::warn!("Failed to persist session {}: {}", session.session_id, e);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to serialize session {}: {}", session.session_id, e);
                }
            }
        });
    }

    /// Remove a session file (fire-and-forget)
    fn unpersist(&self, session_id: &str) {
        let Some(dir) = self.dir.clone() else {
            return;
        };
        let path = dir.join(format!("{}.json", session_id));
        tokio::spawn(async move {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                }
            }
        });
    }
}

impl Default for LocalSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionBackend for LocalSessionStore {
    async fn put(&self, session: &Session, _ttl: Option<Duration>) -> Result<()> {
        let key = session_key(&session.tenant_id, &session.session_id);
        self.sessions.write().await.insert(key, session.clone());
        self.persist(session);
        Ok(())
    }

    async fn get(&self, tenant_id: &str, session_id: &str) -> Result<Option<Session>> {
        let key = session_key(tenant_id, session_id);
        Ok(self.sessions.read().await.get(&key).cloned())
    }

    async fn delete(&self, tenant_id: &str, session_id: &str) -> Result<bool> {
        let key = session_key(tenant_id, session_id);
        let removed = self.sessions.write().await.remove(&key).is_some();
        if removed {
            self.unpersist(session_id);
        }
        Ok(removed)
    }

    async fn list_by_user(&self, tenant_id: &str, user_id: &str) -> Result<Vec<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.tenant_id == tenant_id && s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// Store health snapshot
#[derive(Debug, Clone, Copy)]
pub struct StoreHealth {
    pub primary_healthy: bool,
    pub fallback_healthy: bool,
}

/// Primary store with one-way degradation to the local fallback
pub struct SessionStore {
    primary: Arc<dyn SessionBackend>,
    fallback: Arc<dyn SessionBackend>,
    degraded: AtomicBool,
    op_timeout: Duration,
}

impl SessionStore {
    /// Wrap a primary and fallback backend
    pub fn new(
        primary: Arc<dyn SessionBackend>,
        fallback: Arc<dyn SessionBackend>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            degraded: AtomicBool::new(false),
            op_timeout,
        }
    }

    /// Whether the store has flipped to the fallback
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Flip to fallback mode for the remaining process lifetime
    fn mark_degraded(&self, op: &str, reason: &str) {
        if !self.degraded.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                "Primary session store failed during {} ({}); \
                 degrading to local fallback for process lifetime",
                op,
                reason
            );
        }
    }

    /// Write a session, renewing its TTL on the primary
    pub async fn put(&self, session: &Session, ttl: Option<Duration>) -> Result<()> {
        if !self.is_degraded() {
            match timeout(self.op_timeout, self.primary.put(session, ttl)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => self.mark_degraded("put", &e.to_string()),
                Err(_) => self.mark_degraded("put", "timed out"),
            }
        }
        self.fallback.put(session, ttl).await
    }

    /// Read a session scoped by tenant
    pub async fn get(&self, tenant_id: &str, session_id: &str) -> Result<Option<Session>> {
        if !self.is_degraded() {
            match timeout(self.op_timeout, self.primary.get(tenant_id, session_id)).await {
                Ok(Ok(found)) => return Ok(found),
                Ok(Err(e)) => self.mark_degraded("get", &e.to_string()),
                Err(_) => self.mark_degraded("get", "timed out"),
            }
        }
        self.fallback.get(tenant_id, session_id).await
    }

    /// Remove a session scoped by tenant
    pub async fn delete(&self, tenant_id: &str, session_id: &str) -> Result<bool> {
        if !self.is_degraded() {
            match timeout(self.op_timeout, self.primary.delete(tenant_id, session_id)).await {
                Ok(Ok(removed)) => return Ok(removed),
                Ok(Err(e)) => self.mark_degraded("delete", &e.to_string()),
                Err(_) => self.mark_degraded("delete", "timed out"),
            }
        }
        self.fallback.delete(tenant_id, session_id).await
    }

    /// All sessions for one user within one tenant
    pub async fn list_by_user(&self, tenant_id: &str, user_id: &str) -> Result<Vec<Session>> {
        if !self.is_degraded() {
            match timeout(self.op_timeout, self.primary.list_by_user(tenant_id, user_id)).await {
                Ok(Ok(sessions)) => return Ok(sessions),
                Ok(Err(e)) => self.mark_degraded("list_by_user", &e.to_string()),
                Err(_) => self.mark_degraded("list_by_user", "timed out"),
            }
        }
        self.fallback.list_by_user(tenant_id, user_id).await
    }

    /// Probe both stores; never flips the degradation flag
    pub async fn health(&self) -> StoreHealth {
        let primary_healthy = if self.is_degraded() {
            false
        } else {
            matches!(
                timeout(self.op_timeout, self.primary.ping()).await,
                Ok(Ok(()))
            )
        };
        let fallback_healthy = matches!(
            timeout(self.op_timeout, self.fallback.ping()).await,
            Ok(Ok(()))
        );
        StoreHealth {
            primary_healthy,
            fallback_healthy,
        }
    }
}
