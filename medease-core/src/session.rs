use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::chat::ChatHistory;
use crate::error::{MedEaseError, Result};

/// Per-session context: the visible chat transcript, the latest generated
/// guide, and the in-flight guard enforcing one request at a time.
///
/// Created explicitly on session start and discarded explicitly on session
/// end; nothing outlives its storage entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    /// Latest generated guide text; overwritten on regeneration.
    pub guide: Option<String>,
    #[serde(skip)]
    pub history: ChatHistory,
    #[serde(skip, default = "new_in_flight")]
    in_flight: Arc<Mutex<()>>,
}

fn new_in_flight() -> Arc<Mutex<()>> {
    Arc::new(Mutex::new(()))
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            guide: None,
            history: ChatHistory::new(),
            in_flight: new_in_flight(),
        }
    }

    /// Claim the session for one guide or chat request. The guard is held for
    /// the duration of the request; a second claim while it is held fails
    /// with `SessionBusy` instead of queueing.
    pub fn try_begin_request(&self) -> Result<OwnedMutexGuard<()>> {
        self.in_flight
            .clone()
            .try_lock_owned()
            .map_err(|_| MedEaseError::SessionBusy(self.id.clone()))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// In-memory implementation of SessionStorage
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, Session>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }
}
