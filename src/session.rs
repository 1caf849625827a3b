//! Conversation session store
//!
//! Sessions live in memory for the lifetime of the process (durability is an
//! explicit non-goal). The map lock is held only for lookup and insert; each
//! session carries its own mutex, so mutations on one conversation never
//! serialize against another. Expiry is evaluated lazily on access: a session
//! whose `last_accessed_at` is older than the TTL is treated as absent and
//! removed when touched. There is no background sweep.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{Error, Result};

/// Topic label a session carries until it is classified
pub const DEFAULT_TOPIC: &str = "New Topic";

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    /// Convenience constructor
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Point-in-time snapshot of a session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    pub topic_name: String,
    pub history: Vec<Turn>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

/// Summary row for session listings
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: String,
    pub topic_name: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub message_count: usize,
}

/// Mutable state behind each session's own lock
#[derive(Debug)]
struct SessionState {
    topic_name: String,
    history: Vec<Turn>,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl SessionState {
    fn snapshot(&self, id: &str) -> Session {
        Session {
            id: id.to_string(),
            topic_name: self.topic_name.clone(),
            history: self.history.clone(),
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
        }
    }
}

/// In-memory store of conversation sessions
pub struct SessionStore {
    ttl: chrono::Duration,
    sessions: RwLock<HashMap<String, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    /// Create a store whose sessions expire after `ttl` of inactivity
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Allocate a fresh session
    ///
    /// Always succeeds; ids are never reused.
    pub async fn create(&self, topic_name: Option<&str>) -> Session {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let state = SessionState {
            topic_name: topic_name.unwrap_or(DEFAULT_TOPIC).to_string(),
            history: Vec::new(),
            created_at: now,
            last_accessed_at: now,
        };
        let snapshot = state.snapshot(&id);

        self.sessions
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(state)));

        tracing::info!(session_id = %id, topic = %snapshot.topic_name, "session created");
        snapshot
    }

    /// Return the live session for `session_id`, or transparently create one
    ///
    /// An absent, expired, or unsupplied id yields a brand-new session, so
    /// callers never special-case unknown ids. A hit refreshes
    /// `last_accessed_at`.
    pub async fn get_or_create(&self, session_id: Option<&str>) -> Session {
        if let Some(id) = session_id
            && let Some(snapshot) = self.touch(id).await
        {
            return snapshot;
        }
        self.create(None).await
    }

    /// Discard the old session (if any) and create a fresh one
    ///
    /// Returns the old id as supplied, for auditing, alongside the new
    /// session. Never fails: an unknown old id is simply reported back.
    pub async fn reset(
        &self,
        session_id: Option<&str>,
        new_topic_name: Option<&str>,
    ) -> (Option<String>, Session) {
        if let Some(id) = session_id {
            let removed = self.sessions.write().await.remove(id).is_some();
            if removed {
                tracing::info!(session_id = %id, "session discarded on reset");
            }
        }
        let session = self.create(new_topic_name).await;
        (session_id.map(String::from), session)
    }

    /// Empty a session's history, keeping the session alive under the same id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session is absent or expired
    pub async fn clear_history(&self, session_id: &str) -> Result<()> {
        self.with_session(session_id, |state| {
            state.history.clear();
        })
        .await?;
        tracing::info!(session_id, "session history cleared");
        Ok(())
    }

    /// Append a single turn
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session is absent or expired
    pub async fn append_turn(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        self.with_session(session_id, |state| {
            state.history.push(Turn::new(role, content));
        })
        .await
    }

    /// Append a user turn and its paired assistant answer atomically
    ///
    /// Both turns land under a single lock acquisition: a concurrent reader
    /// never observes the question without its answer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session is absent or expired
    pub async fn append_exchange(
        &self,
        session_id: &str,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<()> {
        self.with_session(session_id, |state| {
            state.history.push(Turn::new(Role::User, user_text));
            state.history.push(Turn::new(Role::Assistant, assistant_text));
        })
        .await
    }

    /// Relabel a session's topic
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session is absent or expired
    pub async fn set_topic(&self, session_id: &str, topic_name: &str) -> Result<()> {
        self.with_session(session_id, |state| {
            state.topic_name = topic_name.to_string();
        })
        .await
    }

    /// Full snapshot of a session, history included
    ///
    /// Counts as an access and refreshes `last_accessed_at`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session is absent or expired
    pub async fn history(&self, session_id: &str) -> Result<Session> {
        self.touch(session_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("session: {session_id}")))
    }

    /// Snapshot of all non-expired sessions
    pub async fn list_active(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(sessions.len());
        for (id, entry) in sessions.iter() {
            let state = entry.lock().await;
            if self.is_expired(&state) {
                continue;
            }
            summaries.push(SessionSummary {
                id: id.clone(),
                topic_name: state.topic_name.clone(),
                created_at: state.created_at,
                last_accessed_at: state.last_accessed_at,
                message_count: state.history.len(),
            });
        }
        summaries
    }

    fn is_expired(&self, state: &SessionState) -> bool {
        Utc::now() - state.last_accessed_at > self.ttl
    }

    /// Look up a live session, refresh its access time, and snapshot it.
    /// Expired entries are removed here, which is the only reaping we do.
    async fn touch(&self, session_id: &str) -> Option<Session> {
        let entry = self.sessions.read().await.get(session_id).cloned()?;
        {
            let mut state = entry.lock().await;
            if !self.is_expired(&state) {
                state.last_accessed_at = Utc::now();
                return Some(state.snapshot(session_id));
            }
        }
        self.remove_expired(session_id).await;
        None
    }

    /// Run `f` against a live session under its lock, refreshing access time
    async fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut SessionState) -> T,
    ) -> Result<T> {
        let entry = self.sessions.read().await.get(session_id).cloned();
        if let Some(entry) = entry {
            {
                let mut state = entry.lock().await;
                if !self.is_expired(&state) {
                    state.last_accessed_at = Utc::now();
                    return Ok(f(&mut state));
                }
            }
            self.remove_expired(session_id).await;
        }
        Err(Error::NotFound(format!("session: {session_id}")))
    }

    async fn remove_expired(&self, session_id: &str) {
        if self.sessions.write().await.remove(session_id).is_some() {
            tracing::debug!(session_id, "expired session removed");
        }
    }
}
