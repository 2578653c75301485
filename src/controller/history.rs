//! Conversation history collaborator.
//!
//! Durable conversation storage is owned by a separate collaborator. The
//! controller only passes calls through, and falls back to empty results when
//! no collaborator is wired in or when it fails.

use crate::error::{CheddarError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One user/assistant exchange within a stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub timestamp_ms: u64,
    pub transcription: String,
    pub ai_response: String,
}

/// A stored conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub id: String,
    pub timestamp_ms: u64,
    pub turns: Vec<ConversationTurn>,
}

/// Async conversation storage backend.
#[async_trait]
pub trait ConversationStorage: Send + Sync {
    /// Prepare the backend (open database, create directories).
    async fn init(&self) -> Result<()>;

    /// Identifiers of all stored sessions, in storage order.
    async fn list_sessions(&self) -> Result<Vec<String>>;

    /// Load a session; `Ok(None)` if it does not exist.
    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>>;
}

/// In-memory conversation storage for testing and ephemeral usage.
///
/// Sessions are kept in insertion order. Cheaply cloneable.
#[derive(Debug, Clone, Default)]
pub struct MemoryConversationStorage {
    sessions: Arc<RwLock<Vec<ConversationSession>>>,
    initialized: Arc<RwLock<bool>>,
}

impl MemoryConversationStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a session, keeping the original position on replace.
    pub async fn insert(&self, session: ConversationSession) {
        let mut sessions = self.sessions.write().await;
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => sessions.push(session),
        }
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }
}

#[async_trait]
impl ConversationStorage for MemoryConversationStorage {
    async fn init(&self) -> Result<()> {
        *self.initialized.write().await = true;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<String>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.iter().map(|s| s.id.clone()).collect())
    }

    async fn get_session(&self, id: &str) -> Result<Option<ConversationSession>> {
        if id.trim().is_empty() {
            return Err(CheddarError::Storage(
                "session id cannot be empty".to_owned(),
            ));
        }
        let sessions = self.sessions.read().await;
        Ok(sessions.iter().find(|s| s.id == id).cloned())
    }
}
