//! Persistence collaborators.
//!
//! The core never owns durable state. It reads and writes users and messages
//! through these traits; [`MemoryStore`](crate::memory::MemoryStore) is the
//! bundled implementation.

use async_trait::async_trait;
use courier_protocol::{ConversationId, Message, MessageId, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store errors.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A user profile as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub last_seen: Option<Timestamp>,
}

impl User {
    /// Create an offline user that has never been seen.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            is_online: false,
            last_seen: None,
        }
    }
}

/// A message about to be persisted; the store assigns its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    pub created_at: Timestamp,
}

/// User-profile store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user profile.
    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// All user profiles, ordered by username.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Persist a user's online flag and last-seen time.
    async fn set_presence(
        &self,
        user_id: &UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), StoreError>;
}

/// Message store.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new, unread message and return the stored copy.
    async fn create(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Load a message by identity.
    async fn find(&self, id: &MessageId) -> Result<Option<Message>, StoreError>;

    /// Apply the unread to read transition.
    ///
    /// Returns the updated message only if this call performed the
    /// transition; an unknown or already-read message yields `None`.
    async fn mark_read(
        &self,
        id: &MessageId,
        read_at: Timestamp,
    ) -> Result<Option<Message>, StoreError>;

    /// The most recent `limit` messages of a conversation, oldest first.
    async fn conversation(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    /// The newest message of a conversation.
    async fn last_message(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<Message>, StoreError>;
}
