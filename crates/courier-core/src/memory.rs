//! In-memory store.
//!
//! Implements both [`UserStore`] and [`MessageStore`] on concurrent maps.
//! Data lives as long as the process.

use crate::store::{MessageStore, NewMessage, StoreError, User, UserStore};
use async_trait::async_trait;
use courier_protocol::{ConversationId, Message, MessageId, Timestamp, UserId};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;
use uuid::Uuid;

/// A stored message with its insertion sequence.
#[derive(Debug)]
struct StoredMessage {
    sequence: u64,
    message: Message,
}

/// Process-memory user and message store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<UserId, User>,
    messages: DashMap<MessageId, StoredMessage>,
    sequence: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with users.
    #[must_use]
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Self::new();
        for user in users {
            store.insert_user(user);
        }
        store
    }

    /// Add or replace a user profile.
    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    /// Snapshot of a user profile.
    #[must_use]
    pub fn user(&self, user_id: &UserId) -> Option<User> {
        self.users.get(user_id).map(|u| u.clone())
    }

    /// Snapshot of a message.
    #[must_use]
    pub fn message(&self, id: &MessageId) -> Option<Message> {
        self.messages.get(id).map(|m| m.message.clone())
    }

    /// Number of stored messages.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.user(user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn set_presence(
        &self,
        user_id: &UserId,
        is_online: bool,
        last_seen: Timestamp,
    ) -> Result<(), StoreError> {
        if let Some(mut user) = self.users.get_mut(user_id) {
            user.is_online = is_online;
            user.last_seen = Some(last_seen);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn create(&self, new: NewMessage) -> Result<Message, StoreError> {
        let id = MessageId::new(Uuid::new_v4().to_string());
        let message = Message::new(
            id.clone(),
            new.sender_id,
            new.receiver_id,
            new.content,
            new.created_at,
        );
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);

        self.messages.insert(
            id,
            StoredMessage {
                sequence,
                message: message.clone(),
            },
        );
        trace!(message = %message.id, conversation = %message.conversation_id, "Stored message");

        Ok(message)
    }

    async fn find(&self, id: &MessageId) -> Result<Option<Message>, StoreError> {
        Ok(self.message(id))
    }

    async fn mark_read(
        &self,
        id: &MessageId,
        read_at: Timestamp,
    ) -> Result<Option<Message>, StoreError> {
        // The shard write lock makes check-and-set atomic per message.
        Ok(self.messages.get_mut(id).and_then(|mut stored| {
            stored
                .message
                .mark_read(read_at)
                .then(|| stored.message.clone())
        }))
    }

    async fn conversation(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let mut matching: Vec<(u64, Message)> = self
            .messages
            .iter()
            .filter(|entry| &entry.message.conversation_id == conversation)
            .map(|entry| (entry.sequence, entry.message.clone()))
            .collect();

        matching.sort_by_key(|(sequence, _)| *sequence);
        let skip = matching.len().saturating_sub(limit);

        Ok(matching.into_iter().skip(skip).map(|(_, m)| m).collect())
    }

    async fn last_message(
        &self,
        conversation: &ConversationId,
    ) -> Result<Option<Message>, StoreError> {
        Ok(self
            .messages
            .iter()
            .filter(|entry| &entry.message.conversation_id == conversation)
            .max_by_key(|entry| entry.sequence)
            .map(|entry| entry.message.clone()))
    }
}
