//! The persisted chat message.

use crate::conversation::ConversationId;
use crate::ids::{MessageId, UserId};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}

/// A direct message between two users.
///
/// A message starts unread and moves to read exactly once; it never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identity.
    pub id: MessageId,
    /// Conversation derived from sender and receiver.
    pub conversation_id: ConversationId,
    /// Author of the message.
    pub sender_id: UserId,
    /// Addressee of the message.
    pub receiver_id: UserId,
    /// Text content, exactly as sent.
    pub content: String,
    /// Creation time.
    pub created_at: Timestamp,
    /// Whether the receiver has read the message.
    pub is_read: bool,
    /// When the receiver read the message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<Timestamp>,
}

impl Message {
    /// Create an unread message.
    #[must_use]
    pub fn new(
        id: MessageId,
        sender_id: UserId,
        receiver_id: UserId,
        content: impl Into<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            conversation_id: ConversationId::derive(&sender_id, &receiver_id),
            sender_id,
            receiver_id,
            content: content.into(),
            created_at,
            is_read: false,
            read_at: None,
        }
    }

    /// Apply the unread to read transition.
    ///
    /// Returns `false` and leaves the message untouched if it was already read.
    pub fn mark_read(&mut self, at: Timestamp) -> bool {
        if self.is_read {
            return false;
        }
        self.is_read = true;
        self.read_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message::new(
            MessageId::new("m1"),
            UserId::parse("bob").unwrap(),
            UserId::parse("alice").unwrap(),
            "hi",
            1_700_000_000_000,
        )
    }

    #[test]
    fn test_new_message_is_unread() {
        let msg = sample();
        assert!(!msg.is_read);
        assert!(msg.read_at.is_none());
        assert_eq!(msg.conversation_id.as_str(), "alice_bob");
    }

    #[test]
    fn test_mark_read_is_monotonic() {
        let mut msg = sample();
        assert!(msg.mark_read(10));
        assert!(!msg.mark_read(20));
        assert!(msg.is_read);
        assert_eq!(msg.read_at, Some(10));
    }

    #[test]
    fn test_message_json_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["conversationId"], "alice_bob");
        assert_eq!(json["senderId"], "bob");
        assert_eq!(json["receiverId"], "alice");
        assert_eq!(json["isRead"], false);
        assert!(json.get("readAt").is_none());
    }
}
