//! The user roster.
//!
//! Every other user with their persisted presence and the newest message of
//! the conversation shared with the viewer. Clients fetch it to recover
//! presence changes broadcast while they were not connected.

use crate::store::{MessageStore, StoreError, User, UserStore};
use courier_protocol::{ConversationId, Message, Timestamp, UserId};
use serde::Serialize;

/// Preview of the newest message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub content: String,
    pub created_at: Timestamp,
    pub sender_id: UserId,
}

impl From<Message> for LastMessage {
    fn from(message: Message) -> Self {
        Self {
            content: message.content,
            created_at: message.created_at,
            sender_id: message.sender_id,
        }
    }
}

/// One roster row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(flatten)]
    pub user: User,
    pub last_message: Option<LastMessage>,
}

/// Build the roster as seen by `viewer`, ordered by username.
///
/// # Errors
///
/// Returns an error if either store fails.
pub async fn roster(
    users: &dyn UserStore,
    messages: &dyn MessageStore,
    viewer: &UserId,
) -> Result<Vec<RosterEntry>, StoreError> {
    let mut entries = Vec::new();

    for user in users.list_users().await? {
        if &user.id == viewer {
            continue;
        }
        let conversation = ConversationId::derive(viewer, &user.id);
        let last_message = messages.last_message(&conversation).await?.map(Into::into);
        entries.push(RosterEntry { user, last_message });
    }

    Ok(entries)
}
