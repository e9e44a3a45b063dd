//! Message relay.
//!
//! Validates and persists a chat message, then delivers it to the receiver
//! (if online) and back to the sender as the canonical copy of its
//! optimistic placeholder.

use crate::connection::ConnectionHandle;
use crate::error::{CoreError, ValidationError};
use crate::registry::ConnectionRegistry;
use crate::store::{MessageStore, NewMessage};
use courier_protocol::{now_millis, IdentityError, Message, ServerEvent, UserId};
use std::sync::Arc;
use tracing::debug;

/// Default maximum message length, in characters.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 4096;

/// Validate a receiver identity taken from a client request.
///
/// # Errors
///
/// Returns an error if the identity is missing or invalid.
pub fn validate_receiver(receiver_id: &str) -> Result<UserId, ValidationError> {
    UserId::parse(receiver_id).map_err(|e| match e {
        IdentityError::Empty => ValidationError::MissingReceiver,
        other => ValidationError::InvalidReceiver(other),
    })
}

/// Relays direct messages between users.
pub struct MessageRelay {
    registry: Arc<ConnectionRegistry>,
    messages: Arc<dyn MessageStore>,
    max_content_length: usize,
}

impl MessageRelay {
    #[must_use]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        messages: Arc<dyn MessageStore>,
        max_content_length: usize,
    ) -> Self {
        Self {
            registry,
            messages,
            max_content_length,
        }
    }

    /// Persist a message from `sender` and deliver it.
    ///
    /// The receiver gets `message:new` if it has a live connection; the
    /// sending connection always gets `message:sent` with the same message.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a missing receiver or empty content,
    /// and a persistence error if the store rejects the write. Nothing is
    /// delivered in either case.
    pub async fn send(
        &self,
        sender: &ConnectionHandle,
        receiver_id: &str,
        content: &str,
    ) -> Result<Message, CoreError> {
        let receiver = validate_receiver(receiver_id)?;
        self.validate_content(content)?;

        let message = self
            .messages
            .create(NewMessage {
                sender_id: sender.user_id().clone(),
                receiver_id: receiver.clone(),
                content: content.to_string(),
                created_at: now_millis(),
            })
            .await?;

        let delivered = self
            .registry
            .send_to(&receiver, ServerEvent::MessageNew(message.clone()));
        sender.send(ServerEvent::MessageSent(message.clone()));

        debug!(
            message = %message.id,
            sender = %message.sender_id,
            receiver = %message.receiver_id,
            delivered,
            "Relayed message"
        );

        Ok(message)
    }

    fn validate_content(&self, content: &str) -> Result<(), ValidationError> {
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        if content.chars().count() > self.max_content_length {
            return Err(ValidationError::ContentTooLong {
                max: self.max_content_length,
            });
        }
        Ok(())
    }
}
