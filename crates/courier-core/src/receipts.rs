//! Read receipts.
//!
//! A message moves from unread to read once, and only when the reader is its
//! receiver and the claimed sender is its actual sender. Every other request
//! is dropped without telling the client, so probing message identities
//! reveals nothing.

use crate::error::CoreError;
use crate::registry::ConnectionRegistry;
use crate::store::MessageStore;
use courier_protocol::{now_millis, MessageId, ReadReceipt, ServerEvent, UserId};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Applies read transitions and notifies senders.
pub struct ReadReceipts {
    registry: Arc<ConnectionRegistry>,
    messages: Arc<dyn MessageStore>,
}

impl ReadReceipts {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, messages: Arc<dyn MessageStore>) -> Self {
        Self { registry, messages }
    }

    /// Mark a message read on behalf of `reader`.
    ///
    /// Returns the receipt if this call performed the transition. Unknown
    /// messages, mismatched claims and already-read messages yield `None`.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the store fails.
    pub async fn mark_read(
        &self,
        message_id: &str,
        claimed_sender: &str,
        reader: &UserId,
    ) -> Result<Option<ReadReceipt>, CoreError> {
        let id = MessageId::new(message_id);
        if id.is_empty() {
            return Ok(None);
        }

        let Some(message) = self.messages.find(&id).await? else {
            debug!(message = %id, reader = %reader, "Read receipt for unknown message");
            return Ok(None);
        };

        if &message.receiver_id != reader || message.sender_id.as_str() != claimed_sender {
            warn!(
                message = %id,
                reader = %reader,
                claimed_sender,
                "Dropped unauthorized read receipt"
            );
            return Ok(None);
        }

        if message.is_read {
            trace!(message = %id, "Message already read");
            return Ok(None);
        }

        let read_at = now_millis();
        let Some(updated) = self.messages.mark_read(&id, read_at).await? else {
            // Another request won the transition.
            return Ok(None);
        };

        let receipt = ReadReceipt {
            message_id: updated.id.clone(),
            read_by: reader.clone(),
            read_at: updated.read_at.unwrap_or(read_at),
        };

        let delivered = self
            .registry
            .send_to(&updated.sender_id, ServerEvent::MessageRead(receipt.clone()));
        debug!(message = %id, reader = %reader, delivered, "Message read");

        Ok(Some(receipt))
    }
}
