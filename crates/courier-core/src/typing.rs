//! Typing indicators.
//!
//! Each conversation with at least one typing participant has an entry
//! holding the set of typing users. Entries never outlive their last member,
//! and nothing expires on a timer: a user stays typing until an explicit stop
//! or until their connection goes away.

use crate::connection::Identity;
use crate::registry::ConnectionRegistry;
use courier_protocol::{ConversationId, ServerEvent, UserId};
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Tracks who is typing in which conversation and relays the signals.
#[derive(Debug)]
pub struct TypingTracker {
    registry: Arc<ConnectionRegistry>,
    conversations: DashMap<ConversationId, HashSet<UserId>>,
}

impl TypingTracker {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            registry,
            conversations: DashMap::new(),
        }
    }

    /// Mark `user` as typing to `counterpart` and notify the counterpart.
    ///
    /// The notification is sent on every call, even when the user was
    /// already marked as typing.
    pub fn start(&self, user: &Identity, counterpart: &UserId) -> ConversationId {
        let conversation = ConversationId::derive(&user.user_id, counterpart);

        let added = self
            .conversations
            .entry(conversation.clone())
            .or_default()
            .insert(user.user_id.clone());

        let delivered = self.registry.send_to(
            counterpart,
            ServerEvent::typing_start(user.user_id.clone(), user.username.clone()),
        );

        trace!(
            user = %user.user_id,
            conversation = %conversation,
            added,
            delivered,
            "Typing started"
        );

        conversation
    }

    /// Clear `user`'s typing flag towards `counterpart` and notify the counterpart.
    ///
    /// Returns `true` if the user was marked as typing.
    pub fn stop(&self, user: &UserId, counterpart: &UserId) -> bool {
        let conversation = ConversationId::derive(user, counterpart);
        let removed = self.remove(&conversation, user);

        let delivered = self
            .registry
            .send_to(counterpart, ServerEvent::typing_stop(user.clone()));

        trace!(
            user = %user,
            conversation = %conversation,
            removed,
            delivered,
            "Typing stopped"
        );

        removed
    }

    /// Remove `user` from every typing set, for disconnect cleanup.
    ///
    /// When `notify` is set, each counterpart gets a `typing:stop`.
    /// Returns the conversations the user was typing in.
    pub fn clear_user(&self, user: &UserId, notify: bool) -> Vec<ConversationId> {
        let mut cleared = Vec::new();

        self.conversations.retain(|conversation, typing| {
            if typing.remove(user) {
                cleared.push(conversation.clone());
            }
            !typing.is_empty()
        });

        if notify {
            for conversation in &cleared {
                if let Some(counterpart) = conversation.counterpart(user) {
                    self.registry
                        .send_to(&counterpart, ServerEvent::typing_stop(user.clone()));
                }
            }
        }

        if !cleared.is_empty() {
            debug!(user = %user, conversations = cleared.len(), notify, "Cleared typing state");
        }

        cleared
    }

    /// Whether `user` is currently typing to `counterpart`.
    #[must_use]
    pub fn is_typing(&self, user: &UserId, counterpart: &UserId) -> bool {
        let conversation = ConversationId::derive(user, counterpart);
        self.conversations
            .get(&conversation)
            .is_some_and(|typing| typing.contains(user))
    }

    /// Number of conversations with someone typing.
    #[must_use]
    pub fn active_conversations(&self) -> usize {
        self.conversations.len()
    }

    fn remove(&self, conversation: &ConversationId, user: &UserId) -> bool {
        let removed = match self.conversations.get_mut(conversation) {
            Some(mut typing) => typing.remove(user),
            None => false,
        };
        self.conversations
            .remove_if(conversation, |_, typing| typing.is_empty());
        removed
    }
}
