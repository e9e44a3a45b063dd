//! Connection registry.
//!
//! Maps each user identity to its single live connection handle.

use crate::connection::{ConnectionHandle, ConnectionId};
use courier_protocol::{ServerEvent, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Registry of live connections, one per user.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<UserId, ConnectionHandle>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handle for its user, replacing any existing one.
    ///
    /// Returns the superseded handle. Closing it is up to the caller.
    pub fn register(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user_id = handle.user_id().clone();
        let connection = handle.id().clone();
        let previous = self.connections.insert(user_id.clone(), handle);

        debug!(
            user = %user_id,
            connection = %connection,
            superseded = ?previous.as_ref().map(|h| h.id().to_string()),
            "Registered connection"
        );

        previous
    }

    /// Remove the mapping for `user_id` if it still points at `connection`.
    ///
    /// A disconnect from a handle that was already superseded leaves the
    /// newer registration untouched and returns `false`.
    pub fn unregister(&self, user_id: &UserId, connection: &ConnectionId) -> bool {
        let removed = self
            .connections
            .remove_if(user_id, |_, current| current.id() == connection)
            .is_some();

        if removed {
            debug!(user = %user_id, connection = %connection, "Unregistered connection");
        } else {
            debug!(user = %user_id, connection = %connection, "Ignored stale unregister");
        }

        removed
    }

    /// Get the live handle for a user.
    #[must_use]
    pub fn lookup(&self, user_id: &UserId) -> Option<ConnectionHandle> {
        self.connections.get(user_id).map(|entry| entry.value().clone())
    }

    /// Whether the user has a live connection.
    #[must_use]
    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Deliver an event to a user's live connection, if any.
    ///
    /// Returns `true` if the event was queued.
    pub fn send_to(&self, user_id: &UserId, event: ServerEvent) -> bool {
        match self.lookup(user_id) {
            Some(handle) => {
                let queued = handle.send(event);
                trace!(user = %user_id, queued, "Delivered event");
                queued
            }
            None => false,
        }
    }

    /// Deliver an event to every live connection.
    ///
    /// Returns the number of connections the event was queued for.
    pub fn broadcast(&self, event: ServerEvent) -> usize {
        let event = Arc::new(event);
        let handles: Vec<ConnectionHandle> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        let count = handles
            .iter()
            .filter(|handle| handle.send_shared(Arc::clone(&event)))
            .count();

        trace!(event = event.name(), recipients = count, "Broadcast event");
        count
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
