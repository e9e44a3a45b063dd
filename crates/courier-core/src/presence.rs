//! Presence broadcasting.
//!
//! Presence changes are persisted on a best-effort basis and then fanned out
//! to every live connection at the moment of the change.

use crate::registry::ConnectionRegistry;
use crate::store::UserStore;
use courier_protocol::{now_millis, ServerEvent, UserId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Announces online/offline transitions.
pub struct PresenceBroadcaster {
    registry: Arc<ConnectionRegistry>,
    users: Arc<dyn UserStore>,
}

impl PresenceBroadcaster {
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, users: Arc<dyn UserStore>) -> Self {
        Self { registry, users }
    }

    /// Persist that `user` is online and broadcast `user:online`.
    ///
    /// Returns the number of connections notified.
    pub async fn online(&self, user: &UserId) -> usize {
        self.persist(user, true).await;
        let count = self.registry.broadcast(ServerEvent::user_online(user.clone()));
        debug!(user = %user, recipients = count, "Presence: online");
        count
    }

    /// Persist that `user` is offline and broadcast `user:offline`.
    ///
    /// Returns the number of connections notified.
    pub async fn offline(&self, user: &UserId) -> usize {
        self.persist(user, false).await;
        let count = self
            .registry
            .broadcast(ServerEvent::user_offline(user.clone()));
        debug!(user = %user, recipients = count, "Presence: offline");
        count
    }

    async fn persist(&self, user: &UserId, is_online: bool) {
        if let Err(e) = self.users.set_presence(user, is_online, now_millis()).await {
            warn!(user = %user, is_online, error = %e, "Failed to persist presence");
        }
    }
}
