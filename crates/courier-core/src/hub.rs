//! The hub: the process-scoped service every connection talks to.
//!
//! The hub owns the connection registry and typing state, and composes the
//! presence, relay and read-receipt components around them. A connection's
//! lifecycle is `authenticate` → `connect` → `handle_event`* → `disconnect`.

use crate::auth::{AuthError, TokenValidator};
use crate::connection::{ConnectionHandle, Identity, CLOSE_SUPERSEDED};
use crate::error::CoreError;
use crate::presence::PresenceBroadcaster;
use crate::receipts::ReadReceipts;
use crate::registry::ConnectionRegistry;
use crate::relay::{validate_receiver, MessageRelay, DEFAULT_MAX_CONTENT_LENGTH};
use crate::roster::{self, RosterEntry};
use crate::store::{MessageStore, StoreError, UserStore};
use crate::typing::TypingTracker;
use courier_protocol::{ClientEvent, Message, ReadReceipt, ServerEvent, UserId};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Hub configuration.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Close a connection when a newer one registers for the same user.
    pub close_superseded: bool,
    /// Send `typing:stop` to counterparts when a typing user disconnects.
    pub typing_stop_on_disconnect: bool,
    /// Maximum message length in characters.
    pub max_content_length: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            close_superseded: true,
            typing_stop_on_disconnect: true,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// What a successfully handled client event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// A message was persisted and relayed.
    Sent(Message),
    /// A read request was processed; carries the receipt if it changed state.
    Read(Option<ReadReceipt>),
    /// A typing signal was relayed.
    Typing,
}

/// Hub statistics.
#[derive(Debug, Clone)]
pub struct HubStats {
    /// Number of live connections.
    pub connection_count: usize,
    /// Number of conversations with someone typing.
    pub typing_conversations: usize,
}

/// The direct messaging hub.
pub struct Hub {
    registry: Arc<ConnectionRegistry>,
    typing: TypingTracker,
    presence: PresenceBroadcaster,
    relay: MessageRelay,
    receipts: ReadReceipts,
    users: Arc<dyn UserStore>,
    messages: Arc<dyn MessageStore>,
    validator: Arc<dyn TokenValidator>,
    /// Serializes connect and disconnect per user.
    lifecycle: DashMap<UserId, Arc<Mutex<()>>>,
    config: HubConfig,
}

impl Hub {
    /// Create a hub over the given collaborators.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        messages: Arc<dyn MessageStore>,
        validator: Arc<dyn TokenValidator>,
        config: HubConfig,
    ) -> Self {
        info!("Creating hub with config: {:?}", config);

        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            typing: TypingTracker::new(Arc::clone(&registry)),
            presence: PresenceBroadcaster::new(Arc::clone(&registry), Arc::clone(&users)),
            relay: MessageRelay::new(
                Arc::clone(&registry),
                Arc::clone(&messages),
                config.max_content_length,
            ),
            receipts: ReadReceipts::new(Arc::clone(&registry), Arc::clone(&messages)),
            registry,
            users,
            messages,
            validator,
            lifecycle: DashMap::new(),
            config,
        }
    }

    /// Resolve a handshake token to an identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is missing, invalid, or names an
    /// unknown user.
    pub async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        self.validator.validate(token).await
    }

    /// Register a freshly authenticated connection and announce it.
    ///
    /// Typing state left by a superseded connection is cleared. Returns the
    /// handle it superseded, which has already been asked to close when
    /// `close_superseded` is set.
    pub async fn connect(&self, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let user = handle.user_id().clone();
        let _guard = self.lock_user(&user).await;

        let previous = self
            .registry
            .register(handle.clone())
            .filter(|previous| !previous.same_connection(&handle));

        if let Some(previous) = &previous {
            info!(
                user = %user,
                superseded = %previous.id(),
                connection = %handle.id(),
                close = self.config.close_superseded,
                "Connection superseded"
            );
            self.typing
                .clear_user(&user, self.config.typing_stop_on_disconnect);
            if self.config.close_superseded {
                previous.close(CLOSE_SUPERSEDED, "superseded");
            }
        }

        info!(user = %user, connection = %handle.id(), "User connected");
        self.presence.online(&user).await;

        previous
    }

    /// Tear down a connection.
    ///
    /// Typing state is cleared and `user:offline` broadcast only if this
    /// handle was still the user's registered connection. Returns whether
    /// it was. Runs exclusively with any `connect` for the same user.
    pub async fn disconnect(&self, handle: &ConnectionHandle) -> bool {
        let user = handle.user_id();
        let guard = self.lock_user(user).await;

        let removed = self.registry.unregister(user, handle.id());
        if removed {
            self.typing
                .clear_user(user, self.config.typing_stop_on_disconnect);
            self.presence.offline(user).await;
            info!(user = %user, connection = %handle.id(), "User disconnected");
        } else {
            debug!(user = %user, connection = %handle.id(), "Superseded connection closed");
        }

        drop(guard);
        self.lifecycle
            .remove_if(user, |_, lock| Arc::strong_count(lock) == 1);

        removed
    }

    async fn lock_user(&self, user: &UserId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.lifecycle.entry(user.clone()).or_default().value());
        lock.lock_owned().await
    }

    /// The roster as seen by `viewer`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store fails.
    pub async fn roster(&self, viewer: &UserId) -> Result<Vec<RosterEntry>, StoreError> {
        roster::roster(self.users.as_ref(), self.messages.as_ref(), viewer).await
    }

    /// Process one client event from `handle`.
    ///
    /// Failures are reported to the originating connection as an `error`
    /// event and returned to the caller; the connection stays usable.
    ///
    /// # Errors
    ///
    /// Returns the validation or persistence error that was reported.
    pub async fn handle_event(
        &self,
        handle: &ConnectionHandle,
        event: ClientEvent,
    ) -> Result<Handled, CoreError> {
        let result = self.dispatch(handle, event).await;

        if let Err(e) = &result {
            warn!(
                user = %handle.user_id(),
                connection = %handle.id(),
                kind = e.kind(),
                error = %e,
                "Request failed"
            );
            handle.send(ServerEvent::error(e.client_message()));
        }

        result
    }

    async fn dispatch(
        &self,
        handle: &ConnectionHandle,
        event: ClientEvent,
    ) -> Result<Handled, CoreError> {
        let handled = match event {
            ClientEvent::SendMessage(send) => Handled::Sent(
                self.relay
                    .send(handle, &send.receiver_id, &send.content)
                    .await?,
            ),
            ClientEvent::MarkRead(read) => Handled::Read(
                self.receipts
                    .mark_read(&read.message_id, &read.sender_id, handle.user_id())
                    .await?,
            ),
            ClientEvent::TypingStart(target) => {
                let counterpart = validate_receiver(&target.receiver_id)?;
                self.typing.start(handle.identity(), &counterpart);
                Handled::Typing
            }
            ClientEvent::TypingStop(target) => {
                let counterpart = validate_receiver(&target.receiver_id)?;
                self.typing.stop(handle.user_id(), &counterpart);
                Handled::Typing
            }
        };
        Ok(handled)
    }

    /// The connection registry.
    #[must_use]
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// The typing tracker.
    #[must_use]
    pub fn typing(&self) -> &TypingTracker {
        &self.typing
    }

    /// Get hub statistics.
    #[must_use]
    pub fn stats(&self) -> HubStats {
        HubStats {
            connection_count: self.registry.len(),
            typing_conversations: self.typing.active_conversations(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Outbound;
    use crate::memory::MemoryStore;
    use crate::store::{NewMessage, StoreError, User};
    use async_trait::async_trait;
    use courier_protocol::{ConversationId, MessageId, Timestamp, UserId};
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Accepts tokens of the form `token-<user id>`.
    struct PrefixTokens(Arc<MemoryStore>);

    #[async_trait]
    impl TokenValidator for PrefixTokens {
        async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
            let id = token
                .strip_prefix("token-")
                .ok_or_else(|| AuthError::InvalidToken("bad prefix".into()))?;
            let user_id =
                UserId::parse(id).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
            let user = self
                .0
                .user(&user_id)
                .ok_or_else(|| AuthError::UnknownUser(id.to_string()))?;
            Ok(Identity::new(user.id, user.username))
        }
    }

    /// A message store whose writes always fail.
    struct BrokenMessages;

    #[async_trait]
    impl MessageStore for BrokenMessages {
        async fn create(&self, _: NewMessage) -> Result<Message, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn find(&self, _: &MessageId) -> Result<Option<Message>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn mark_read(
            &self,
            _: &MessageId,
            _: Timestamp,
        ) -> Result<Option<Message>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn conversation(
            &self,
            _: &ConversationId,
            _: usize,
        ) -> Result<Vec<Message>, StoreError> {
            Ok(Vec::new())
        }

        async fn last_message(&self, _: &ConversationId) -> Result<Option<Message>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    /// A user store whose offline writes take a while.
    struct SlowOffline(Arc<MemoryStore>);

    #[async_trait]
    impl UserStore for SlowOffline {
        async fn find_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
            self.0.find_user(user_id).await
        }

        async fn list_users(&self) -> Result<Vec<User>, StoreError> {
            self.0.list_users().await
        }

        async fn set_presence(
            &self,
            user_id: &UserId,
            is_online: bool,
            last_seen: Timestamp,
        ) -> Result<(), StoreError> {
            if !is_online {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.0.set_presence(user_id, is_online, last_seen).await
        }
    }

    struct Client {
        handle: ConnectionHandle,
        rx: UnboundedReceiver<Outbound>,
    }

    impl Client {
        fn events(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(Outbound::Event(event)) = self.rx.try_recv() {
                events.push((*event).clone());
            }
            events
        }

        fn closed(&mut self) -> bool {
            while let Ok(outbound) = self.rx.try_recv() {
                if matches!(outbound, Outbound::Close { .. }) {
                    return true;
                }
            }
            false
        }
    }

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::with_users([
            User::new(user("alice"), "Alice"),
            User::new(user("bob"), "Bob"),
            User::new(user("carol"), "Carol"),
        ]))
    }

    fn hub_with(
        store: Arc<MemoryStore>,
        messages: Arc<dyn MessageStore>,
        config: HubConfig,
    ) -> Hub {
        Hub::new(
            store.clone(),
            messages,
            Arc::new(PrefixTokens(store)),
            config,
        )
    }

    fn hub(store: Arc<MemoryStore>) -> Hub {
        hub_with(store.clone(), store, HubConfig::default())
    }

    async fn connect(hub: &Hub, id: &str) -> Client {
        let token = format!("token-{id}");
        let identity = hub.authenticate(Some(token.as_str())).await.unwrap();
        let (handle, rx) = ConnectionHandle::new(identity);
        hub.connect(handle.clone()).await;
        let mut client = Client { handle, rx };
        client.events();
        client
    }

    #[tokio::test]
    async fn test_authenticate() {
        let hub = hub(store());

        let identity = hub.authenticate(Some("token-alice")).await.unwrap();
        assert_eq!(identity.username, "Alice");

        assert!(matches!(hub.authenticate(None).await, Err(AuthError::MissingToken)));
        assert!(matches!(hub.authenticate(Some("  ")).await, Err(AuthError::MissingToken)));
        assert!(matches!(
            hub.authenticate(Some("garbage")).await,
            Err(AuthError::InvalidToken(_))
        ));
        assert!(matches!(
            hub.authenticate(Some("token-mallory")).await,
            Err(AuthError::UnknownUser(_))
        ));
        assert_eq!(hub.stats().connection_count, 0);
    }

    #[tokio::test]
    async fn test_connect_announces_presence() {
        let store = store();
        let hub = hub(store.clone());
        let mut alice = connect(&hub, "alice").await;

        let bob = connect(&hub, "bob").await;
        assert!(store.user(&user("bob")).unwrap().is_online);
        assert_eq!(alice.events(), vec![ServerEvent::user_online(user("bob"))]);

        assert!(hub.disconnect(&bob.handle).await);
        assert!(!store.user(&user("bob")).unwrap().is_online);
        assert_eq!(alice.events(), vec![ServerEvent::user_offline(user("bob"))]);
    }

    #[tokio::test]
    async fn test_send_to_live_receiver() {
        let store = store();
        let hub = hub(store.clone());
        let mut alice = connect(&hub, "alice").await;
        let mut bob = connect(&hub, "bob").await;
        alice.events();

        hub.handle_event(&alice.handle, ClientEvent::send_message("bob", "hi"))
            .await
            .unwrap();

        let received = match bob.events().as_slice() {
            [ServerEvent::MessageNew(m)] => m.clone(),
            other => panic!("unexpected events for bob: {other:?}"),
        };
        let confirmed = match alice.events().as_slice() {
            [ServerEvent::MessageSent(m)] => m.clone(),
            other => panic!("unexpected events for alice: {other:?}"),
        };

        assert_eq!(received, confirmed);
        assert_eq!(received.content, "hi");
        assert!(!received.is_read);
        assert_eq!(store.message(&received.id), Some(received));
    }

    #[tokio::test]
    async fn test_mark_read_notifies_sender() {
        let store = store();
        let hub = hub(store.clone());
        let mut alice = connect(&hub, "alice").await;
        let mut bob = connect(&hub, "bob").await;
        alice.events();

        hub.handle_event(&alice.handle, ClientEvent::send_message("bob", "hi"))
            .await
            .unwrap();
        let message = match alice.events().pop() {
            Some(ServerEvent::MessageSent(m)) => m,
            other => panic!("expected message:sent, got {other:?}"),
        };
        bob.events();

        let read = ClientEvent::mark_read(message.id.as_str(), "alice");
        let handled = hub.handle_event(&bob.handle, read.clone()).await.unwrap();
        assert!(matches!(handled, Handled::Read(Some(_))));

        let stored = store.message(&message.id).unwrap();
        assert!(stored.is_read);
        let read_at = stored.read_at.unwrap();
        assert_eq!(
            alice.events(),
            vec![ServerEvent::MessageRead(ReadReceipt {
                message_id: message.id.clone(),
                read_by: user("bob"),
                read_at,
            })]
        );

        // A second request changes nothing and notifies nobody.
        let handled = hub.handle_event(&bob.handle, read).await.unwrap();
        assert_eq!(handled, Handled::Read(None));
        assert_eq!(store.message(&message.id).unwrap().read_at, Some(read_at));
        assert!(alice.events().is_empty());
        assert!(bob.events().is_empty());
    }

    #[tokio::test]
    async fn test_spoofed_read_receipt_is_silent() {
        let store = store();
        let hub = hub(store.clone());
        let mut alice = connect(&hub, "alice").await;
        let mut bob = connect(&hub, "bob").await;
        alice.events();

        hub.handle_event(&alice.handle, ClientEvent::send_message("bob", "hi"))
            .await
            .unwrap();
        let message = match alice.events().pop() {
            Some(ServerEvent::MessageSent(m)) => m,
            other => panic!("expected message:sent, got {other:?}"),
        };
        bob.events();

        hub.handle_event(&bob.handle, ClientEvent::mark_read(message.id.as_str(), "carol"))
            .await
            .unwrap();

        assert!(!store.message(&message.id).unwrap().is_read);
        assert!(alice.events().is_empty());
        assert!(bob.events().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_send_yields_one_error() {
        let store = store();
        let hub = hub(store.clone());
        let mut alice = connect(&hub, "alice").await;

        for event in [
            ClientEvent::send_message("bob", ""),
            ClientEvent::send_message("bob", "   "),
            ClientEvent::send_message("", "hi"),
        ] {
            let err = hub.handle_event(&alice.handle, event).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)));

            let events = alice.events();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].name(), "error");
        }

        assert_eq!(store.message_count(), 0);
        assert!(hub.registry().is_online(&user("alice")));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_generic_error() {
        let store = store();
        let hub = hub_with(store.clone(), Arc::new(BrokenMessages), HubConfig::default());
        let mut alice = connect(&hub, "alice").await;
        let mut bob = connect(&hub, "bob").await;
        alice.events();

        let err = hub
            .handle_event(&alice.handle, ClientEvent::send_message("bob", "hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Persistence(_)));
        assert_eq!(alice.events(), vec![ServerEvent::error("Internal server error")]);
        assert!(bob.events().is_empty());

        // The connection keeps working and still cleans up.
        hub.handle_event(&alice.handle, ClientEvent::typing_start("bob"))
            .await
            .unwrap();
        assert_eq!(bob.events(), vec![ServerEvent::typing_start(user("alice"), "Alice")]);
        assert!(hub.disconnect(&alice.handle).await);
        assert_eq!(hub.stats().typing_conversations, 0);
    }

    #[tokio::test]
    async fn test_send_to_offline_receiver() {
        let store = store();
        let hub = hub(store.clone());
        let mut alice = connect(&hub, "alice").await;

        hub.handle_event(&alice.handle, ClientEvent::send_message("bob", "later"))
            .await
            .unwrap();

        let message = match alice.events().as_slice() {
            [ServerEvent::MessageSent(m)] => m.clone(),
            other => panic!("unexpected events for alice: {other:?}"),
        };
        assert!(!store.message(&message.id).unwrap().is_read);

        // Bob sees nothing pushed when he connects later.
        let mut bob = connect(&hub, "bob").await;
        assert!(bob.events().is_empty());
    }

    #[tokio::test]
    async fn test_typing_then_disconnect() {
        let hub = hub(store());
        let alice = connect(&hub, "alice").await;
        let mut bob = connect(&hub, "bob").await;

        hub.handle_event(&alice.handle, ClientEvent::typing_start("bob"))
            .await
            .unwrap();
        assert_eq!(bob.events(), vec![ServerEvent::typing_start(user("alice"), "Alice")]);
        assert!(hub.typing().is_typing(&user("alice"), &user("bob")));

        hub.disconnect(&alice.handle).await;

        assert!(!hub.typing().is_typing(&user("alice"), &user("bob")));
        assert_eq!(
            bob.events(),
            vec![
                ServerEvent::typing_stop(user("alice")),
                ServerEvent::user_offline(user("alice")),
            ]
        );
    }

    #[tokio::test]
    async fn test_typing_disconnect_without_stop_signal() {
        let config = HubConfig {
            typing_stop_on_disconnect: false,
            ..HubConfig::default()
        };
        let store = store();
        let hub = hub_with(store.clone(), store, config);
        let alice = connect(&hub, "alice").await;
        let mut bob = connect(&hub, "bob").await;

        hub.handle_event(&alice.handle, ClientEvent::typing_start("bob"))
            .await
            .unwrap();
        bob.events();
        hub.disconnect(&alice.handle).await;

        assert_eq!(hub.stats().typing_conversations, 0);
        assert_eq!(bob.events(), vec![ServerEvent::user_offline(user("alice"))]);
    }

    #[tokio::test]
    async fn test_typing_requires_receiver() {
        let hub = hub(store());
        let mut alice = connect(&hub, "alice").await;

        let err = hub
            .handle_event(&alice.handle, ClientEvent::typing_stop(""))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(alice.events().len(), 1);
    }

    #[tokio::test]
    async fn test_rapid_reconnect_supersedes() {
        let store = store();
        let hub = hub(store.clone());
        let mut bob = connect(&hub, "bob").await;
        let mut first = connect(&hub, "alice").await;
        let mut second = connect(&hub, "alice").await;

        let current = hub.registry().lookup(&user("alice")).unwrap();
        assert!(current.same_connection(&second.handle));
        assert!(first.closed());

        hub.handle_event(&bob.handle, ClientEvent::send_message("alice", "which one?"))
            .await
            .unwrap();
        assert!(first.events().is_empty());
        assert!(matches!(
            second.events().as_slice(),
            [ServerEvent::MessageNew(m)] if m.content == "which one?"
        ));
        bob.events();

        // The stale disconnect neither unregisters nor announces offline.
        assert!(!hub.disconnect(&first.handle).await);
        assert!(hub.registry().is_online(&user("alice")));
        assert!(store.user(&user("alice")).unwrap().is_online);
        assert!(bob.events().is_empty());
    }

    #[tokio::test]
    async fn test_supersede_without_closing() {
        let config = HubConfig {
            close_superseded: false,
            ..HubConfig::default()
        };
        let store = store();
        let hub = hub_with(store.clone(), store, config);
        let mut first = connect(&hub, "alice").await;
        let _second = connect(&hub, "alice").await;

        assert!(!first.closed());
        assert_eq!(hub.stats().connection_count, 1);
    }

    #[tokio::test]
    async fn test_supersede_clears_stale_typing() {
        let hub = hub(store());
        let mut bob = connect(&hub, "bob").await;
        let first = connect(&hub, "alice").await;

        hub.handle_event(&first.handle, ClientEvent::typing_start("bob"))
            .await
            .unwrap();
        bob.events();

        let _second = connect(&hub, "alice").await;

        assert!(!hub.typing().is_typing(&user("alice"), &user("bob")));
        assert_eq!(
            bob.events(),
            vec![
                ServerEvent::typing_stop(user("alice")),
                ServerEvent::user_online(user("alice")),
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reconnect_during_disconnect_stays_online() {
        let store = store();
        let hub = Arc::new(Hub::new(
            Arc::new(SlowOffline(store.clone())),
            store.clone(),
            Arc::new(PrefixTokens(store.clone())),
            HubConfig::default(),
        ));
        let mut bob = connect(&hub, "bob").await;
        let first = connect(&hub, "alice").await;
        bob.events();

        let leaving = {
            let hub = Arc::clone(&hub);
            let handle = first.handle.clone();
            tokio::spawn(async move { hub.disconnect(&handle).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let second = connect(&hub, "alice").await;
        hub.handle_event(&second.handle, ClientEvent::typing_start("bob"))
            .await
            .unwrap();
        assert!(leaving.await.unwrap());

        assert!(hub.registry().is_online(&user("alice")));
        assert!(store.user(&user("alice")).unwrap().is_online);
        assert!(hub.typing().is_typing(&user("alice"), &user("bob")));
        assert_eq!(
            bob.events(),
            vec![
                ServerEvent::user_offline(user("alice")),
                ServerEvent::user_online(user("alice")),
                ServerEvent::typing_start(user("alice"), "Alice"),
            ]
        );
    }

    #[tokio::test]
    async fn test_roster() {
        let store = store();
        let hub = hub(store.clone());
        let alice = connect(&hub, "alice").await;

        hub.handle_event(&alice.handle, ClientEvent::send_message("carol", "hello"))
            .await
            .unwrap();

        let roster = hub.roster(&user("alice")).await.unwrap();
        let ids: Vec<&str> = roster.iter().map(|e| e.user.id.as_str()).collect();
        assert_eq!(ids, ["bob", "carol"]);
        assert!(roster[0].last_message.is_none());
        assert_eq!(roster[1].last_message.as_ref().unwrap().content, "hello");

        // Presence missed while offline is visible in the roster.
        let bob_view = hub.roster(&user("bob")).await.unwrap();
        assert!(bob_view[0].user.is_online);
    }
}
