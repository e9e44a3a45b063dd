//! Live connection handles.
//!
//! A handle is the only thing the rest of the core knows about a socket: an
//! outbound queue plus the authenticated identity attached to it. The socket
//! task owns the receiving end and writes whatever arrives to the wire.

use courier_protocol::{ServerEvent, UserId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;

/// Close code sent to a connection replaced by a newer one for the same user.
pub const CLOSE_SUPERSEDED: u16 = 4000;

/// Atomic counter keeping connection IDs unique within the same nanosecond.
static CONNECTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generate a unique connection ID.
    #[must_use]
    pub fn generate() -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let counter = CONNECTION_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("conn_{:x}_{:x}", timestamp, counter))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated user behind a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    /// Display name.
    pub username: String,
}

impl Identity {
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Instructions queued for a socket writer.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Deliver an event.
    Event(Arc<ServerEvent>),
    /// Close the socket with the given code and reason.
    Close { code: u16, reason: &'static str },
}

/// A cloneable handle to a live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    identity: Arc<Identity>,
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle and the queue its socket writer drains.
    #[must_use]
    pub fn new(identity: Identity) -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ConnectionId::generate(),
            identity: Arc::new(identity),
            tx,
        };
        (handle, rx)
    }

    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.identity.username
    }

    /// Queue an event for delivery.
    ///
    /// Returns `false` if the socket writer is gone.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.send_shared(Arc::new(event))
    }

    /// Queue an event shared with other connections.
    pub fn send_shared(&self, event: Arc<ServerEvent>) -> bool {
        self.tx.send(Outbound::Event(event)).is_ok()
    }

    /// Ask the socket writer to close the connection.
    pub fn close(&self, code: u16, reason: &'static str) -> bool {
        self.tx.send(Outbound::Close { code, reason }).is_ok()
    }

    /// Whether the socket writer has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Whether both handles refer to the same connection.
    #[must_use]
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.id == other.id
    }
}
