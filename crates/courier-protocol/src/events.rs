//! Event catalog for the Courier protocol.
//!
//! Every event travels as `{"event": "<name>", "data": {...}}`. Client
//! payload fields default to empty strings when missing, and a missing or
//! null `data` counts as an empty payload, so an incomplete request reaches
//! validation instead of failing to decode.

use crate::ids::{MessageId, UserId};
use crate::message::{Message, Timestamp};
use serde::{Deserialize, Serialize};

/// Events sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", try_from = "RawClientEvent")]
pub enum ClientEvent {
    /// Send a direct message.
    #[serde(rename = "message:send")]
    SendMessage(SendMessage),

    /// Acknowledge that a received message was read.
    #[serde(rename = "message:read")]
    MarkRead(MarkRead),

    /// Started composing a message to a user.
    #[serde(rename = "typing:start")]
    TypingStart(TypingTarget),

    /// Stopped composing a message to a user.
    #[serde(rename = "typing:stop")]
    TypingStop(TypingTarget),
}

impl ClientEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::SendMessage(_) => "message:send",
            ClientEvent::MarkRead(_) => "message:read",
            ClientEvent::TypingStart(_) => "typing:start",
            ClientEvent::TypingStop(_) => "typing:stop",
        }
    }

    /// Create a `message:send` event.
    #[must_use]
    pub fn send_message(receiver_id: impl Into<String>, content: impl Into<String>) -> Self {
        ClientEvent::SendMessage(SendMessage {
            receiver_id: receiver_id.into(),
            content: content.into(),
        })
    }

    /// Create a `message:read` event.
    #[must_use]
    pub fn mark_read(message_id: impl Into<String>, sender_id: impl Into<String>) -> Self {
        ClientEvent::MarkRead(MarkRead {
            message_id: message_id.into(),
            sender_id: sender_id.into(),
        })
    }

    /// Create a `typing:start` event.
    #[must_use]
    pub fn typing_start(receiver_id: impl Into<String>) -> Self {
        ClientEvent::TypingStart(TypingTarget {
            receiver_id: receiver_id.into(),
        })
    }

    /// Create a `typing:stop` event.
    #[must_use]
    pub fn typing_stop(receiver_id: impl Into<String>) -> Self {
        ClientEvent::TypingStop(TypingTarget {
            receiver_id: receiver_id.into(),
        })
    }
}

/// A client event as it appears on the wire, before its name is checked.
#[derive(Deserialize)]
struct RawClientEvent {
    event: String,
    #[serde(default)]
    data: Option<RawPayload>,
}

/// Union of every client payload field.
#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPayload {
    receiver_id: String,
    content: String,
    message_id: String,
    sender_id: String,
}

impl TryFrom<RawClientEvent> for ClientEvent {
    type Error = String;

    fn try_from(raw: RawClientEvent) -> Result<Self, Self::Error> {
        let data = raw.data.unwrap_or_default();
        let event = match raw.event.as_str() {
            "message:send" => ClientEvent::send_message(data.receiver_id, data.content),
            "message:read" => ClientEvent::mark_read(data.message_id, data.sender_id),
            "typing:start" => ClientEvent::typing_start(data.receiver_id),
            "typing:stop" => ClientEvent::typing_stop(data.receiver_id),
            other => return Err(format!("unknown client event `{other}`")),
        };
        Ok(event)
    }
}

/// Payload of `message:send`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendMessage {
    pub receiver_id: String,
    pub content: String,
}

/// Payload of the `message:read` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkRead {
    pub message_id: String,
    /// The sender the reader believes wrote the message.
    pub sender_id: String,
}

/// Payload of the `typing:start` and `typing:stop` requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TypingTarget {
    pub receiver_id: String,
}

/// Events sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// First event on a freshly registered connection.
    #[serde(rename = "session:ready")]
    SessionReady(SessionReady),

    /// A message addressed to this user.
    #[serde(rename = "message:new")]
    MessageNew(Message),

    /// The persisted copy of a message this user sent.
    #[serde(rename = "message:sent")]
    MessageSent(Message),

    /// A message this user sent was read.
    #[serde(rename = "message:read")]
    MessageRead(ReadReceipt),

    /// The counterpart started typing.
    #[serde(rename = "typing:start")]
    TypingStart(TypingStarted),

    /// The counterpart stopped typing.
    #[serde(rename = "typing:stop")]
    TypingStop(TypingStopped),

    /// A user came online.
    #[serde(rename = "user:online")]
    UserOnline(PresenceChange),

    /// A user went offline.
    #[serde(rename = "user:offline")]
    UserOffline(PresenceChange),

    /// A request from this connection failed.
    #[serde(rename = "error")]
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Wire name of the event.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SessionReady(_) => "session:ready",
            ServerEvent::MessageNew(_) => "message:new",
            ServerEvent::MessageSent(_) => "message:sent",
            ServerEvent::MessageRead(_) => "message:read",
            ServerEvent::TypingStart(_) => "typing:start",
            ServerEvent::TypingStop(_) => "typing:stop",
            ServerEvent::UserOnline(_) => "user:online",
            ServerEvent::UserOffline(_) => "user:offline",
            ServerEvent::Error(_) => "error",
        }
    }

    /// Create a `user:online` event.
    #[must_use]
    pub fn user_online(user_id: UserId) -> Self {
        ServerEvent::UserOnline(PresenceChange { user_id })
    }

    /// Create a `user:offline` event.
    #[must_use]
    pub fn user_offline(user_id: UserId) -> Self {
        ServerEvent::UserOffline(PresenceChange { user_id })
    }

    /// Create a `typing:start` notification.
    #[must_use]
    pub fn typing_start(user_id: UserId, username: impl Into<String>) -> Self {
        ServerEvent::TypingStart(TypingStarted {
            user_id,
            username: username.into(),
        })
    }

    /// Create a `typing:stop` notification.
    #[must_use]
    pub fn typing_stop(user_id: UserId) -> Self {
        ServerEvent::TypingStop(TypingStopped { user_id })
    }

    /// Create an `error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ErrorPayload {
            message: message.into(),
        })
    }
}

/// Payload of `session:ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReady {
    pub user_id: UserId,
    pub username: String,
    pub connection_id: String,
    /// Interval at which the server pings, in milliseconds.
    pub heartbeat_ms: u64,
}

/// Payload of the `message:read` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub message_id: MessageId,
    pub read_by: UserId,
    pub read_at: Timestamp,
}

/// Payload of the `typing:start` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStarted {
    pub user_id: UserId,
    pub username: String,
}

/// Payload of the `typing:stop` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingStopped {
    pub user_id: UserId,
}

/// Payload of `user:online` and `user:offline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceChange {
    pub user_id: UserId,
}

/// Payload of `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}
