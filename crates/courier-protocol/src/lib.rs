//! # courier-protocol
//!
//! Wire protocol definitions for the Courier direct messaging server.
//!
//! This crate defines everything that crosses the socket between Courier
//! clients and the server:
//!
//! - **Identities** - `UserId`, `MessageId` and the order-independent `ConversationId`
//! - **Message** - the persisted chat message and its unread/read state
//! - **Events** - the `ClientEvent` / `ServerEvent` catalog (`message:send`, `typing:start`, ...)
//! - **Codec** - JSON text frames and length-prefixed MessagePack binary frames
//!
//! ## Example
//!
//! ```rust
//! use courier_protocol::{codec, ClientEvent};
//!
//! let event: ClientEvent = codec::decode_json(
//!     r#"{"event":"message:send","data":{"receiverId":"bob","content":"hi"}}"#,
//! ).unwrap();
//!
//! let encoded = codec::encode_binary(&event).unwrap();
//! let decoded: ClientEvent = codec::decode_binary(&encoded).unwrap();
//! assert_eq!(event, decoded);
//! ```

pub mod codec;
pub mod conversation;
pub mod events;
pub mod ids;
pub mod message;

pub use codec::{Encoding, ProtocolError};
pub use conversation::{ConversationError, ConversationId, SEPARATOR};
pub use events::{
    ClientEvent, ErrorPayload, MarkRead, PresenceChange, ReadReceipt, SendMessage, ServerEvent,
    SessionReady, TypingStarted, TypingStopped, TypingTarget,
};
pub use ids::{IdentityError, MessageId, UserId};
pub use message::{now_millis, Message, Timestamp};
