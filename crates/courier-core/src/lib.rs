//! # courier-core
//!
//! Stateful services behind the Courier direct messaging server.
//!
//! - **Registry** - One live connection per user
//! - **Typing** - Per-conversation typing indicators
//! - **Presence** - Online/offline broadcasts
//! - **Relay** - Persist-then-deliver message routing
//! - **Receipts** - Authorized read transitions
//! - **Roster** - Other users with presence and last message
//!
//! Persistence is reached through the [`UserStore`] and [`MessageStore`]
//! traits; [`MemoryStore`] implements both for tests and single-process
//! deployments.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Connection │────▶│     Hub     │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                            │                   ▲
//!          ┌─────────┬───────┴──┬──────────┐     │
//!          ▼         ▼          ▼          ▼     │
//!     ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐│
//!     │ Typing │ │Presence│ │ Relay  │ │Receipts├┘
//!     └────────┘ └────────┘ └────────┘ └────────┘
//!                     │          │          │
//!                     ▼          ▼          ▼
//!                  ┌──────────────────────────┐
//!                  │  UserStore / MessageStore│
//!                  └──────────────────────────┘
//! ```

pub mod auth;
pub mod connection;
pub mod error;
pub mod hub;
pub mod memory;
pub mod presence;
pub mod receipts;
pub mod registry;
pub mod relay;
pub mod roster;
pub mod store;
pub mod typing;

pub use auth::{AuthError, TokenValidator};
pub use connection::{ConnectionHandle, ConnectionId, Identity, Outbound, CLOSE_SUPERSEDED};
pub use error::{CoreError, ValidationError};
pub use hub::{Handled, Hub, HubConfig, HubStats};
pub use memory::MemoryStore;
pub use presence::PresenceBroadcaster;
pub use receipts::ReadReceipts;
pub use registry::ConnectionRegistry;
pub use relay::{validate_receiver, MessageRelay, DEFAULT_MAX_CONTENT_LENGTH};
pub use roster::{LastMessage, RosterEntry};
pub use store::{MessageStore, NewMessage, StoreError, User, UserStore};
pub use typing::TypingTracker;
