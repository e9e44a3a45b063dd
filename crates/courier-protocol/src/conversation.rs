//! Canonical conversation identifiers.
//!
//! A conversation between two users is never stored as an entity of its own.
//! Its identifier is derived from the two participant identities: they are
//! sorted lexicographically and joined with [`SEPARATOR`], so both sides of a
//! conversation always compute the same identifier.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator between the two participant identities.
pub const SEPARATOR: char = '_';

/// Conversation identifier errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    /// The identifier does not split into two non-empty participants.
    #[error("Malformed conversation identifier: {0}")]
    MalformedIdentifier(String),
}

/// An order-independent identifier for a pair of users.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the identifier of the conversation between `a` and `b`.
    ///
    /// `derive(a, b) == derive(b, a)` for every pair.
    #[must_use]
    pub fn derive(a: &UserId, b: &UserId) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{low}{SEPARATOR}{high}"))
    }

    /// Split an identifier back into its two participants, in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`ConversationError::MalformedIdentifier`] if the separator is
    /// absent or either side is empty or invalid.
    pub fn parse(id: &str) -> Result<(UserId, UserId), ConversationError> {
        let malformed = || ConversationError::MalformedIdentifier(id.to_string());

        let (first, second) = id.split_once(SEPARATOR).ok_or_else(malformed)?;
        let first = UserId::parse(first).map_err(|_| malformed())?;
        let second = UserId::parse(second).map_err(|_| malformed())?;

        if first <= second {
            Ok((first, second))
        } else {
            Ok((second, first))
        }
    }

    /// Get the participants of this conversation.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier was not produced by [`derive`](Self::derive).
    pub fn participants(&self) -> Result<(UserId, UserId), ConversationError> {
        Self::parse(&self.0)
    }

    /// Whether `user` is one of the two participants.
    ///
    /// This is the check a history reader performs before returning messages.
    #[must_use]
    pub fn includes(&self, user: &UserId) -> bool {
        self.participants()
            .map(|(a, b)| &a == user || &b == user)
            .unwrap_or(false)
    }

    /// The participant on the other side of `user`, if `user` takes part.
    #[must_use]
    pub fn counterpart(&self, user: &UserId) -> Option<UserId> {
        let (a, b) = self.participants().ok()?;
        if &a == user {
            Some(b)
        } else if &b == user {
            Some(a)
        } else {
            None
        }
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
