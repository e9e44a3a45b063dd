//! Core error types.

use crate::store::StoreError;
use courier_protocol::IdentityError;
use thiserror::Error;

/// A request was missing a required field or carried an invalid one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// No receiver was given.
    #[error("Receiver ID is required")]
    MissingReceiver,

    /// The receiver is not a valid user identity.
    #[error("Invalid receiver ID: {0}")]
    InvalidReceiver(IdentityError),

    /// The content is empty after trimming.
    #[error("Message content is required")]
    EmptyContent,

    /// The content exceeds the configured limit.
    #[error("Message content exceeds {max} characters")]
    ContentTooLong { max: usize },
}

/// Errors surfaced by core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invalid request, reported to the originating connection.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed; reported as a generic error.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl CoreError {
    /// The message sent to the client in an `error` event.
    ///
    /// Store details stay server-side.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            CoreError::Validation(e) => e.to_string(),
            CoreError::Persistence(_) => "Internal server error".to_string(),
        }
    }

    /// Short label for logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Persistence(_) => "persistence",
        }
    }
}
