//! Connection handshake authentication.

use crate::connection::Identity;
use crate::store::StoreError;
use async_trait::async_trait;
use thiserror::Error;

/// Authentication errors. Any of them refuses the connection.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No token was presented.
    #[error("Missing authentication token")]
    MissingToken,

    /// The token failed validation.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The token names a user the store does not know.
    #[error("User not found: {0}")]
    UnknownUser(String),

    /// The user store could not be queried.
    #[error("User lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Resolves a bearer token to the identity it was issued for.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Validate a token.
    async fn validate(&self, token: &str) -> Result<Identity, AuthError>;
}
