//! JWT token validation.

use async_trait::async_trait;
use courier_core::{AuthError, Identity, TokenValidator, UserStore};
use courier_protocol::UserId;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued for.
    #[serde(rename = "userId", alias = "sub")]
    pub user_id: String,
    /// Expiry, in seconds since the epoch.
    pub exp: u64,
}

/// Validates HS256 tokens and resolves their user in the user store.
pub struct JwtValidator {
    key: DecodingKey,
    validation: Validation,
    users: Arc<dyn UserStore>,
}

impl JwtValidator {
    #[must_use]
    pub fn new(secret: &[u8], users: Arc<dyn UserStore>) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            users,
        }
    }
}

#[async_trait]
impl TokenValidator for JwtValidator {
    async fn validate(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        let user_id = UserId::parse(claims.user_id.as_str())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let user = self
            .users
            .find_user(&user_id)
            .await?
            .ok_or_else(|| AuthError::UnknownUser(claims.user_id.clone()))?;

        debug!(user = %user.id, "Token accepted");
        Ok(Identity::new(user.id, user.username))
    }
}
