//! HS256 bearer token verification.

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{Authenticator, AuthenticatorError};
use crate::domain::user::UserId;

/// Claims carried by the login service's tokens. Only the durable user id
/// and the expiry matter here; any extra fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Durable user identifier.
    pub user_id: i64,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// Authenticator that verifies HS256 tokens against a shared secret.
#[derive(Clone)]
pub struct JwtAuthenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Build an authenticator from the shared signing secret.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthenticatorError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|err| AuthenticatorError::invalid_token(err.to_string()))?;

        UserId::new(data.claims.user_id)
            .map_err(|err| AuthenticatorError::invalid_token(err.to_string()))
    }
}
