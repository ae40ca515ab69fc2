//! Driven port for resolving bearer tokens to user identities.

use async_trait::async_trait;

use crate::domain::user::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by authenticator adapters.
    pub enum AuthenticatorError {
        /// The token is malformed, expired, or fails verification.
        InvalidToken { message: String } =>
            "token rejected: {message}",
    }
}

/// Port that turns an `Authorization: Bearer` token into a [`UserId`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify `token` and extract the caller's identity.
    async fn authenticate(&self, token: &str) -> Result<UserId, AuthenticatorError>;
}
