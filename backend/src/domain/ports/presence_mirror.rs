//! Driven port for the user presence mirror.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::user::{Presence, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by presence mirror adapters.
    pub enum PresenceMirrorError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "presence mirror connection failed: {message}",
        /// Query or repair write failed.
        Query { message: String } =>
            "presence mirror query failed: {message}",
        /// No user row exists for the given identifier.
        UserNotFound { user_id: UserId } =>
            "user {user_id} does not exist",
    }
}

/// Port that resolves a user's presence against the table rows.
///
/// The user row only mirrors occupancy; table rows are authoritative. An
/// implementation must repair a stale mirror (pointer to a missing, terminal,
/// or expired table) before answering, so callers never observe a pointer
/// the tables no longer back.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PresenceMirror: Send + Sync {
    /// Resolve (repairing if stale) the presence of `user`.
    async fn resolve(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Presence, PresenceMirrorError>;
}
