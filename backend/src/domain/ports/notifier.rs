//! Driven port for delivering match notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::table::TableId;
use crate::domain::user::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by notifier adapters.
    pub enum NotifierError {
        /// Credentials for the messaging channel could not be obtained.
        Credentials { message: String } =>
            "notifier credential refresh failed: {message}",
        /// Delivery to the messaging channel failed.
        Delivery { message: String } =>
            "notification delivery failed: {message}",
    }
}

/// What a participant is told when their table fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchNotice {
    /// The table that filled.
    pub table_id: TableId,
    /// When the match was stamped.
    pub matched_at: DateTime<Utc>,
    /// Planned start of the session.
    pub start_time: DateTime<Utc>,
}

/// Port for best-effort, post-commit match notifications.
///
/// Delivery failures must never unwind a committed transition; callers log
/// and move on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notify one participant that their table matched.
    async fn notify(&self, user: UserId, notice: MatchNotice) -> Result<(), NotifierError>;
}
