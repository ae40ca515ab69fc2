//! Driven port for the transactional table store.
//!
//! Each method is one atomic unit of work: the adapter locks the table row
//! exclusively (`SELECT ... FOR UPDATE`), applies exactly one state-machine
//! transition from [`crate::domain::table`], updates the presence rows of the
//! affected users, and commits, or rolls the whole thing back. Membership
//! rejections surface as distinct error variants so the service can classify
//! them without inspecting messages.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::table::{TableConfig, TableId, TableStatus};
use crate::domain::user::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by table store adapters.
    pub enum TableStoreError {
        /// Store connection could not be established; nothing was committed.
        Connection { message: String } =>
            "table store connection failed: {message}",
        /// Query or mutation failed mid-flight; the unit of work rolled back.
        Query { message: String } =>
            "table store query failed: {message}",
        /// The referenced table does not exist.
        TableNotFound { table_id: TableId } =>
            "table {table_id} does not exist",
        /// The user already occupies the table they tried to join.
        AlreadyMember { table_id: TableId } =>
            "already seated at table {table_id}",
        /// The table is at capacity.
        TableFull { table_id: TableId } =>
            "table {table_id} is already at capacity",
        /// The user does not occupy the table they tried to leave.
        NotMember { table_id: TableId } =>
            "not seated at table {table_id}",
    }
}

/// Outcome of a committed join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinCommit {
    /// Roster size after the join.
    pub seated: usize,
    /// Present when this join filled the table. The match transition
    /// (status, `matched_at`, game sessions, presence resets) has already
    /// been committed; the caller owes only the notification fan-out.
    pub match_fanout: Option<MatchFanout>,
}

/// Participants to notify after a committed match transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFanout {
    /// The table that filled.
    pub table_id: TableId,
    /// Every occupant at the moment the table filled, in roster order.
    pub participants: Vec<UserId>,
    /// When the transition was stamped.
    pub matched_at: DateTime<Utc>,
    /// The session's planned start, forwarded into notifications.
    pub start_time: DateTime<Utc>,
}

/// Outcome of a committed leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveCommit {
    /// Roster after the departure.
    pub remaining: Vec<UserId>,
    /// Host after succession.
    pub host_id: UserId,
    /// Status after the departure.
    pub status: TableStatus,
}

/// Outcome of a sweep pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// WAITING tables force-cancelled by this pass.
    pub cancelled_tables: usize,
    /// Occupants released back to idle.
    pub released_users: usize,
}

/// A WAITING table as returned by the listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTable {
    /// Table identifier.
    pub id: TableId,
    /// Current host.
    pub host_id: UserId,
    /// Decoded roster in seating order.
    pub participants: Vec<UserId>,
    /// Pass-through session configuration.
    pub config: TableConfig,
    /// Creation timestamp (listing is ordered newest first on this).
    pub created_at: DateTime<Utc>,
}

/// Port for all table mutations and occupancy reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Insert a new WAITING table hosted (and solely occupied) by `host`.
    ///
    /// The host is released from `from` when given, otherwise from whatever
    /// their user row points at, inside the same unit of work; a stale
    /// origin (missing or terminal table) is simply cleared.
    async fn create_table(
        &self,
        host: UserId,
        config: TableConfig,
        from: Option<TableId>,
        now: DateTime<Utc>,
    ) -> Result<TableId, TableStoreError>;

    /// Seat `user` at `table_id`, vacating their current table first. The
    /// table to vacate is `from` when the caller names one, falling back to
    /// the user's presence pointer.
    ///
    /// The vacate and the join commit or roll back together: a rejected join
    /// leaves the user seated where they were. A join that fills the table
    /// also commits the match transition atomically.
    async fn join_table(
        &self,
        user: UserId,
        table_id: TableId,
        from: Option<TableId>,
        now: DateTime<Utc>,
    ) -> Result<JoinCommit, TableStoreError>;

    /// Remove `user` from `table_id`, running host succession and emptying
    /// into CANCELLED as needed. Roster, host, and status are always
    /// persisted on success.
    async fn leave_table(
        &self,
        user: UserId,
        table_id: TableId,
    ) -> Result<LeaveCommit, TableStoreError>;

    /// Force-cancel every WAITING table whose start time has passed or whose
    /// age exceeds `ttl`, releasing all occupants back to idle.
    async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<SweepReport, TableStoreError>;

    /// List WAITING tables inside the TTL window whose start time is still
    /// ahead, newest created first.
    async fn list_open(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Vec<OpenTable>, TableStoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_variants_carry_the_table_id() {
        let err = TableStoreError::table_full(42_i64);
        assert_eq!(err.to_string(), "table 42 is already at capacity");

        let err = TableStoreError::not_member(7_i64);
        assert!(matches!(err, TableStoreError::NotMember { table_id: 7 }));
    }
}
