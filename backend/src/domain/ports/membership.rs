//! Driving ports for table membership commands and occupancy queries.
//!
//! These are the seams the HTTP layer calls through; handlers hold
//! `Arc<dyn TableCommands>` / `Arc<dyn TableQueries>` and never see the
//! stores behind them.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::error::Error;
use crate::domain::table::{TableConfig, TableId, TableStatus};
use crate::domain::user::{Presence, UserId};

/// Creation parameters as supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDraft {
    /// Planned start of the session. Must still be ahead.
    pub start_time: DateTime<Utc>,
    /// Venue the session takes place at.
    pub venue_id: i64,
    /// Fee arrangement code.
    pub fee_mode: Option<i16>,
    /// Scoring tier code.
    pub scoring_tier: Option<i16>,
    /// Free-form notes from the host.
    pub notes: Option<String>,
    /// Session type code.
    pub session_kind: Option<i16>,
    /// Gender preference code.
    pub gender_pref: Option<i16>,
    /// Planned duration code.
    pub duration: Option<i16>,
}

/// Longest notes text accepted at creation.
pub const MAX_NOTES_LEN: usize = 512;

/// Validation failures for [`TableDraft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DraftRejection {
    /// The planned start is not ahead of the current time.
    #[error("start time must be in the future")]
    StartTimeNotAhead,
    /// The venue identifier is not a positive integer.
    #[error("venue id must be a positive integer")]
    InvalidVenue,
    /// The notes text exceeds [`MAX_NOTES_LEN`] characters.
    #[error("notes must not exceed {MAX_NOTES_LEN} characters")]
    NotesTooLong,
}

impl TableDraft {
    /// Validate the draft against `now` and fill defaults for the optional
    /// pass-through codes.
    pub fn validate(self, now: DateTime<Utc>) -> Result<TableConfig, DraftRejection> {
        if self.start_time <= now {
            return Err(DraftRejection::StartTimeNotAhead);
        }
        if self.venue_id <= 0 {
            return Err(DraftRejection::InvalidVenue);
        }
        let notes = self.notes.unwrap_or_default();
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(DraftRejection::NotesTooLong);
        }
        Ok(TableConfig {
            fee_mode: self.fee_mode.unwrap_or(0),
            scoring_tier: self.scoring_tier.unwrap_or(0),
            notes,
            venue_id: self.venue_id,
            session_kind: self.session_kind.unwrap_or(0),
            gender_pref: self.gender_pref.unwrap_or(0),
            duration: self.duration.unwrap_or(0),
            start_time: self.start_time,
        })
    }
}

/// Outcome of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Roster size after the join.
    pub seated: usize,
    /// Whether this join filled the table and triggered the match.
    pub matched: bool,
}

/// Outcome of a successful leave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Roster size after the departure.
    pub remaining: usize,
    /// Host after succession.
    pub host_id: UserId,
    /// Status after the departure.
    pub status: TableStatus,
}

/// One seat of a listed table, hydrated with public profile data where the
/// profile store knows the occupant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatView {
    /// Occupant id.
    pub user_id: UserId,
    /// Display name, when a profile exists.
    pub display_name: Option<String>,
    /// Avatar reference, when a profile exists.
    pub avatar_ref: Option<String>,
    /// Declared gender code, when a profile exists.
    pub gender: Option<i16>,
    /// Whether this occupant hosts the table.
    pub is_host: bool,
    /// Whether this occupant is the authenticated caller.
    pub is_me: bool,
}

/// A listed open table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    /// Table identifier.
    pub id: TableId,
    /// Current host.
    pub host_id: UserId,
    /// Occupied seats in seating order.
    pub seats: Vec<SeatView>,
    /// Pass-through session configuration.
    pub config: TableConfig,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Whether the (authenticated) caller occupies this table.
    pub joined: bool,
}

/// Driving port for occupancy mutations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableCommands: Send + Sync {
    /// Open a new table hosted by `host`, vacating their current one first.
    /// `from` names the table the caller believes they occupy; the stored
    /// presence pointer is the fallback.
    async fn create_table(
        &self,
        host: UserId,
        draft: TableDraft,
        from: Option<TableId>,
    ) -> Result<TableId, Error>;

    /// Seat `user` at `table_id`, switching from their current table if any.
    /// `from` overrides the stored presence pointer when given.
    async fn join_table(
        &self,
        user: UserId,
        table_id: TableId,
        from: Option<TableId>,
    ) -> Result<JoinOutcome, Error>;

    /// Release `user` from `table_id`.
    async fn leave_table(&self, user: UserId, table_id: TableId) -> Result<LeaveOutcome, Error>;
}

/// Driving port for occupancy reads.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TableQueries: Send + Sync {
    /// Sweep expired tables, then list the remaining open ones. A known
    /// caller gets `joined` flags; anonymous callers get them all false.
    async fn list_tables(&self, caller: Option<UserId>) -> Result<Vec<TableSummary>, Error>;

    /// Resolve (repairing if stale) the caller's presence.
    async fn presence(&self, user: UserId) -> Result<Presence, Error>;
}

/// Table retention window shared by sweeping, listing, and presence repair.
#[must_use]
pub fn default_table_ttl() -> Duration {
    Duration::hours(2)
}
