//! Table entity and the membership state machine.
//!
//! A table is a capacity-limited reservable session. The transitions here are
//! pure: they take the current occupancy and produce the occupancy to
//! persist, leaving locking, persistence, and presence updates to the store
//! adapter. This keeps the state machine testable without a database and
//! guarantees the adapter applies exactly one well-defined transition per
//! unit of work.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::user::UserId;

/// Store-assigned numeric table identifier.
pub type TableId = i64;

/// Number of seats at a table.
pub const TABLE_CAPACITY: usize = 4;

/// Lifecycle status of a table.
///
/// `Finished` is reached by post-match logic outside this crate; the
/// occupancy manager only ever moves tables between `Waiting`, `Matched`,
/// and `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    /// Open for joins.
    Waiting,
    /// Filled to capacity and handed off to session creation.
    Matched,
    /// Played out; terminal.
    Finished,
    /// Expired or abandoned; terminal.
    Cancelled,
}

impl TableStatus {
    /// Persisted smallint code for this status.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Waiting => 0,
            Self::Matched => 1,
            Self::Finished => 2,
            Self::Cancelled => 3,
        }
    }

    /// Decode a persisted smallint code.
    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Waiting),
            1 => Some(Self::Matched),
            2 => Some(Self::Finished),
            3 => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Whether the table can still change occupancy.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled)
    }
}

/// Opaque session configuration captured at creation and passed through
/// unmodified by the occupancy manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Fee arrangement code.
    pub fee_mode: i16,
    /// Scoring tier code.
    pub scoring_tier: i16,
    /// Free-form notes from the host.
    pub notes: String,
    /// Venue the session takes place at.
    pub venue_id: i64,
    /// Session type code.
    pub session_kind: i16,
    /// Gender preference code.
    pub gender_pref: i16,
    /// Planned duration code.
    pub duration: i16,
    /// Planned start time.
    pub start_time: DateTime<Utc>,
}

/// The mutable occupancy slice of a table row: roster, host, and status.
///
/// This is what the store adapter reads under a row lock and what the
/// transitions below rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupancy {
    /// Current host; an element of `participants` on every live table.
    pub host_id: UserId,
    /// Ordered roster of unique occupant ids.
    pub participants: Vec<UserId>,
    /// Current lifecycle status.
    pub status: TableStatus,
}

/// Rejections produced by [`Occupancy::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitRejection {
    /// The user already occupies this table.
    AlreadyMember,
    /// The roster is at capacity.
    Full,
}

/// Rejection produced by [`Occupancy::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseRejection {
    /// The user does not occupy this table.
    NotMember,
}

/// Result of a successful [`Occupancy::admit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    /// Roster to persist, with the new occupant appended.
    pub participants: Vec<UserId>,
    /// Set when the admission filled the table: the WAITING → MATCHED
    /// transition must fire in the same unit of work.
    pub matched: bool,
}

/// Result of a successful [`Occupancy::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// Roster to persist, with the occupant removed.
    pub participants: Vec<UserId>,
    /// Host after succession. When the roster empties, the departing user is
    /// retained as host so the column stays populated on the terminal row.
    pub host_id: UserId,
    /// Status to persist: `Cancelled` when the roster emptied, otherwise
    /// unchanged.
    pub status: TableStatus,
}

impl Occupancy {
    /// Admit `user` to the roster.
    ///
    /// Fails with [`AdmitRejection::AlreadyMember`] when the user is already
    /// seated and with [`AdmitRejection::Full`] at capacity, so retrying a
    /// join is idempotent and never duplicates an entry. When the admission
    /// reaches `capacity` the result carries `matched = true` and the caller
    /// must complete the match transition atomically.
    pub fn admit(&self, user: UserId, capacity: usize) -> Result<Admission, AdmitRejection> {
        if self.participants.contains(&user) {
            return Err(AdmitRejection::AlreadyMember);
        }
        if self.participants.len() >= capacity {
            return Err(AdmitRejection::Full);
        }

        let mut participants = self.participants.clone();
        participants.push(user);
        let matched = participants.len() == capacity;
        Ok(Admission {
            participants,
            matched,
        })
    }

    /// Remove `user` from the roster.
    ///
    /// When the departing user hosted the table, the host passes to the first
    /// remaining participant in roster order. When the roster empties the
    /// table is cancelled and the departing user stays recorded as host of
    /// the terminal row.
    pub fn release(&self, user: UserId) -> Result<Departure, ReleaseRejection> {
        let Some(index) = self.participants.iter().position(|&p| p == user) else {
            return Err(ReleaseRejection::NotMember);
        };

        let mut participants = self.participants.clone();
        participants.remove(index);

        let host_id = if self.host_id == user {
            participants.first().copied().unwrap_or(user)
        } else {
            self.host_id
        };

        let status = if participants.is_empty() {
            TableStatus::Cancelled
        } else {
            self.status
        };

        Ok(Departure {
            participants,
            host_id,
            status,
        })
    }
}

/// Whether a WAITING table has outlived its reservation window.
///
/// A table expires when its planned start time has passed or when its age
/// exceeds `ttl`. The sweeper and the presence mirror share this rule.
#[must_use]
pub fn is_expired(
    created_at: DateTime<Utc>,
    start_time: DateTime<Utc>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> bool {
    start_time < now || now - created_at > ttl
}
