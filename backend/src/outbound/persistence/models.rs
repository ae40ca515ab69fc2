//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. They exist solely to satisfy Diesel's
//! type requirements for queries and mutations.

use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::schema::{game_sessions, tables, users};

/// Row struct for reading the occupancy slice of a table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tables)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct TableRow {
    pub id: i64,
    pub host_id: i64,
    pub participants: serde_json::Value,
    pub status: i16,
    pub fee_mode: i16,
    pub scoring_tier: i16,
    pub notes: String,
    pub venue_id: i64,
    pub session_kind: i16,
    pub gender_pref: i16,
    pub duration: i16,
    pub start_time: DateTime<Utc>,
    #[expect(dead_code, reason = "schema field read back only by post-match tooling")]
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Insertable struct for opening a new table.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tables)]
pub(crate) struct NewTableRow<'a> {
    pub host_id: i64,
    pub participants: &'a serde_json::Value,
    pub status: i16,
    pub fee_mode: i16,
    pub scoring_tier: i16,
    pub notes: &'a str,
    pub venue_id: i64,
    pub session_kind: i16,
    pub gender_pref: i16,
    pub duration: i16,
    pub start_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Row struct for reading the occupancy slice of a user.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserPresenceRow {
    pub user_id: i64,
    pub status: i16,
    pub current_table_id: Option<i64>,
}

/// Row struct for reading public profile fields.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserProfileRow {
    pub user_id: i64,
    pub display_name: String,
    pub avatar_ref: Option<String>,
    pub gender: i16,
    pub phone: Option<String>,
}

/// Insertable struct for recording a participant's game session.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = game_sessions)]
pub(crate) struct NewGameSessionRow {
    pub table_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}
