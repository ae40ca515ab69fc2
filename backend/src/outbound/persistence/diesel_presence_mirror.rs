//! PostgreSQL-backed `PresenceMirror` implementation.
//!
//! The user row only mirrors occupancy, so this adapter re-checks the pointer
//! against the authoritative table row and repairs the mirror before
//! answering. Repairs are idempotent single-row updates; no transaction is
//! needed because a racing occupancy change simply wins.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{PresenceMirror, PresenceMirrorError};
use crate::domain::table::TableStatus;
use crate::domain::user::{Presence, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::UserPresenceRow;
use super::pool::{DbPool, PoolError};
use super::schema::{tables, users};

/// Diesel-backed implementation of the presence mirror port.
#[derive(Clone)]
pub struct DieselPresenceMirror {
    pool: DbPool,
}

impl DieselPresenceMirror {
    /// Create a new mirror with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> PresenceMirrorError {
    map_pool_error(error, PresenceMirrorError::connection)
}

fn diesel_error(error: diesel::result::Error) -> PresenceMirrorError {
    map_diesel_error(
        error,
        PresenceMirrorError::query,
        PresenceMirrorError::connection,
    )
}

/// The slice of a table row the liveness check needs.
#[derive(Debug, Clone, Copy, Queryable)]
struct TableLiveness {
    status: i16,
    created_at: DateTime<Utc>,
}

/// Whether the pointed-at table still backs an in-room presence.
fn backs_presence(liveness: Option<TableLiveness>, now: DateTime<Utc>, ttl: Duration) -> bool {
    liveness.is_some_and(|table| {
        let terminal = TableStatus::from_code(table.status).is_none_or(TableStatus::is_terminal);
        !terminal && now - table.created_at <= ttl
    })
}

/// What the user row says about their presence, before any table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MirrorState {
    /// Idle status with no pointer; nothing to repair.
    Idle,
    /// Internally inconsistent row: an idle status alongside a pointer, or
    /// a seated status without one. Repaired to idle without consulting the
    /// table; the status field is authoritative when it says idle.
    Drifted,
    /// Seated with a pointer; the pointed-at table decides.
    Pointing { table_id: i64 },
}

fn classify(row: &UserPresenceRow) -> MirrorState {
    match (row.status, row.current_table_id) {
        (0, None) => MirrorState::Idle,
        (0, Some(_)) | (_, None) => MirrorState::Drifted,
        (_, Some(table_id)) => MirrorState::Pointing { table_id },
    }
}

async fn clear_mirror(
    conn: &mut AsyncPgConnection,
    user: UserId,
) -> Result<(), diesel::result::Error> {
    diesel::update(users::table.filter(users::user_id.eq(user.get())))
        .set((
            users::status.eq(0_i16),
            users::current_table_id.eq(None::<i64>),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl PresenceMirror for DieselPresenceMirror {
    async fn resolve(
        &self,
        user: UserId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Presence, PresenceMirrorError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;

        let row: Option<UserPresenceRow> = users::table
            .filter(users::user_id.eq(user.get()))
            .select(UserPresenceRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;
        let Some(row) = row else {
            return Err(PresenceMirrorError::user_not_found(user));
        };

        let table_id = match classify(&row) {
            MirrorState::Idle => return Ok(Presence::Idle),
            MirrorState::Drifted => {
                debug!(user_id = %user, "repairing inconsistent presence row");
                clear_mirror(&mut conn, user).await.map_err(diesel_error)?;
                return Ok(Presence::Idle);
            }
            MirrorState::Pointing { table_id } => table_id,
        };

        let liveness: Option<TableLiveness> = tables::table
            .find(table_id)
            .select((tables::status, tables::created_at))
            .first(&mut conn)
            .await
            .optional()
            .map_err(diesel_error)?;

        if backs_presence(liveness, now, ttl) {
            Ok(Presence::InRoom { table_id })
        } else {
            debug!(user_id = %user, table_id, "repairing stale presence pointer");
            clear_mirror(&mut conn, user).await.map_err(diesel_error)?;
            Ok(Presence::Idle)
        }
    }
}
