//! PostgreSQL-backed `TableStore` implementation using Diesel.
//!
//! Every port method runs as a single transaction. The table row is read
//! under `FOR UPDATE`, one pure transition from the domain is applied, and
//! the roster, the table status, and the affected presence mirrors are
//! written together. Membership rejections travel through the transaction
//! error type so they roll the unit of work back.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{
    JoinCommit, LeaveCommit, MatchFanout, OpenTable, SweepReport, TableStore, TableStoreError,
};
use crate::domain::roster;
use crate::domain::table::{
    AdmitRejection, Occupancy, ReleaseRejection, TABLE_CAPACITY, TableConfig, TableId, TableStatus,
};
use crate::domain::user::UserId;

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewGameSessionRow, NewTableRow, TableRow};
use super::pool::{DbPool, PoolError};
use super::schema::{game_sessions, tables, users};

/// Presence mirror code for an idle user.
const USER_IDLE: i16 = 0;
/// Presence mirror code for a seated user.
const USER_IN_ROOM: i16 = 1;

/// Diesel-backed implementation of the table store port.
#[derive(Clone)]
pub struct DieselTableStore {
    pool: DbPool,
}

impl DieselTableStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn pool_error(error: PoolError) -> TableStoreError {
    map_pool_error(error, TableStoreError::connection)
}

/// Error type threaded through transactions: Diesel failures and membership
/// rejections both abort the unit of work.
enum TxError {
    Diesel(diesel::result::Error),
    Rejected(TableStoreError),
}

impl From<diesel::result::Error> for TxError {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

impl From<TableStoreError> for TxError {
    fn from(error: TableStoreError) -> Self {
        Self::Rejected(error)
    }
}

fn map_tx_error(error: TxError) -> TableStoreError {
    match error {
        TxError::Diesel(err) => {
            map_diesel_error(err, TableStoreError::query, TableStoreError::connection)
        }
        TxError::Rejected(err) => err,
    }
}

/// Decode the occupancy slice of a row, failing on host or status values the
/// schema should have prevented.
fn decode_occupancy(row: &TableRow) -> Result<Occupancy, TableStoreError> {
    let host_id = UserId::new(row.host_id)
        .map_err(|err| TableStoreError::query(format!("table {}: bad host id: {err}", row.id)))?;
    let status = TableStatus::from_code(row.status).ok_or_else(|| {
        TableStoreError::query(format!(
            "table {}: unknown status code {}",
            row.id, row.status
        ))
    })?;

    Ok(Occupancy {
        host_id,
        participants: roster::decode(Some(&row.participants)),
        status,
    })
}

fn config_from_row(row: &TableRow) -> TableConfig {
    TableConfig {
        fee_mode: row.fee_mode,
        scoring_tier: row.scoring_tier,
        notes: row.notes.clone(),
        venue_id: row.venue_id,
        session_kind: row.session_kind,
        gender_pref: row.gender_pref,
        duration: row.duration,
        start_time: row.start_time,
    }
}

/// Read and lock a table row.
async fn lock_table(
    conn: &mut AsyncPgConnection,
    table_id: TableId,
) -> Result<Option<TableRow>, diesel::result::Error> {
    tables::table
        .find(table_id)
        .select(TableRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()
}

/// Read the table a user's row currently points at, if any.
async fn current_pointer(
    conn: &mut AsyncPgConnection,
    user: UserId,
) -> Result<Option<TableId>, diesel::result::Error> {
    let pointer = users::table
        .filter(users::user_id.eq(user.get()))
        .select(users::current_table_id)
        .first::<Option<i64>>(conn)
        .await
        .optional()?;
    Ok(pointer.flatten())
}

/// Persist the occupancy slice of a table row.
async fn write_occupancy(
    conn: &mut AsyncPgConnection,
    table_id: TableId,
    participants: &[UserId],
    host_id: UserId,
    status: TableStatus,
) -> Result<(), diesel::result::Error> {
    diesel::update(tables::table.find(table_id))
        .set((
            tables::participants.eq(roster::encode(participants)),
            tables::host_id.eq(host_id.get()),
            tables::status.eq(status.code()),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// Point a user's presence mirror at a table, or clear it.
async fn point_user_at(
    conn: &mut AsyncPgConnection,
    user: UserId,
    table_id: Option<TableId>,
) -> Result<(), diesel::result::Error> {
    let status = if table_id.is_some() {
        USER_IN_ROOM
    } else {
        USER_IDLE
    };
    diesel::update(users::table.filter(users::user_id.eq(user.get())))
        .set((
            users::status.eq(status),
            users::current_table_id.eq(table_id),
        ))
        .execute(conn)
        .await?;
    Ok(())
}

/// Release a user from an already locked table row.
///
/// Stale pointers are tolerated: a terminal table or a roster that does not
/// list the user means there is nothing left to undo.
async fn release_from_row(
    conn: &mut AsyncPgConnection,
    row: &TableRow,
    user: UserId,
) -> Result<(), TxError> {
    let occupancy = decode_occupancy(row)?;
    if occupancy.status.is_terminal() {
        return Ok(());
    }
    match occupancy.release(user) {
        Ok(departure) => {
            write_occupancy(
                conn,
                row.id,
                &departure.participants,
                departure.host_id,
                departure.status,
            )
            .await?;
            Ok(())
        }
        Err(ReleaseRejection::NotMember) => Ok(()),
    }
}

/// Resolve the table `user` should be released from: an explicit origin
/// named by the caller wins, the presence pointer is the fallback.
async fn origin_table(
    conn: &mut AsyncPgConnection,
    user: UserId,
    from: Option<TableId>,
) -> Result<Option<TableId>, TxError> {
    match from {
        Some(table_id) => Ok(Some(table_id)),
        None => Ok(current_pointer(conn, user).await?),
    }
}

/// Release `user` from their origin table, locking it first.
async fn vacate_origin(
    conn: &mut AsyncPgConnection,
    user: UserId,
    from: Option<TableId>,
) -> Result<(), TxError> {
    let Some(old_id) = origin_table(conn, user, from).await? else {
        return Ok(());
    };
    if let Some(row) = lock_table(conn, old_id).await? {
        release_from_row(conn, &row, user).await?;
    }
    Ok(())
}

/// Complete the WAITING to MATCHED transition for a freshly filled table:
/// stamp the status and `matched_at`, record one game session per
/// participant, and reset every participant's presence mirror.
async fn commit_match(
    conn: &mut AsyncPgConnection,
    table_id: TableId,
    participants: &[UserId],
    now: DateTime<Utc>,
) -> Result<(), diesel::result::Error> {
    diesel::update(tables::table.find(table_id))
        .set((
            tables::participants.eq(roster::encode(participants)),
            tables::status.eq(TableStatus::Matched.code()),
            tables::matched_at.eq(now),
        ))
        .execute(conn)
        .await?;

    let session_rows: Vec<NewGameSessionRow> = participants
        .iter()
        .map(|&user| NewGameSessionRow {
            table_id,
            user_id: user.get(),
            created_at: now,
        })
        .collect();
    diesel::insert_into(game_sessions::table)
        .values(&session_rows)
        .execute(conn)
        .await?;

    let ids: Vec<i64> = participants.iter().map(|user| user.get()).collect();
    diesel::update(users::table.filter(users::user_id.eq_any(ids)))
        .set((
            users::status.eq(USER_IDLE),
            users::current_table_id.eq(None::<i64>),
        ))
        .execute(conn)
        .await?;

    Ok(())
}

async fn join_txn(
    conn: &mut AsyncPgConnection,
    user: UserId,
    table_id: TableId,
    from: Option<TableId>,
    now: DateTime<Utc>,
) -> Result<JoinCommit, TxError> {
    let vacate = origin_table(conn, user, from)
        .await?
        .filter(|&id| id != table_id);

    // Lock rows in ascending id order so two concurrent switches between the
    // same pair of tables cannot deadlock.
    let (target, old) = match vacate {
        Some(old_id) if old_id < table_id => {
            let old = lock_table(conn, old_id).await?;
            (lock_table(conn, table_id).await?, old)
        }
        Some(old_id) => {
            let target = lock_table(conn, table_id).await?;
            (target, lock_table(conn, old_id).await?)
        }
        None => (lock_table(conn, table_id).await?, None),
    };

    let Some(target) = target else {
        return Err(TableStoreError::table_not_found(table_id).into());
    };

    if let Some(old_row) = old {
        release_from_row(conn, &old_row, user).await?;
    }

    let occupancy = decode_occupancy(&target)?;
    let admission = occupancy
        .admit(user, TABLE_CAPACITY)
        .map_err(|rejection| match rejection {
            AdmitRejection::AlreadyMember => TableStoreError::already_member(table_id),
            AdmitRejection::Full => TableStoreError::table_full(table_id),
        })?;
    if occupancy.status != TableStatus::Waiting {
        return Err(TableStoreError::table_not_found(table_id).into());
    }

    let match_fanout = if admission.matched {
        commit_match(conn, table_id, &admission.participants, now).await?;
        Some(MatchFanout {
            table_id,
            participants: admission.participants.clone(),
            matched_at: now,
            start_time: target.start_time,
        })
    } else {
        write_occupancy(
            conn,
            table_id,
            &admission.participants,
            occupancy.host_id,
            TableStatus::Waiting,
        )
        .await?;
        point_user_at(conn, user, Some(table_id)).await?;
        None
    };

    Ok(JoinCommit {
        seated: admission.participants.len(),
        match_fanout,
    })
}

async fn create_txn(
    conn: &mut AsyncPgConnection,
    host: UserId,
    config: &TableConfig,
    from: Option<TableId>,
    now: DateTime<Utc>,
) -> Result<TableId, TxError> {
    vacate_origin(conn, host, from).await?;

    let participants = roster::encode(&[host]);
    let new_row = NewTableRow {
        host_id: host.get(),
        participants: &participants,
        status: TableStatus::Waiting.code(),
        fee_mode: config.fee_mode,
        scoring_tier: config.scoring_tier,
        notes: &config.notes,
        venue_id: config.venue_id,
        session_kind: config.session_kind,
        gender_pref: config.gender_pref,
        duration: config.duration,
        start_time: config.start_time,
        created_at: now,
    };

    let table_id: i64 = diesel::insert_into(tables::table)
        .values(&new_row)
        .returning(tables::id)
        .get_result(conn)
        .await?;

    point_user_at(conn, host, Some(table_id)).await?;

    Ok(table_id)
}

async fn leave_txn(
    conn: &mut AsyncPgConnection,
    user: UserId,
    table_id: TableId,
) -> Result<LeaveCommit, TxError> {
    let Some(row) = lock_table(conn, table_id).await? else {
        return Err(TableStoreError::table_not_found(table_id).into());
    };

    let occupancy = decode_occupancy(&row)?;
    let departure = occupancy
        .release(user)
        .map_err(|ReleaseRejection::NotMember| TableStoreError::not_member(table_id))?;

    write_occupancy(
        conn,
        table_id,
        &departure.participants,
        departure.host_id,
        departure.status,
    )
    .await?;
    point_user_at(conn, user, None).await?;

    Ok(LeaveCommit {
        remaining: departure.participants,
        host_id: departure.host_id,
        status: departure.status,
    })
}

async fn sweep_txn(
    conn: &mut AsyncPgConnection,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<SweepReport, TxError> {
    let cutoff = now - ttl;
    let expired: Vec<TableRow> = tables::table
        .filter(tables::status.eq(TableStatus::Waiting.code()))
        .filter(tables::start_time.lt(now).or(tables::created_at.lt(cutoff)))
        .select(TableRow::as_select())
        .for_update()
        .load(conn)
        .await?;

    let mut report = SweepReport::default();
    for row in &expired {
        diesel::update(tables::table.find(row.id))
            .set(tables::status.eq(TableStatus::Cancelled.code()))
            .execute(conn)
            .await?;
        report.cancelled_tables += 1;

        let occupants: Vec<i64> = roster::decode(Some(&row.participants))
            .into_iter()
            .map(|user| user.get())
            .collect();
        if occupants.is_empty() {
            continue;
        }
        // Only release users whose mirror still points here; anyone who has
        // switched tables since keeps their new pointer.
        report.released_users += diesel::update(
            users::table
                .filter(users::user_id.eq_any(occupants))
                .filter(users::current_table_id.eq(row.id)),
        )
        .set((
            users::status.eq(USER_IDLE),
            users::current_table_id.eq(None::<i64>),
        ))
        .execute(conn)
        .await?;
    }

    Ok(report)
}

#[async_trait]
impl TableStore for DieselTableStore {
    async fn create_table(
        &self,
        host: UserId,
        config: TableConfig,
        from: Option<TableId>,
        now: DateTime<Utc>,
    ) -> Result<TableId, TableStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| create_txn(conn, host, &config, from, now).scope_boxed())
            .await
            .map_err(map_tx_error)
    }

    async fn join_table(
        &self,
        user: UserId,
        table_id: TableId,
        from: Option<TableId>,
        now: DateTime<Utc>,
    ) -> Result<JoinCommit, TableStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| join_txn(conn, user, table_id, from, now).scope_boxed())
            .await
            .map_err(map_tx_error)
    }

    async fn leave_table(
        &self,
        user: UserId,
        table_id: TableId,
    ) -> Result<LeaveCommit, TableStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| leave_txn(conn, user, table_id).scope_boxed())
            .await
            .map_err(map_tx_error)
    }

    async fn sweep_expired(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<SweepReport, TableStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        conn.transaction(|conn| sweep_txn(conn, now, ttl).scope_boxed())
            .await
            .map_err(map_tx_error)
    }

    async fn list_open(
        &self,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Vec<OpenTable>, TableStoreError> {
        let mut conn = self.pool.get().await.map_err(pool_error)?;
        let cutoff = now - ttl;

        let rows: Vec<TableRow> = tables::table
            .filter(tables::status.eq(TableStatus::Waiting.code()))
            .filter(tables::created_at.ge(cutoff))
            .filter(tables::start_time.ge(now))
            .order(tables::created_at.desc())
            .select(TableRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| {
                map_diesel_error(err, TableStoreError::query, TableStoreError::connection)
            })?;

        rows.iter()
            .map(|row| {
                let occupancy = decode_occupancy(row)?;
                Ok(OpenTable {
                    id: row.id,
                    host_id: occupancy.host_id,
                    participants: occupancy.participants,
                    config: config_from_row(row),
                    created_at: row.created_at,
                })
            })
            .collect()
    }
}
