//! Integration tests for `DieselTableStore`.
//!
//! This suite exercises the locked unit-of-work transactions against
//! embedded PostgreSQL: the match transition on the filling join, the
//! last-seat race, switch rollback on a rejected join, explicit switch
//! origins, and sweep releases.

use chrono::{DateTime, Duration, Utc};
use parlour_backend::domain::ports::{TableStore, TableStoreError};
use parlour_backend::domain::{TableConfig, TableId, UserId};
use parlour_backend::outbound::persistence::{DbPool, DieselTableStore, PoolConfig};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{format_postgres_error, handle_cluster_setup_failure, provision_database};

struct TestContext {
    runtime: Runtime,
    store: DieselTableStore,
    database_url: String,
    _database: TemporaryDatabase,
}

fn uid(n: i64) -> UserId {
    UserId::new(n).expect("valid user id")
}

fn config(start_time: DateTime<Utc>) -> TableConfig {
    TableConfig {
        fee_mode: 0,
        scoring_tier: 0,
        notes: String::new(),
        venue_id: 9,
        session_kind: 0,
        gender_pref: 0,
        duration: 2,
        start_time,
    }
}

fn seed_users(url: &str, ids: &[i64]) -> Result<(), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    for &id in ids {
        let display_name = format!("player {id}");
        client
            .execute(
                "INSERT INTO users (user_id, display_name) VALUES ($1, $2)",
                &[&id, &display_name],
            )
            .map_err(|err| format_postgres_error(&err))?;
    }
    Ok(())
}

struct TableSnapshot {
    status: i16,
    matched_at: Option<DateTime<Utc>>,
    occupants: Vec<i64>,
}

fn table_snapshot(url: &str, table_id: TableId) -> Result<TableSnapshot, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let row = client
        .query_one(
            "SELECT status, matched_at, participants FROM tables WHERE id = $1",
            &[&table_id],
        )
        .map_err(|err| format_postgres_error(&err))?;
    let roster: serde_json::Value = row.get(2);
    let occupants = roster
        .as_array()
        .map(|entries| entries.iter().filter_map(serde_json::Value::as_i64).collect())
        .unwrap_or_default();
    Ok(TableSnapshot {
        status: row.get(0),
        matched_at: row.get(1),
        occupants,
    })
}

fn user_pointer(url: &str, user_id: i64) -> Result<(i16, Option<i64>), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let row = client
        .query_one(
            "SELECT status, current_table_id FROM users WHERE user_id = $1",
            &[&user_id],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok((row.get(0), row.get(1)))
}

fn clear_pointer(url: &str, user_id: i64) -> Result<(), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    client
        .execute(
            "UPDATE users SET status = 0, current_table_id = NULL WHERE user_id = $1",
            &[&user_id],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok(())
}

fn game_session_count(url: &str, table_id: TableId) -> Result<i64, String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let row = client
        .query_one(
            "SELECT COUNT(*) FROM game_sessions WHERE table_id = $1",
            &[&table_id],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok(row.get(0))
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let database = provision_database()?;
    let database_url = database.url().to_string();
    seed_users(database_url.as_str(), &[1, 2, 3, 4, 5, 6])?;

    let pool_config = PoolConfig::new(database_url.as_str()).with_max_size(4);
    let pool = runtime
        .block_on(DbPool::new(pool_config))
        .map_err(|err| err.to_string())?;

    Ok(TestContext {
        runtime,
        store: DieselTableStore::new(pool),
        database_url,
        _database: database,
    })
}

#[fixture]
fn store_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn fourth_join_commits_the_match(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: fourth_join_commits_the_match skipped");
        return;
    };
    let store = ctx.store.clone();
    let now = Utc::now();
    let start = now + Duration::hours(1);

    let table_id = ctx.runtime.block_on(async {
        let table_id = store
            .create_table(uid(1), config(start), None, now)
            .await
            .expect("create table");
        for n in [2, 3] {
            store
                .join_table(uid(n), table_id, None, now)
                .await
                .expect("waiting join");
        }

        let commit = store
            .join_table(uid(4), table_id, None, now)
            .await
            .expect("filling join");
        assert_eq!(commit.seated, 4);
        let fanout = commit.match_fanout.expect("filling join carries the fan-out");
        assert_eq!(fanout.participants.len(), 4);

        table_id
    });

    let table = table_snapshot(&ctx.database_url, table_id).expect("table row");
    assert_eq!(table.status, 1, "table should be matched");
    assert!(table.matched_at.is_some());
    assert_eq!(table.occupants.len(), 4);
    assert_eq!(
        game_session_count(&ctx.database_url, table_id).expect("session rows"),
        4
    );
    for n in 1..=4 {
        let (status, pointer) = user_pointer(&ctx.database_url, n).expect("user row");
        assert_eq!(status, 0, "participant {n} should be reset to idle");
        assert_eq!(pointer, None);
    }
}

#[rstest]
fn last_seat_race_seats_exactly_one(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: last_seat_race_seats_exactly_one skipped");
        return;
    };
    let store = ctx.store.clone();
    let now = Utc::now();
    let start = now + Duration::hours(1);

    let table_id = ctx.runtime.block_on(async {
        let table_id = store
            .create_table(uid(1), config(start), None, now)
            .await
            .expect("create table");
        for n in [2, 3] {
            store
                .join_table(uid(n), table_id, None, now)
                .await
                .expect("waiting join");
        }
        table_id
    });

    let (first, second) = ctx.runtime.block_on(async {
        tokio::join!(
            store.join_table(uid(4), table_id, None, now),
            store.join_table(uid(5), table_id, None, now),
        )
    });

    let (winner, loser) = match (first, second) {
        (Ok(commit), Err(error)) | (Err(error), Ok(commit)) => (commit, error),
        (Ok(_), Ok(_)) => panic!("both racers were seated at the last seat"),
        (Err(first), Err(second)) => {
            panic!("neither racer was seated: {first}, {second}")
        }
    };
    assert_eq!(winner.seated, 4);
    assert!(winner.match_fanout.is_some());
    assert!(matches!(loser, TableStoreError::TableFull { .. }));

    let table = table_snapshot(&ctx.database_url, table_id).expect("table row");
    assert_eq!(table.occupants.len(), 4, "roster never exceeds capacity");
}

#[rstest]
fn rejected_switch_rolls_back_the_leave(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: rejected_switch_rolls_back_the_leave skipped");
        return;
    };
    let store = ctx.store.clone();
    let now = Utc::now();
    let start = now + Duration::hours(1);

    let (origin_id, full_id) = ctx.runtime.block_on(async {
        let origin_id = store
            .create_table(uid(1), config(start), None, now)
            .await
            .expect("create origin table");
        store
            .join_table(uid(5), origin_id, None, now)
            .await
            .expect("join origin table");

        let full_id = store
            .create_table(uid(2), config(start), None, now)
            .await
            .expect("create second table");
        for n in [3, 4, 6] {
            store
                .join_table(uid(n), full_id, None, now)
                .await
                .expect("fill second table");
        }

        let error = store
            .join_table(uid(5), full_id, None, now)
            .await
            .expect_err("switch into a full table is rejected");
        assert!(matches!(error, TableStoreError::TableFull { .. }));

        (origin_id, full_id)
    });

    // The rejected switch rolled back as one unit: the caller keeps both
    // their seat and their pointer.
    let origin = table_snapshot(&ctx.database_url, origin_id).expect("origin row");
    assert!(origin.occupants.contains(&5));
    let (status, pointer) = user_pointer(&ctx.database_url, 5).expect("user row");
    assert_eq!(status, 1);
    assert_eq!(pointer, Some(origin_id));
    assert_ne!(origin_id, full_id);
}

#[rstest]
fn join_honours_an_explicit_origin(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!("SKIP-TEST-CLUSTER: join_honours_an_explicit_origin skipped");
        return;
    };
    let store = ctx.store.clone();
    let now = Utc::now();
    let start = now + Duration::hours(1);

    let (origin_id, target_id) = ctx.runtime.block_on(async {
        let origin_id = store
            .create_table(uid(1), config(start), None, now)
            .await
            .expect("create origin table");
        store
            .join_table(uid(2), origin_id, None, now)
            .await
            .expect("join origin table");
        let target_id = store
            .create_table(uid(3), config(start), None, now)
            .await
            .expect("create target table");
        (origin_id, target_id)
    });

    // Drift: the mirror forgot the seat, but the roster still lists user 2.
    clear_pointer(&ctx.database_url, 2).expect("clear pointer");

    ctx.runtime.block_on(async {
        store
            .join_table(uid(2), target_id, Some(origin_id), now)
            .await
            .expect("switch with an explicit origin");
    });

    let origin = table_snapshot(&ctx.database_url, origin_id).expect("origin row");
    assert!(
        !origin.occupants.contains(&2),
        "the named origin is vacated even without a pointer"
    );
    let (_, pointer) = user_pointer(&ctx.database_url, 2).expect("user row");
    assert_eq!(pointer, Some(target_id));
}

#[rstest]
fn sweep_cancels_expired_tables_and_releases_occupants(store_context: Option<TestContext>) {
    let Some(ctx) = store_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: sweep_cancels_expired_tables_and_releases_occupants skipped"
        );
        return;
    };
    let store = ctx.store.clone();
    let now = Utc::now();
    let ttl = Duration::hours(2);

    let (stale_id, fresh_id) = ctx.runtime.block_on(async {
        let stale_id = store
            .create_table(uid(1), config(now + Duration::hours(1)), None, now)
            .await
            .expect("create stale table");
        store
            .join_table(uid(2), stale_id, None, now)
            .await
            .expect("join stale table");
        let fresh_id = store
            .create_table(uid(3), config(now + Duration::hours(3)), None, now)
            .await
            .expect("create fresh table");

        let report = store
            .sweep_expired(now + Duration::hours(2), ttl)
            .await
            .expect("sweep");
        assert_eq!(report.cancelled_tables, 1);
        assert_eq!(report.released_users, 2);

        (stale_id, fresh_id)
    });

    let stale = table_snapshot(&ctx.database_url, stale_id).expect("stale row");
    assert_eq!(stale.status, 3, "past start time cancels the table");
    for n in [1, 2] {
        let (status, pointer) = user_pointer(&ctx.database_url, n).expect("user row");
        assert_eq!(status, 0);
        assert_eq!(pointer, None);
    }

    let fresh = table_snapshot(&ctx.database_url, fresh_id).expect("fresh row");
    assert_eq!(fresh.status, 0, "a table inside its window survives");
    let (_, pointer) = user_pointer(&ctx.database_url, 3).expect("user row");
    assert_eq!(pointer, Some(fresh_id));
}
