//! Embedded PostgreSQL provisioning for adapter integration tests.
//!
//! Each suite gets its own temporary database on a shared embedded cluster,
//! with the crate's migrations applied. Environments where the cluster
//! cannot start may set `SKIP_TEST_CLUSTER=1` to skip these suites.

use std::time::Duration;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use pg_embedded_setup_unpriv::{BootstrapResult, ClusterHandle, TemporaryDatabase};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const CLUSTER_RETRIES: usize = 5;
const CLUSTER_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Returns the shared embedded cluster handle, retrying transient bootstrap
/// failures.
fn shared_cluster_handle() -> BootstrapResult<&'static ClusterHandle> {
    let mut attempt = 1;
    loop {
        match pg_embedded_setup_unpriv::test_support::shared_cluster_handle() {
            Ok(handle) => return Ok(handle),
            Err(error) => {
                if attempt >= CLUSTER_RETRIES {
                    return Err(error);
                }
                std::thread::sleep(CLUSTER_RETRY_DELAY);
                attempt += 1;
            }
        }
    }
}

/// Provisions a temporary database with all migrations applied.
pub fn provision_database() -> Result<TemporaryDatabase, String> {
    let cluster = shared_cluster_handle().map_err(|err| format!("{err:?}"))?;
    let name = format!("parlour_test_{}", uuid::Uuid::new_v4().simple());
    let database = cluster
        .temporary_database(name)
        .map_err(|err| format!("create temporary database: {err:?}"))?;
    migrate_schema(database.url())?;
    Ok(database)
}

/// Runs all pending Diesel migrations against the given database URL.
fn migrate_schema(url: &str) -> Result<(), String> {
    let mut conn =
        PgConnection::establish(url).map_err(|err| format!("connect for migrations: {err}"))?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("migration: {err}"))?;
    Ok(())
}

/// Returns true when `SKIP_TEST_CLUSTER` is set to a truthy value
/// ("1", "true", "yes", case-insensitive).
fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Handles cluster setup failures consistently across suites: prints a skip
/// marker and returns `None` when skipping is allowed, panics otherwise so
/// CI breakage is not masked.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    if should_skip_test_cluster() {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
