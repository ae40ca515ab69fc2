//! Backend entry-point: runs migrations, wires the REST endpoints, and
//! serves the OpenAPI docs in debug builds.

use std::env;
use std::net::SocketAddr;

use actix_web::web;
use chrono::Duration;
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use reqwest::Url;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use parlour_backend::inbound::http::health::HealthState;
use parlour_backend::outbound::notify::NotifyConfig;
use parlour_backend::outbound::persistence::{DbPool, PoolConfig};
use parlour_backend::server::{ServerConfig, create_server};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn required_var(name: &str) -> std::io::Result<String> {
    env::var(name).map_err(|_| std::io::Error::other(format!("{name} must be set")))
}

fn auth_secret_from_env() -> std::io::Result<String> {
    match env::var("AUTH_TOKEN_SECRET") {
        Ok(secret) => Ok(secret),
        Err(_) if cfg!(debug_assertions) => {
            warn!("AUTH_TOKEN_SECRET not set, using insecure dev secret (dev only)");
            Ok("insecure-dev-secret".into())
        }
        Err(_) => Err(std::io::Error::other("AUTH_TOKEN_SECRET must be set")),
    }
}

fn table_ttl_from_env() -> std::io::Result<Option<Duration>> {
    let Ok(raw) = env::var("TABLE_TTL_HOURS") else {
        return Ok(None);
    };
    let hours: i64 = raw
        .parse()
        .map_err(|err| std::io::Error::other(format!("invalid TABLE_TTL_HOURS: {err}")))?;
    if hours <= 0 {
        return Err(std::io::Error::other("TABLE_TTL_HOURS must be positive"));
    }
    Ok(Some(Duration::hours(hours)))
}

fn notify_config_from_env() -> std::io::Result<Option<NotifyConfig>> {
    let base_url = env::var("NOTIFY_BASE_URL").ok();
    let app_id = env::var("NOTIFY_APP_ID").ok();
    let app_secret = env::var("NOTIFY_APP_SECRET").ok();
    match (base_url, app_id, app_secret) {
        (Some(base_url), Some(app_id), Some(app_secret)) => {
            let base_url = Url::parse(&base_url)
                .map_err(|err| std::io::Error::other(format!("invalid NOTIFY_BASE_URL: {err}")))?;
            Ok(Some(NotifyConfig {
                base_url,
                app_id,
                app_secret,
            }))
        }
        (None, None, None) => {
            warn!("notification channel not configured, match notices will be dropped");
            Ok(None)
        }
        _ => Err(std::io::Error::other(
            "NOTIFY_BASE_URL, NOTIFY_APP_ID, and NOTIFY_APP_SECRET must be set together",
        )),
    }
}

/// Apply pending migrations on a blocking thread before taking traffic.
async fn run_migrations(database_url: String) -> std::io::Result<()> {
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .map_err(|err| format!("database connection failed: {err}"))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|err| format!("migrations failed: {err}"))
    })
    .await
    .map_err(|err| std::io::Error::other(format!("migration task panicked: {err}")))?
    .map_err(std::io::Error::other)?;

    if applied > 0 {
        info!(applied, "applied pending migrations");
    }
    Ok(())
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let database_url = required_var("DATABASE_URL")?;
    let bind_addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .map_err(|err| std::io::Error::other(format!("invalid BIND_ADDR: {err}")))?;
    let auth_secret = auth_secret_from_env()?;
    let table_ttl = table_ttl_from_env()?;
    let notify = notify_config_from_env()?;

    run_migrations(database_url.clone()).await?;

    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|err| std::io::Error::other(format!("pool construction failed: {err}")))?;

    let mut config = ServerConfig::new(bind_addr, pool, auth_secret);
    if let Some(ttl) = table_ttl {
        config = config.with_table_ttl(ttl);
    }
    if let Some(notify) = notify {
        config = config.with_notify(notify);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    info!(addr = %bind_addr, "listening");
    server.await
}
