//! HTTP server configuration object and helpers.

use std::net::SocketAddr;

use chrono::Duration;

use crate::domain::ports::default_table_ttl;
use crate::outbound::notify::NotifyConfig;
use crate::outbound::persistence::DbPool;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: DbPool,
    pub(crate) auth_secret: String,
    pub(crate) table_ttl: Duration,
    pub(crate) notify: Option<NotifyConfig>,
}

impl ServerConfig {
    /// Construct a server configuration with the default table retention
    /// window and no notification channel.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, db_pool: DbPool, auth_secret: impl Into<String>) -> Self {
        Self {
            bind_addr,
            db_pool,
            auth_secret: auth_secret.into(),
            table_ttl: default_table_ttl(),
            notify: None,
        }
    }

    /// Override the table retention window used for sweeping, listing, and
    /// presence repair.
    #[must_use]
    pub fn with_table_ttl(mut self, ttl: Duration) -> Self {
        self.table_ttl = ttl;
        self
    }

    /// Attach messaging channel credentials so match notifications are
    /// delivered for real instead of being dropped.
    #[must_use]
    pub fn with_notify(mut self, notify: NotifyConfig) -> Self {
        self.notify = Some(notify);
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
