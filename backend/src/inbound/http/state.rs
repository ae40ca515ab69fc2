//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{Authenticator, TableCommands, TableQueries};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Occupancy mutations.
    pub tables: Arc<dyn TableCommands>,
    /// Occupancy reads.
    pub queries: Arc<dyn TableQueries>,
    /// Bearer token verification.
    pub authenticator: Arc<dyn Authenticator>,
}

impl HttpState {
    /// Bundle the port implementations handlers depend on.
    pub fn new(
        tables: Arc<dyn TableCommands>,
        queries: Arc<dyn TableQueries>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            tables,
            queries,
            authenticator,
        }
    }
}
