//! Driven port for reading public user profiles.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::user::{ProfileView, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by profile store adapters.
    pub enum ProfileStoreError {
        /// Store connection could not be established.
        Connection { message: String } =>
            "profile store connection failed: {message}",
        /// Query failed.
        Query { message: String } =>
            "profile store query failed: {message}",
    }
}

/// Port that hydrates listing output with public profile data.
///
/// Unknown ids are simply absent from the result; listings tolerate rosters
/// that reference users the profile store has never seen.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch the public profiles for the given users, keyed by id.
    async fn profiles(
        &self,
        users: &[UserId],
    ) -> Result<HashMap<UserId, ProfileView>, ProfileStoreError>;
}
