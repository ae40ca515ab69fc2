//! PostgreSQL-backed `ProfileStore` implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{ProfileStore, ProfileStoreError};
use crate::domain::user::{ProfileView, UserId};

use super::diesel_error_mapping::{map_diesel_error, map_pool_error};
use super::models::UserProfileRow;
use super::pool::DbPool;
use super::schema::users;

/// Diesel-backed implementation of the profile store port.
#[derive(Clone)]
pub struct DieselProfileStore {
    pool: DbPool,
}

impl DieselProfileStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for DieselProfileStore {
    async fn profiles(
        &self,
        requested: &[UserId],
    ) -> Result<HashMap<UserId, ProfileView>, ProfileStoreError> {
        if requested.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, ProfileStoreError::connection))?;

        let ids: Vec<i64> = requested.iter().map(|user| user.get()).collect();
        let rows: Vec<UserProfileRow> = users::table
            .filter(users::user_id.eq_any(ids))
            .select(UserProfileRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|err| {
                map_diesel_error(err, ProfileStoreError::query, ProfileStoreError::connection)
            })?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in rows {
            let Ok(id) = UserId::new(row.user_id) else {
                warn!(raw_id = row.user_id, "skipping profile with invalid id");
                continue;
            };
            found.insert(
                id,
                ProfileView {
                    id,
                    display_name: row.display_name,
                    avatar_ref: row.avatar_ref,
                    gender: row.gender,
                    phone: row.phone,
                },
            );
        }

        Ok(found)
    }
}
