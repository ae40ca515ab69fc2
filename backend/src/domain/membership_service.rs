//! Membership domain services.
//!
//! These services implement the table driving ports on top of the table
//! store, presence mirror, profile store, and notifier driven ports. All
//! transactional guarantees live in the store adapter; the services validate
//! input, map errors, and run the post-commit notification fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use mockable::Clock;
use tracing::{debug, warn};

use crate::domain::Error;
use crate::domain::ports::{
    JoinOutcome, LeaveOutcome, MatchFanout, MatchNotice, Notifier, PresenceMirror,
    PresenceMirrorError, ProfileStore, ProfileStoreError, SeatView, TableCommands, TableDraft,
    TableQueries, TableStore, TableStoreError, TableSummary,
};
use crate::domain::table::TableId;
use crate::domain::user::{Presence, UserId};

fn map_store_error(error: TableStoreError) -> Error {
    match error {
        TableStoreError::Connection { message } => {
            Error::service_unavailable(format!("table store unavailable: {message}"))
        }
        TableStoreError::Query { message } => {
            Error::internal(format!("table store error: {message}"))
        }
        TableStoreError::TableNotFound { table_id } => {
            Error::not_found(format!("table {table_id} not found"))
        }
        TableStoreError::AlreadyMember { table_id } => {
            Error::already_member(format!("already seated at table {table_id}"))
        }
        TableStoreError::TableFull { table_id } => {
            Error::table_full(format!("table {table_id} is already full"))
        }
        TableStoreError::NotMember { table_id } => {
            Error::not_member(format!("not seated at table {table_id}"))
        }
    }
}

fn map_profile_error(error: ProfileStoreError) -> Error {
    match error {
        ProfileStoreError::Connection { message } => {
            Error::service_unavailable(format!("profile store unavailable: {message}"))
        }
        ProfileStoreError::Query { message } => {
            Error::internal(format!("profile store error: {message}"))
        }
    }
}

fn map_mirror_error(error: PresenceMirrorError) -> Error {
    match error {
        PresenceMirrorError::Connection { message } => {
            Error::service_unavailable(format!("presence mirror unavailable: {message}"))
        }
        PresenceMirrorError::Query { message } => {
            Error::internal(format!("presence mirror error: {message}"))
        }
        PresenceMirrorError::UserNotFound { user_id } => {
            Error::not_found(format!("user {user_id} not found"))
        }
    }
}

/// Membership service implementing the command driving port.
#[derive(Clone)]
pub struct MembershipCommandService<S, N: ?Sized> {
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
}

impl<S, N: ?Sized> MembershipCommandService<S, N> {
    /// Create a new command service over a table store and a notifier.
    pub fn new(store: Arc<S>, notifier: Arc<N>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            notifier,
            clock,
        }
    }
}

impl<S, N> MembershipCommandService<S, N>
where
    N: Notifier + ?Sized,
{
    /// Deliver match notices to every participant. The transition is already
    /// committed, so delivery failures are logged and swallowed.
    async fn fan_out(&self, fanout: MatchFanout) {
        let notice = MatchNotice {
            table_id: fanout.table_id,
            matched_at: fanout.matched_at,
            start_time: fanout.start_time,
        };
        for participant in fanout.participants {
            if let Err(err) = self.notifier.notify(participant, notice).await {
                warn!(
                    user_id = %participant,
                    table_id = fanout.table_id,
                    error = %err,
                    "match notification failed"
                );
            }
        }
    }
}

#[async_trait]
impl<S, N> TableCommands for MembershipCommandService<S, N>
where
    S: TableStore,
    N: Notifier + ?Sized,
{
    async fn create_table(
        &self,
        host: UserId,
        draft: TableDraft,
        from: Option<TableId>,
    ) -> Result<TableId, Error> {
        let now = self.clock.utc();
        let config = draft
            .validate(now)
            .map_err(|err| Error::invalid_request(err.to_string()))?;

        self.store
            .create_table(host, config, from, now)
            .await
            .map_err(map_store_error)
    }

    async fn join_table(
        &self,
        user: UserId,
        table_id: TableId,
        from: Option<TableId>,
    ) -> Result<JoinOutcome, Error> {
        let now = self.clock.utc();
        let commit = self
            .store
            .join_table(user, table_id, from, now)
            .await
            .map_err(map_store_error)?;

        let matched = commit.match_fanout.is_some();
        if let Some(fanout) = commit.match_fanout {
            self.fan_out(fanout).await;
        }

        Ok(JoinOutcome {
            seated: commit.seated,
            matched,
        })
    }

    async fn leave_table(&self, user: UserId, table_id: TableId) -> Result<LeaveOutcome, Error> {
        let commit = self
            .store
            .leave_table(user, table_id)
            .await
            .map_err(map_store_error)?;

        Ok(LeaveOutcome {
            remaining: commit.remaining.len(),
            host_id: commit.host_id,
            status: commit.status,
        })
    }
}

/// Membership service implementing the query driving port.
#[derive(Clone)]
pub struct MembershipQueryService<S, P, F> {
    store: Arc<S>,
    mirror: Arc<P>,
    profiles: Arc<F>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl<S, P, F> MembershipQueryService<S, P, F> {
    /// Create a new query service with the retention window applied to
    /// sweeping, listing, and presence repair.
    pub fn new(
        store: Arc<S>,
        mirror: Arc<P>,
        profiles: Arc<F>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            mirror,
            profiles,
            clock,
            ttl,
        }
    }
}

#[async_trait]
impl<S, P, F> TableQueries for MembershipQueryService<S, P, F>
where
    S: TableStore,
    P: PresenceMirror,
    F: ProfileStore,
{
    async fn list_tables(&self, caller: Option<UserId>) -> Result<Vec<TableSummary>, Error> {
        let now = self.clock.utc();

        let swept = self
            .store
            .sweep_expired(now, self.ttl)
            .await
            .map_err(map_store_error)?;
        if swept.cancelled_tables > 0 {
            debug!(
                cancelled = swept.cancelled_tables,
                released = swept.released_users,
                "swept expired tables"
            );
        }

        let open = self
            .store
            .list_open(now, self.ttl)
            .await
            .map_err(map_store_error)?;

        let mut occupant_ids: Vec<UserId> = open
            .iter()
            .flat_map(|table| table.participants.iter().copied())
            .collect();
        occupant_ids.sort_unstable();
        occupant_ids.dedup();

        let profiles = self
            .profiles
            .profiles(&occupant_ids)
            .await
            .map_err(map_profile_error)?;

        Ok(open
            .into_iter()
            .map(|table| {
                let seats = table
                    .participants
                    .iter()
                    .map(|&user_id| {
                        let profile = profiles.get(&user_id);
                        SeatView {
                            user_id,
                            display_name: profile.map(|p| p.display_name.clone()),
                            avatar_ref: profile.and_then(|p| p.avatar_ref.clone()),
                            gender: profile.map(|p| p.gender),
                            is_host: user_id == table.host_id,
                            is_me: caller == Some(user_id),
                        }
                    })
                    .collect();
                let joined =
                    caller.is_some_and(|caller| table.participants.contains(&caller));
                TableSummary {
                    id: table.id,
                    host_id: table.host_id,
                    seats,
                    config: table.config,
                    created_at: table.created_at,
                    joined,
                }
            })
            .collect())
    }

    async fn presence(&self, user: UserId) -> Result<Presence, Error> {
        let now = self.clock.utc();
        self.mirror
            .resolve(user, now, self.ttl)
            .await
            .map_err(map_mirror_error)
    }
}

#[cfg(test)]
#[path = "membership_service_tests.rs"]
mod tests;
