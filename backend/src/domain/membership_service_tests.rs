//! Tests for the membership services.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use mockable::MockClock;
use mockall::predicate::eq;

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{
    JoinCommit, LeaveCommit, MockNotifier, MockPresenceMirror, MockProfileStore, MockTableStore,
    NotifierError, OpenTable, SweepReport, TableDraft,
};
use crate::domain::table::{TableConfig, TableStatus};
use crate::domain::user::ProfileView;

fn uid(raw: i64) -> UserId {
    UserId::new(raw).expect("positive id")
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn fixed_clock() -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().returning(noon);
    Arc::new(clock)
}

fn sample_config() -> TableConfig {
    TableConfig {
        fee_mode: 1,
        scoring_tier: 2,
        notes: "friday game".to_owned(),
        venue_id: 9,
        session_kind: 0,
        gender_pref: 0,
        duration: 2,
        start_time: noon() + Duration::hours(1),
    }
}

fn sample_draft() -> TableDraft {
    TableDraft {
        start_time: noon() + Duration::hours(1),
        venue_id: 9,
        fee_mode: Some(1),
        scoring_tier: Some(2),
        notes: Some("friday game".to_owned()),
        session_kind: None,
        gender_pref: None,
        duration: Some(2),
    }
}

#[tokio::test]
async fn create_table_validates_then_persists() {
    let mut store = MockTableStore::new();
    store
        .expect_create_table()
        .withf(|host, config, from, now| {
            *host == uid(7) && config.venue_id == 9 && from.is_none() && *now == noon()
        })
        .times(1)
        .return_once(|_, _, _, _| Ok(42));
    let notifier = MockNotifier::new();

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let table_id = service
        .create_table(uid(7), sample_draft(), None)
        .await
        .expect("create succeeds");

    assert_eq!(table_id, 42);
}

#[tokio::test]
async fn create_table_rejects_past_start_without_touching_the_store() {
    let mut store = MockTableStore::new();
    store.expect_create_table().times(0);
    let notifier = MockNotifier::new();

    let mut draft = sample_draft();
    draft.start_time = noon() - Duration::minutes(1);

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let error = service
        .create_table(uid(7), draft, None)
        .await
        .expect_err("invalid draft");

    assert_eq!(error.code, ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn join_without_match_skips_the_fan_out() {
    let mut store = MockTableStore::new();
    store
        .expect_join_table()
        .with(eq(uid(3)), eq(11_i64), eq(None::<i64>), eq(noon()))
        .times(1)
        .return_once(|_, _, _, _| {
            Ok(JoinCommit {
                seated: 2,
                match_fanout: None,
            })
        });
    let mut notifier = MockNotifier::new();
    notifier.expect_notify().times(0);

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let outcome = service.join_table(uid(3), 11, None).await.expect("join succeeds");

    assert_eq!(outcome.seated, 2);
    assert!(!outcome.matched);
}

#[tokio::test]
async fn join_forwards_the_named_origin_table() {
    let mut store = MockTableStore::new();
    store
        .expect_join_table()
        .with(eq(uid(3)), eq(11_i64), eq(Some(5_i64)), eq(noon()))
        .times(1)
        .return_once(|_, _, _, _| {
            Ok(JoinCommit {
                seated: 1,
                match_fanout: None,
            })
        });
    let notifier = MockNotifier::new();

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    service
        .join_table(uid(3), 11, Some(5))
        .await
        .expect("join succeeds");
}

#[tokio::test]
async fn filling_join_notifies_every_participant_once() {
    let roster = vec![uid(7), uid(3), uid(9), uid(5)];
    let fanout = MatchFanout {
        table_id: 11,
        participants: roster.clone(),
        matched_at: noon(),
        start_time: noon() + Duration::hours(1),
    };

    let mut store = MockTableStore::new();
    store.expect_join_table().times(1).return_once(move |_, _, _, _| {
        Ok(JoinCommit {
            seated: 4,
            match_fanout: Some(fanout),
        })
    });

    let mut notifier = MockNotifier::new();
    for participant in roster {
        notifier
            .expect_notify()
            .withf(move |user, notice| *user == participant && notice.table_id == 11)
            .times(1)
            .returning(|_, _| Ok(()));
    }

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let outcome = service.join_table(uid(5), 11, None).await.expect("join succeeds");

    assert_eq!(outcome.seated, 4);
    assert!(outcome.matched);
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_join() {
    let fanout = MatchFanout {
        table_id: 11,
        participants: vec![uid(7), uid(5)],
        matched_at: noon(),
        start_time: noon() + Duration::hours(1),
    };

    let mut store = MockTableStore::new();
    store.expect_join_table().times(1).return_once(move |_, _, _, _| {
        Ok(JoinCommit {
            seated: 4,
            match_fanout: Some(fanout),
        })
    });

    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .times(2)
        .returning(|_, _| Err(NotifierError::delivery("channel down")));

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let outcome = service.join_table(uid(5), 11, None).await.expect("join succeeds");

    assert!(outcome.matched);
}

#[tokio::test]
async fn join_maps_capacity_rejection_to_table_full() {
    let mut store = MockTableStore::new();
    store
        .expect_join_table()
        .times(1)
        .return_once(|_, _, _, _| Err(TableStoreError::table_full(11_i64)));
    let notifier = MockNotifier::new();

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let error = service.join_table(uid(3), 11, None).await.expect_err("table full");

    assert_eq!(error.code, ErrorCode::TableFull);
}

#[tokio::test]
async fn leave_reports_succession_outcome() {
    let mut store = MockTableStore::new();
    store
        .expect_leave_table()
        .with(eq(uid(7)), eq(11_i64))
        .times(1)
        .return_once(|_, _| {
            Ok(LeaveCommit {
                remaining: vec![uid(3), uid(9)],
                host_id: uid(3),
                status: TableStatus::Waiting,
            })
        });
    let notifier = MockNotifier::new();

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let outcome = service.leave_table(uid(7), 11).await.expect("leave succeeds");

    assert_eq!(outcome.remaining, 2);
    assert_eq!(outcome.host_id, uid(3));
    assert_eq!(outcome.status, TableStatus::Waiting);
}

#[tokio::test]
async fn leave_maps_connection_error_to_service_unavailable() {
    let mut store = MockTableStore::new();
    store
        .expect_leave_table()
        .times(1)
        .return_once(|_, _| Err(TableStoreError::connection("pool unavailable")));
    let notifier = MockNotifier::new();

    let service =
        MembershipCommandService::new(Arc::new(store), Arc::new(notifier), fixed_clock());
    let error = service.leave_table(uid(7), 11).await.expect_err("unavailable");

    assert_eq!(error.code, ErrorCode::ServiceUnavailable);
}

fn query_service(
    store: MockTableStore,
    mirror: MockPresenceMirror,
    profiles: MockProfileStore,
) -> MembershipQueryService<MockTableStore, MockPresenceMirror, MockProfileStore> {
    MembershipQueryService::new(
        Arc::new(store),
        Arc::new(mirror),
        Arc::new(profiles),
        fixed_clock(),
        Duration::hours(2),
    )
}

#[tokio::test]
async fn listing_sweeps_then_hydrates_profiles() {
    let mut store = MockTableStore::new();
    store
        .expect_sweep_expired()
        .with(eq(noon()), eq(Duration::hours(2)))
        .times(1)
        .return_once(|_, _| {
            Ok(SweepReport {
                cancelled_tables: 1,
                released_users: 2,
            })
        });
    store.expect_list_open().times(1).return_once(|_, _| {
        Ok(vec![OpenTable {
            id: 11,
            host_id: uid(7),
            participants: vec![uid(7), uid(3)],
            config: sample_config(),
            created_at: noon() - Duration::minutes(5),
        }])
    });

    let mut profiles = MockProfileStore::new();
    profiles
        .expect_profiles()
        .withf(|ids| ids == [uid(3), uid(7)])
        .times(1)
        .return_once(|_| {
            let mut found = HashMap::new();
            found.insert(
                uid(7),
                ProfileView {
                    id: uid(7),
                    display_name: "Ada".to_owned(),
                    avatar_ref: Some("avatars/ada.png".to_owned()),
                    gender: 1,
                    phone: None,
                },
            );
            Ok(found)
        });

    let service = query_service(store, MockPresenceMirror::new(), profiles);
    let tables = service.list_tables(Some(uid(3))).await.expect("list succeeds");

    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert!(table.joined);
    assert_eq!(table.seats.len(), 2);

    let host_seat = &table.seats[0];
    assert!(host_seat.is_host);
    assert!(!host_seat.is_me);
    assert_eq!(host_seat.display_name.as_deref(), Some("Ada"));

    // uid(3) has no profile row; the seat still lists with bare ids.
    let guest_seat = &table.seats[1];
    assert!(!guest_seat.is_host);
    assert!(guest_seat.is_me);
    assert_eq!(guest_seat.display_name, None);
}

#[tokio::test]
async fn anonymous_listing_marks_nothing_joined() {
    let mut store = MockTableStore::new();
    store
        .expect_sweep_expired()
        .times(1)
        .return_once(|_, _| Ok(SweepReport::default()));
    store.expect_list_open().times(1).return_once(|_, _| {
        Ok(vec![OpenTable {
            id: 11,
            host_id: uid(7),
            participants: vec![uid(7)],
            config: sample_config(),
            created_at: noon() - Duration::minutes(5),
        }])
    });
    let mut profiles = MockProfileStore::new();
    profiles
        .expect_profiles()
        .times(1)
        .return_once(|_| Ok(HashMap::new()));

    let service = query_service(store, MockPresenceMirror::new(), profiles);
    let tables = service.list_tables(None).await.expect("list succeeds");

    assert!(!tables[0].joined);
}

#[tokio::test]
async fn presence_maps_missing_user_to_not_found() {
    let mut mirror = MockPresenceMirror::new();
    mirror
        .expect_resolve()
        .with(eq(uid(7)), eq(noon()), eq(Duration::hours(2)))
        .times(1)
        .return_once(|user, _, _| Err(PresenceMirrorError::user_not_found(user)));

    let service = query_service(MockTableStore::new(), mirror, MockProfileStore::new());
    let error = service.presence(uid(7)).await.expect_err("missing user");

    assert_eq!(error.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn presence_passes_through_a_live_pointer() {
    let mut mirror = MockPresenceMirror::new();
    mirror
        .expect_resolve()
        .times(1)
        .return_once(|_, _, _| Ok(Presence::InRoom { table_id: 11 }));

    let service = query_service(MockTableStore::new(), mirror, MockProfileStore::new());
    let presence = service.presence(uid(7)).await.expect("resolved");

    assert_eq!(presence, Presence::InRoom { table_id: 11 });
}
