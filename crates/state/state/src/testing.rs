use chrono::{Duration, TimeZone, Utc};

use roombook_core::{
    EventKind, OperationalEvent, PLACEHOLDER_PASSWORD_HASH, Reservation, ReservationDraft,
    ReservationFilter, Room, RoomPatch,
};

use crate::counter::CounterStore;
use crate::error::StateError;
use crate::store::Datastore;

fn room(id: &str, active: bool) -> Room {
    Room {
        id: id.to_owned(),
        floor: id.to_owned(),
        name: format!("Room {id}"),
        is_active: active,
    }
}

fn reservation(id: &str, floor: &str, date: &str, start: &str, end: &str) -> Reservation {
    Reservation {
        id: id.to_owned(),
        date: date.to_owned(),
        floor: floor.to_owned(),
        start_time: start.to_owned(),
        end_time: end.to_owned(),
        team_name: "Team".to_owned(),
        user_name: "User".to_owned(),
        password_hash: "00".repeat(32),
        created_at: Utc
            .with_ymd_and_hms(2025, 6, 1, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}

fn draft_of(r: &Reservation) -> ReservationDraft {
    ReservationDraft {
        date: r.date.clone(),
        floor: r.floor.clone(),
        start_time: r.start_time.clone(),
        end_time: r.end_time.clone(),
        team_name: r.team_name.clone(),
        user_name: r.user_name.clone(),
    }
}

/// Run the full datastore conformance test suite.
///
/// Call this from your backend's test module with a fresh, empty store.
///
/// # Errors
///
/// Returns an error if any backend call fails.
pub async fn run_datastore_conformance_tests(store: &dyn Datastore) -> Result<(), StateError> {
    test_ping(store).await?;
    test_room_lifecycle(store).await?;
    test_duplicate_room(store).await?;
    test_reservation_lifecycle(store).await?;
    test_overlap_boundaries(store).await?;
    test_insert_conflict(store).await?;
    test_update_conflict_excludes_self(store).await?;
    test_password_hash(store).await?;
    test_events_since(store).await?;
    Ok(())
}

async fn test_ping(store: &dyn Datastore) -> Result<(), StateError> {
    store.ping().await
}

async fn test_room_lifecycle(store: &dyn Datastore) -> Result<(), StateError> {
    store.insert_room(&room("CT-1F", true)).await?;
    store.insert_room(&room("CT-2F", false)).await?;

    let active = store.list_rooms(false).await?;
    assert!(active.iter().any(|r| r.id == "CT-1F"));
    assert!(
        !active.iter().any(|r| r.id == "CT-2F"),
        "inactive rooms must be hidden by default"
    );
    let all = store.list_rooms(true).await?;
    assert!(all.iter().any(|r| r.id == "CT-2F"));

    let patch = RoomPatch {
        name: Some("Renamed".to_owned()),
        is_active: Some(true),
    };
    let updated = store.update_room("CT-2F", &patch).await?;
    let updated = updated.ok_or_else(|| StateError::NotFound("CT-2F".into()))?;
    assert_eq!(updated.name, "Renamed");
    assert!(updated.is_active);

    let only_name = RoomPatch {
        name: Some("Again".to_owned()),
        is_active: None,
    };
    let again = store.update_room("CT-2F", &only_name).await?;
    assert!(again.is_some_and(|r| r.is_active && r.name == "Again"));

    assert!(store.update_room("CT-missing", &patch).await?.is_none());
    assert!(store.delete_room("CT-2F").await?);
    assert!(!store.delete_room("CT-2F").await?);
    assert!(store.get_room("CT-2F").await?.is_none());
    Ok(())
}

async fn test_duplicate_room(store: &dyn Datastore) -> Result<(), StateError> {
    store.insert_room(&room("CT-DUP", true)).await?;
    let second = store.insert_room(&room("CT-DUP", true)).await;
    assert!(
        matches!(second, Err(StateError::AlreadyExists(_))),
        "duplicate room id must be rejected"
    );
    Ok(())
}

async fn test_reservation_lifecycle(store: &dyn Datastore) -> Result<(), StateError> {
    let r = reservation("ct-life", "CT-L", "2025-06-10", "10:00", "11:00");
    store.insert_reservation(&r).await?;

    let fetched = store.get_reservation("ct-life").await?;
    assert_eq!(fetched.as_ref(), Some(&r));

    let filter = ReservationFilter {
        date: Some("2025-06-10".into()),
        floor: Some("CT-L".into()),
        from_date: None,
    };
    assert_eq!(store.list_reservations(&filter).await?.len(), 1);

    let mut draft = draft_of(&r);
    draft.team_name = "Other".into();
    draft.start_time = "14:00".into();
    draft.end_time = "15:00".into();
    let updated = store.update_reservation("ct-life", &draft).await?;
    let updated = updated.ok_or_else(|| StateError::NotFound("ct-life".into()))?;
    assert_eq!(updated.team_name, "Other");
    assert_eq!(updated.start_time, "14:00");
    assert_eq!(updated.password_hash, r.password_hash, "hash survives update");

    assert!(store.update_reservation("ct-none", &draft).await?.is_none());
    assert!(store.delete_reservation("ct-life").await?);
    assert!(!store.delete_reservation("ct-life").await?);
    assert!(store.get_reservation("ct-life").await?.is_none());
    Ok(())
}

async fn test_overlap_boundaries(store: &dyn Datastore) -> Result<(), StateError> {
    store
        .insert_reservation(&reservation("ct-a", "CT-O", "2025-06-10", "10:00", "11:00"))
        .await?;
    store
        .insert_reservation(&reservation("ct-b", "CT-O", "2025-06-10", "11:00", "12:00"))
        .await?;

    let hits = store
        .find_overlapping("CT-O", "2025-06-10", "10:30", "11:30", None)
        .await?;
    assert_eq!(hits.len(), 2);

    let before = store
        .find_overlapping("CT-O", "2025-06-10", "09:00", "10:00", None)
        .await?;
    assert!(before.is_empty(), "shared boundary is not an overlap");

    let other_day = store
        .find_overlapping("CT-O", "2025-06-11", "10:30", "11:30", None)
        .await?;
    assert!(other_day.is_empty());

    let excluded = store
        .find_overlapping("CT-O", "2025-06-10", "10:00", "11:00", Some("ct-a"))
        .await?;
    assert!(excluded.is_empty());
    Ok(())
}

async fn test_insert_conflict(store: &dyn Datastore) -> Result<(), StateError> {
    store
        .insert_reservation(&reservation("ct-c1", "CT-C", "2025-06-10", "10:00", "11:00"))
        .await?;
    let clash = store
        .insert_reservation(&reservation("ct-c2", "CT-C", "2025-06-10", "10:30", "11:30"))
        .await;
    assert!(
        matches!(clash, Err(StateError::Conflict(_))),
        "overlapping insert must be rejected by the store"
    );
    store
        .insert_reservation(&reservation("ct-c3", "CT-C", "2025-06-10", "11:00", "12:00"))
        .await?;
    Ok(())
}

async fn test_update_conflict_excludes_self(store: &dyn Datastore) -> Result<(), StateError> {
    let a = reservation("ct-u1", "CT-U", "2025-06-10", "10:00", "11:00");
    let b = reservation("ct-u2", "CT-U", "2025-06-10", "12:00", "13:00");
    store.insert_reservation(&a).await?;
    store.insert_reservation(&b).await?;

    let mut widen = draft_of(&a);
    widen.end_time = "11:30".into();
    assert!(store.update_reservation("ct-u1", &widen).await?.is_some());

    let mut clash = draft_of(&a);
    clash.start_time = "12:30".into();
    clash.end_time = "13:30".into();
    let res = store.update_reservation("ct-u1", &clash).await;
    assert!(matches!(res, Err(StateError::Conflict(_))));
    Ok(())
}

async fn test_password_hash(store: &dyn Datastore) -> Result<(), StateError> {
    let mut r = reservation("ct-pw", "CT-P", "2025-06-10", "10:00", "11:00");
    r.password_hash = PLACEHOLDER_PASSWORD_HASH.to_owned();
    store.insert_reservation(&r).await?;
    assert!(store.count_placeholder_hashes().await? >= 1);

    assert!(store.set_password_hash("ct-pw", "abc").await?);
    let stored = store.get_reservation("ct-pw").await?;
    assert_eq!(stored.map(|r| r.password_hash).as_deref(), Some("abc"));
    assert!(!store.set_password_hash("ct-missing", "abc").await?);
    Ok(())
}

async fn test_events_since(store: &dyn Datastore) -> Result<(), StateError> {
    let now = Utc::now();
    let old = OperationalEvent {
        id: "ct-ev-old".into(),
        kind: EventKind::AdminFail,
        subject: "1.2.3.4".into(),
        created_at: now - Duration::days(40),
    };
    let fresh = OperationalEvent {
        id: "ct-ev-new".into(),
        kind: EventKind::PasswordFail,
        subject: "ct-pw".into(),
        created_at: now - Duration::minutes(5),
    };
    store.record_event(&old).await?;
    store.record_event(&fresh).await?;

    let recent = store.list_events_since(now - Duration::days(30)).await?;
    assert!(recent.iter().any(|e| e.id == "ct-ev-new"));
    assert!(!recent.iter().any(|e| e.id == "ct-ev-old"));
    Ok(())
}

/// Run the counter store conformance test suite.
///
/// # Errors
///
/// Returns an error if any backend call fails.
pub async fn run_counter_conformance_tests(store: &dyn CounterStore) -> Result<(), StateError> {
    test_first_hit_opens_window(store).await?;
    test_hits_accumulate(store).await?;
    test_window_resets(store).await?;
    test_keys_are_independent(store).await?;
    Ok(())
}

async fn test_first_hit_opens_window(store: &dyn CounterStore) -> Result<(), StateError> {
    let b = store.hit("ct:first", 1_000, 60_000).await?;
    assert_eq!(b.count, 1);
    assert_eq!(b.window_start_ms, 1_000);
    Ok(())
}

async fn test_hits_accumulate(store: &dyn CounterStore) -> Result<(), StateError> {
    for i in 1..=5 {
        let b = store.hit("ct:acc", 10_000 + i, 60_000).await?;
        assert_eq!(b.count, u64::try_from(i).unwrap_or_default());
        assert_eq!(b.window_start_ms, 10_001);
    }
    Ok(())
}

async fn test_window_resets(store: &dyn CounterStore) -> Result<(), StateError> {
    store.hit("ct:reset", 0, 60_000).await?;
    store.hit("ct:reset", 59_999, 60_000).await?;
    let b = store.hit("ct:reset", 60_000, 60_000).await?;
    assert_eq!(b.count, 1, "window elapsed exactly, counter resets");
    assert_eq!(b.window_start_ms, 60_000);
    Ok(())
}

async fn test_keys_are_independent(store: &dyn CounterStore) -> Result<(), StateError> {
    store.hit("ct:k|GET", 0, 60_000).await?;
    store.hit("ct:k|GET", 1, 60_000).await?;
    let post = store.hit("ct:k|POST", 2, 60_000).await?;
    assert_eq!(post.count, 1);
    Ok(())
}
