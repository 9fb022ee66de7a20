use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Stored password hash meaning "not yet migrated from the legacy backend".
pub const PLACEHOLDER_PASSWORD_HASH: &str = "__PHASE_B_PLACEHOLDER__";

/// Length of a generated reservation identifier, in hex characters.
pub const RESERVATION_ID_LEN: usize = 12;

/// A stored reservation row.
///
/// Field names match the managed database columns. The client-facing shape
/// is produced by [`Reservation::to_wire`], which never includes the hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub date: String,
    pub floor: String,
    pub start_time: String,
    pub end_time: String,
    pub team_name: String,
    pub user_name: String,
    #[serde(default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    /// Whether the stored hash is still the migration placeholder.
    pub fn needs_password_migration(&self) -> bool {
        self.password_hash.is_empty() || self.password_hash == PLACEHOLDER_PASSWORD_HASH
    }

    /// Whether this reservation's `[start, end)` interval overlaps the given one.
    pub fn overlaps(&self, start: &str, end: &str) -> bool {
        crate::validation::intervals_overlap(&self.start_time, &self.end_time, start, end)
    }

    /// Client-facing representation with the fixed wire labels.
    pub fn to_wire(&self) -> ReservationView {
        ReservationView {
            id: self.id.clone(),
            date: self.date.clone(),
            floor: self.floor.clone(),
            start_time: self.start_time.clone(),
            end_time: self.end_time.clone(),
            team_name: self.team_name.clone(),
            user_name: self.user_name.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

/// Reservation as the browser client sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationView {
    #[serde(rename = "예약ID")]
    pub id: String,
    #[serde(rename = "날짜")]
    pub date: String,
    #[serde(rename = "층")]
    pub floor: String,
    #[serde(rename = "시작시간")]
    pub start_time: String,
    #[serde(rename = "종료시간")]
    pub end_time: String,
    #[serde(rename = "팀명")]
    pub team_name: String,
    #[serde(rename = "예약자")]
    pub user_name: String,
    #[serde(rename = "생성일시")]
    pub created_at: String,
}

/// Mutable reservation fields, as supplied by create and update calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationDraft {
    pub date: String,
    pub floor: String,
    pub start_time: String,
    pub end_time: String,
    pub team_name: String,
    pub user_name: String,
}

/// A stored room row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub floor: String,
    pub name: String,
    pub is_active: bool,
}

impl Room {
    pub fn to_wire(&self) -> RoomView {
        RoomView {
            id: self.id.clone(),
            floor: self.floor.clone(),
            name: self.name.clone(),
            active: self.is_active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomView {
    #[serde(rename = "회의실ID")]
    pub id: String,
    #[serde(rename = "층")]
    pub floor: String,
    #[serde(rename = "이름")]
    pub name: String,
    #[serde(rename = "활성화")]
    pub active: bool,
}

/// Partial room update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoomPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl RoomPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_active.is_none()
    }
}

/// Kinds of operational events recorded on the managed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ReservationCreate,
    ReservationUpdate,
    ReservationDelete,
    PasswordFail,
    AdminFail,
    RoomChange,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReservationCreate => "reservation_create",
            Self::ReservationUpdate => "reservation_update",
            Self::ReservationDelete => "reservation_delete",
            Self::PasswordFail => "password_fail",
            Self::AdminFail => "admin_fail",
            Self::RoomChange => "room_change",
        }
    }

    /// Whether the event counts as an authentication failure.
    pub fn is_auth_failure(self) -> bool {
        matches!(self, Self::PasswordFail | Self::AdminFail)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only operational event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationalEvent {
    pub id: String,
    pub kind: EventKind,
    /// Reservation id, room id, or client address the event concerns.
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

/// Filter for reservation listings. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationFilter {
    pub date: Option<String>,
    pub floor: Option<String>,
    /// Only reservations dated on or after this day.
    pub from_date: Option<String>,
}

impl ReservationFilter {
    pub fn matches(&self, r: &Reservation) -> bool {
        self.date.as_deref().is_none_or(|d| r.date == d)
            && self.floor.as_deref().is_none_or(|f| r.floor == f)
            && self
                .from_date
                .as_deref()
                .is_none_or(|from| r.date.as_str() >= from)
    }
}

/// Derive a short reservation identifier.
///
/// The id is the leading hex of `SHA-256(date|floor|start|end|nanos)`, where
/// `nanos` is the creation timestamp. Two creations of the same slot at
/// different instants get different ids.
pub fn reservation_id(draft: &ReservationDraft, at: DateTime<Utc>) -> String {
    let stamp = at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros());
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}|{}|{}|{}|{stamp}",
            draft.date, draft.floor, draft.start_time, draft.end_time
        )
        .as_bytes(),
    );
    let digest = hex::encode(hasher.finalize());
    digest[..RESERVATION_ID_LEN].to_owned()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn draft() -> ReservationDraft {
        ReservationDraft {
            date: "2025-06-10".into(),
            floor: "6F".into(),
            start_time: "10:00".into(),
            end_time: "11:00".into(),
            team_name: "Eng".into(),
            user_name: "Kim".into(),
        }
    }

    fn reservation() -> Reservation {
        Reservation {
            id: "abc123def456".into(),
            date: "2025-06-10".into(),
            floor: "6F".into(),
            start_time: "10:00".into(),
            end_time: "11:00".into(),
            team_name: "Eng".into(),
            user_name: "Kim".into(),
            password_hash: "deadbeef".into(),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn wire_labels_are_fixed() {
        let json = serde_json::to_value(reservation().to_wire()).unwrap();
        let obj = json.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        let mut expected = vec!["예약ID", "날짜", "층", "시작시간", "종료시간", "팀명", "예약자", "생성일시"];
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(obj["층"], "6F");
        assert!(!json.to_string().contains("deadbeef"));
    }

    #[test]
    fn room_wire_labels() {
        let room = Room {
            id: "6F".into(),
            floor: "6F".into(),
            name: "Main".into(),
            is_active: false,
        };
        let json = serde_json::to_value(room.to_wire()).unwrap();
        assert_eq!(json["회의실ID"], "6F");
        assert_eq!(json["이름"], "Main");
        assert_eq!(json["활성화"], false);
    }

    #[test]
    fn reservation_ids_are_short_hex_and_time_dependent() {
        let t1 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 1).unwrap();
        let a = reservation_id(&draft(), t1);
        let b = reservation_id(&draft(), t2);
        assert_eq!(a.len(), RESERVATION_ID_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_eq!(a, reservation_id(&draft(), t1));
    }

    #[test]
    fn placeholder_hash_needs_migration() {
        let mut r = reservation();
        assert!(!r.needs_password_migration());
        r.password_hash = PLACEHOLDER_PASSWORD_HASH.into();
        assert!(r.needs_password_migration());
    }

    #[test]
    fn filter_matches_optional_fields() {
        let r = reservation();
        assert!(ReservationFilter::default().matches(&r));
        let by_floor = ReservationFilter {
            floor: Some("6F".into()),
            ..Default::default()
        };
        assert!(by_floor.matches(&r));
        let other_day = ReservationFilter {
            date: Some("2025-06-11".into()),
            ..Default::default()
        };
        assert!(!other_day.matches(&r));
        let upcoming = ReservationFilter {
            from_date: Some("2025-06-11".into()),
            ..Default::default()
        };
        assert!(!upcoming.matches(&r));
    }

    #[test]
    fn event_kind_serializes_snake_case() {
        let v = serde_json::to_value(EventKind::PasswordFail).unwrap();
        assert_eq!(v, "password_fail");
        assert!(EventKind::AdminFail.is_auth_failure());
        assert!(!EventKind::RoomChange.is_auth_failure());
    }
}
