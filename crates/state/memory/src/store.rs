use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;

use roombook_core::{
    OperationalEvent, Reservation, ReservationDraft, ReservationFilter, Room, RoomPatch,
};
use roombook_state::error::StateError;
use roombook_state::store::Datastore;

/// Operational events older than this, relative to the newest one, are dropped.
pub const EVENT_RETENTION_DAYS: i64 = 31;

/// In-memory [`Datastore`].
///
/// Rooms live in a [`DashMap`]. Reservations sit behind a single write lock
/// so that the overlap check and the write happen atomically, which closes
/// the check-then-write race for a single process.
#[derive(Debug, Default)]
pub struct MemoryDatastore {
    rooms: DashMap<String, Room>,
    reservations: RwLock<HashMap<String, Reservation>>,
    /// Kept in arrival order so expired entries come off the front.
    events: RwLock<VecDeque<OperationalEvent>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `rooms`.
    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let store = Self::new();
        for room in rooms {
            store.rooms.insert(room.id.clone(), room);
        }
        store
    }

    fn overlapping<'a>(
        map: &'a HashMap<String, Reservation>,
        floor: &'a str,
        date: &'a str,
        start: &'a str,
        end: &'a str,
        exclude_id: Option<&'a str>,
    ) -> impl Iterator<Item = &'a Reservation> + 'a {
        map.values().filter(move |r| {
            r.floor == floor
                && r.date == date
                && exclude_id != Some(r.id.as_str())
                && r.overlaps(start, end)
        })
    }
}

fn sort_reservations(list: &mut [Reservation]) {
    list.sort_by(|a, b| {
        (a.date.as_str(), a.start_time.as_str(), a.floor.as_str()).cmp(&(
            b.date.as_str(),
            b.start_time.as_str(),
            b.floor.as_str(),
        ))
    });
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn ping(&self) -> Result<(), StateError> {
        Ok(())
    }

    async fn list_rooms(&self, include_inactive: bool) -> Result<Vec<Room>, StateError> {
        let mut rooms: Vec<Room> = self
            .rooms
            .iter()
            .filter(|r| include_inactive || r.is_active)
            .map(|r| r.value().clone())
            .collect();
        rooms.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(rooms)
    }

    async fn get_room(&self, id: &str) -> Result<Option<Room>, StateError> {
        Ok(self.rooms.get(id).map(|r| r.value().clone()))
    }

    async fn insert_room(&self, room: &Room) -> Result<(), StateError> {
        match self.rooms.entry(room.id.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StateError::AlreadyExists(room.id.clone()))
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(room.clone());
                Ok(())
            }
        }
    }

    async fn update_room(&self, id: &str, patch: &RoomPatch) -> Result<Option<Room>, StateError> {
        let Some(mut room) = self.rooms.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            name.clone_into(&mut room.name);
        }
        if let Some(active) = patch.is_active {
            room.is_active = active;
        }
        Ok(Some(room.clone()))
    }

    async fn delete_room(&self, id: &str) -> Result<bool, StateError> {
        Ok(self.rooms.remove(id).is_some())
    }

    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, StateError> {
        let mut list: Vec<Reservation> = self
            .reservations
            .read()
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_reservations(&mut list);
        Ok(list)
    }

    async fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, StateError> {
        Ok(self.reservations.read().get(id).cloned())
    }

    async fn find_overlapping(
        &self,
        floor: &str,
        date: &str,
        start: &str,
        end: &str,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Reservation>, StateError> {
        let map = self.reservations.read();
        let mut hits: Vec<Reservation> =
            Self::overlapping(&map, floor, date, start, end, exclude_id)
                .cloned()
                .collect();
        sort_reservations(&mut hits);
        Ok(hits)
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> Result<(), StateError> {
        let mut map = self.reservations.write();
        if map.contains_key(&reservation.id) {
            return Err(StateError::AlreadyExists(reservation.id.clone()));
        }
        if let Some(existing) = Self::overlapping(
            &map,
            &reservation.floor,
            &reservation.date,
            &reservation.start_time,
            &reservation.end_time,
            None,
        )
        .next()
        {
            return Err(StateError::Conflict(existing.id.clone()));
        }
        map.insert(reservation.id.clone(), reservation.clone());
        Ok(())
    }

    async fn update_reservation(
        &self,
        id: &str,
        draft: &ReservationDraft,
    ) -> Result<Option<Reservation>, StateError> {
        let mut map = self.reservations.write();
        if !map.contains_key(id) {
            return Ok(None);
        }
        if let Some(existing) = Self::overlapping(
            &map,
            &draft.floor,
            &draft.date,
            &draft.start_time,
            &draft.end_time,
            Some(id),
        )
        .next()
        {
            return Err(StateError::Conflict(existing.id.clone()));
        }
        let Some(row) = map.get_mut(id) else {
            return Ok(None);
        };
        draft.date.clone_into(&mut row.date);
        draft.floor.clone_into(&mut row.floor);
        draft.start_time.clone_into(&mut row.start_time);
        draft.end_time.clone_into(&mut row.end_time);
        draft.team_name.clone_into(&mut row.team_name);
        draft.user_name.clone_into(&mut row.user_name);
        Ok(Some(row.clone()))
    }

    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StateError> {
        let mut map = self.reservations.write();
        Ok(map.get_mut(id).is_some_and(|row| {
            password_hash.clone_into(&mut row.password_hash);
            true
        }))
    }

    async fn delete_reservation(&self, id: &str) -> Result<bool, StateError> {
        Ok(self.reservations.write().remove(id).is_some())
    }

    async fn count_placeholder_hashes(&self) -> Result<usize, StateError> {
        Ok(self
            .reservations
            .read()
            .values()
            .filter(|r| r.needs_password_migration())
            .count())
    }

    async fn record_event(&self, event: &OperationalEvent) -> Result<(), StateError> {
        let cutoff = event.created_at - Duration::days(EVENT_RETENTION_DAYS);
        let mut events = self.events.write();
        events.push_back(event.clone());
        while events.front().is_some_and(|e| e.created_at < cutoff) {
            events.pop_front();
        }
        Ok(())
    }

    async fn list_events_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OperationalEvent>, StateError> {
        let mut events: Vec<OperationalEvent> = self
            .events
            .read()
            .iter()
            .filter(|e| e.created_at >= since)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }
}
