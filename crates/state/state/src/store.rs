use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use roombook_core::{
    OperationalEvent, Reservation, ReservationDraft, ReservationFilter, Room, RoomPatch,
};

use crate::error::StateError;

/// Access to the managed reservation database.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Reservation writes must enforce the no-overlap invariant themselves and
/// report [`StateError::Conflict`] when a concurrent write won the slot.
#[async_trait]
pub trait Datastore: Send + Sync + fmt::Debug {
    /// Cheap reachability probe.
    async fn ping(&self) -> Result<(), StateError>;

    /// Rooms ordered by id. Inactive rooms only when `include_inactive`.
    async fn list_rooms(&self, include_inactive: bool) -> Result<Vec<Room>, StateError>;

    async fn get_room(&self, id: &str) -> Result<Option<Room>, StateError>;

    /// Insert a room. [`StateError::AlreadyExists`] when the id is taken.
    async fn insert_room(&self, room: &Room) -> Result<(), StateError>;

    /// Apply a partial update. Returns the updated row, or `None` if missing.
    async fn update_room(&self, id: &str, patch: &RoomPatch) -> Result<Option<Room>, StateError>;

    /// Hard delete. Existing reservations are left untouched.
    async fn delete_room(&self, id: &str) -> Result<bool, StateError>;

    /// Reservations matching `filter`, ordered by date then start time.
    async fn list_reservations(
        &self,
        filter: &ReservationFilter,
    ) -> Result<Vec<Reservation>, StateError>;

    async fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, StateError>;

    /// Reservations on `floor`/`date` whose interval overlaps `[start, end)`,
    /// excluding `exclude_id` when given.
    async fn find_overlapping(
        &self,
        floor: &str,
        date: &str,
        start: &str,
        end: &str,
        exclude_id: Option<&str>,
    ) -> Result<Vec<Reservation>, StateError>;

    /// Insert a reservation. [`StateError::Conflict`] on overlap.
    async fn insert_reservation(&self, reservation: &Reservation) -> Result<(), StateError>;

    /// Overwrite the mutable fields of a reservation.
    ///
    /// Returns `None` if the id is unknown, [`StateError::Conflict`] on overlap
    /// with any other reservation.
    async fn update_reservation(
        &self,
        id: &str,
        draft: &ReservationDraft,
    ) -> Result<Option<Reservation>, StateError>;

    /// Replace the stored password hash. Returns `false` if the id is unknown.
    async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<bool, StateError>;

    async fn delete_reservation(&self, id: &str) -> Result<bool, StateError>;

    /// Number of reservations still carrying the migration placeholder hash.
    async fn count_placeholder_hashes(&self) -> Result<usize, StateError>;

    /// Append an operational event.
    async fn record_event(&self, event: &OperationalEvent) -> Result<(), StateError>;

    /// Events created at or after `since`, oldest first.
    async fn list_events_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<OperationalEvent>, StateError>;
}
