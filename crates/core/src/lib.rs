//! Domain types for the room reservation gateway.
//!
//! Holds the action set and its policy validator, the reservation and room
//! model with its client wire labels, and the pure date/time/interval checks
//! shared by every backend.

pub mod action;
pub mod model;
pub mod params;
pub mod policy;
pub mod reply;
pub mod validation;

pub use action::{GET_ACTIONS, GatewayAction, POST_ACTIONS, UnknownAction, Verb};
pub use model::{
    EventKind, OperationalEvent, PLACEHOLDER_PASSWORD_HASH, Reservation, ReservationDraft,
    ReservationFilter, ReservationView, Room, RoomPatch, RoomView, reservation_id,
};
pub use params::Params;
pub use policy::{PolicyViolation, validate_get, validate_post};
pub use reply::Reply;
pub use validation::{
    ValidationError, intervals_overlap, normalize_floor, validate_date, validate_draft,
    validate_password_format, validate_time,
};
