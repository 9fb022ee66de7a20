//! Credential primitives for the RoomBook gateway.
//!
//! [`TokenCodec`] issues and verifies the two short-lived bearer tokens
//! (reservation-edit and admin-session). [`PasswordHasher`] produces and
//! checks the peppered hashes stored with each reservation.
//!
//! Secrets are carried as [`SecretString`] so they never show up in logs.

mod password;
mod token;

use subtle::ConstantTimeEq;

pub use password::PasswordHasher;
// Re-export for consumers so they don't need a direct `secrecy` dependency.
pub use secrecy::{ExposeSecret, SecretString};
pub use token::{ADMIN_TOKEN_TTL_SECS, RESERVATION_TOKEN_TTL_SECS, TokenCodec, TokenError};

/// Constant-time string equality. Length differences return `false`.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
