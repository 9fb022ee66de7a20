//! Managed datastore reached over a PostgREST-style REST API.
//!
//! Tables: `rooms`, `reservations`, `operational_events`. Requests carry the
//! service key both as `apikey` and as a bearer token.

mod config;
mod store;

pub use config::RestDatastoreConfig;
pub use store::RestDatastore;
