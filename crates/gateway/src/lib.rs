//! RoomBook gateway core.
//!
//! Turns an accepted request into a reply: the action policy, backend
//! selection between the legacy forwarder and the managed datastore, the
//! business rules of the managed path, and admin authorization.

pub mod admin;
pub mod analytics;
pub mod builder;
pub mod clock;
pub mod error;
pub mod gateway;
pub mod legacy;
pub mod managed;
pub mod messages;
pub mod metrics;
pub mod request;
pub mod router;
pub mod store;

pub use admin::AdminAuthority;
pub use builder::GatewayBuilder;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{GatewayError, UPSTREAM_FAILED};
pub use gateway::{Gateway, parse_post_body};
pub use legacy::{LegacyConfig, LegacyForwarder, SHARED_SECRET_FIELD};
pub use managed::{ManagedSettings, ManagedStore, ReportSettings};
pub use metrics::{GatewayMetrics, MetricsSnapshot};
pub use request::{GatewayRequest, GatewayResponse, ResponseBody};
pub use router::{Backend, RoutingFlags, route};
pub use store::ReservationStore;
