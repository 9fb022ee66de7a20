use async_trait::async_trait;

use crate::error::GatewayError;
use crate::request::{GatewayRequest, GatewayResponse};

/// A backend able to serve policy-checked gateway requests.
///
/// Two implementations exist: [`LegacyForwarder`](crate::LegacyForwarder)
/// relays to the legacy endpoint and [`ManagedStore`](crate::ManagedStore)
/// applies business rules against the managed datastore. Which one serves a
/// request is decided by [`route`](crate::router::route).
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError>;
}
