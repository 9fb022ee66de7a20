pub mod gateway;
pub mod health;

use std::sync::Arc;

use axum::Router;
use axum::routing::{any, get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use roombook_gateway::Gateway;

use crate::ratelimit::RateLimiter;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Optional rate limiter (None when rate limiting is disabled).
    pub rate_limiter: Option<Arc<RateLimiter>>,
    /// Largest POST body read before answering 413.
    pub max_body_bytes: usize,
}

/// Build the Axum router.
///
/// `/api/proxy` is the path browser clients use; it is the same handler as
/// `/gateway`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/gateway", any(gateway::gateway))
        .route("/api/proxy", any(gateway::gateway))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
