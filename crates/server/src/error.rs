use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Client message for a throttled request.
pub const TOO_MANY_REQUESTS: &str = "요청이 너무 많습니다. 잠시 후 다시 시도해주세요.";

/// Client message for a method other than GET or POST.
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed.";

/// Errors that can occur when running the RoomBook server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// An I/O error (e.g. binding the listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A gateway-level error surfaced through the API.
    #[error("gateway error: {0}")]
    Gateway(#[from] roombook_gateway::GatewayError),

    /// Only GET and POST are served.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Rate limit exceeded.
    #[error("rate limit exceeded")]
    RateLimited {
        /// Seconds until the caller can retry.
        retry_after: u64,
    },

    /// The request body exceeded the configured limit.
    #[error("payload too large")]
    PayloadTooLarge,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Server misconfiguration: {msg}"),
            ),
            Self::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                roombook_gateway::UPSTREAM_FAILED.to_owned(),
            ),
            Self::Gateway(e) => (
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                e.public_message(),
            ),
            Self::MethodNotAllowed => (StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED.to_owned()),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, TOO_MANY_REQUESTS.to_owned()),
            Self::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body too large.".to_owned(),
            ),
        };

        let body = serde_json::json!({ "success": false, "error": message });
        let mut response = (status, axum::Json(body)).into_response();

        match self {
            Self::RateLimited { retry_after } => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, retry_after.into());
            }
            Self::MethodNotAllowed => {
                response
                    .headers_mut()
                    .insert(header::ALLOW, HeaderValue::from_static("GET, POST"));
            }
            _ => {}
        }

        response
    }
}
