use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::debug;

use roombook_gateway::{GatewayResponse, ResponseBody};

use super::AppState;
use crate::error::ServerError;

/// The single gateway endpoint.
///
/// Checks run in a fixed order: configuration, method, rate limit, then the
/// gateway's own policy check. A request rejected early never reaches a
/// backend.
pub async fn gateway(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, ServerError> {
    state.gateway.ensure_configured()?;

    let method = request.method().clone();
    if method != Method::GET && method != Method::POST {
        return Err(ServerError::MethodNotAllowed);
    }

    let client_ip = client_address(request.headers(), request.extensions().get());

    if let Some(limiter) = &state.rate_limiter {
        let verdict = limiter.check(&client_ip, method.as_str()).await;
        if !verdict.allowed {
            state.gateway.metrics().increment_throttled();
            debug!(%client_ip, %method, "request throttled");
            return Err(ServerError::RateLimited {
                retry_after: verdict.retry_after.unwrap_or(1),
            });
        }
    }

    let response = if method == Method::GET {
        let pairs = request
            .uri()
            .query()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default();
        state.gateway.handle_get(pairs, &client_ip).await?
    } else {
        let body = axum::body::to_bytes(request.into_body(), state.max_body_bytes)
            .await
            .map_err(|_| ServerError::PayloadTooLarge)?;
        state.gateway.handle_post(&body, &client_ip).await?
    };

    Ok(into_http(response))
}

/// First `X-Forwarded-For` entry, else the socket peer, else `unknown`.
pub fn client_address(headers: &HeaderMap, peer: Option<&ConnectInfo<SocketAddr>>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(first) = forwarded {
        return first.to_owned();
    }
    peer.map_or_else(|| "unknown".to_owned(), |ConnectInfo(addr)| addr.ip().to_string())
}

fn into_http(response: GatewayResponse) -> Response {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    match response.body {
        ResponseBody::Json(value) => (status, axum::Json(value)).into_response(),
        ResponseBody::Raw {
            content_type,
            bytes,
        } => {
            let mut http = (status, Body::from(bytes)).into_response();
            if let Some(value) = content_type.and_then(|ct| HeaderValue::from_str(&ct).ok()) {
                http.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            http
        }
    }
}
