use std::sync::Arc;

use roombook_core::{
    EventKind, GatewayAction, Params, PolicyViolation, Reply, validate_get, validate_post,
};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::admin::AdminAuthority;
use crate::error::GatewayError;
use crate::legacy::LegacyForwarder;
use crate::managed::ManagedStore;
use crate::metrics::GatewayMetrics;
use crate::request::{GatewayRequest, GatewayResponse};
use crate::router::{Backend, RoutingFlags, route};
use crate::store::ReservationStore;

/// The reservation gateway.
///
/// Validates each request against the action policy, picks a backend with
/// [`route`], and executes it there. HTTP concerns (method guard, rate
/// limiting, client address) belong to the caller, which is also expected
/// to call [`ensure_configured`](Self::ensure_configured) before anything
/// else.
#[derive(Debug)]
pub struct Gateway {
    pub(crate) legacy: Arc<LegacyForwarder>,
    pub(crate) managed: Option<Arc<ManagedStore>>,
    pub(crate) admin: Arc<AdminAuthority>,
    pub(crate) flags: RoutingFlags,
    pub(crate) metrics: Arc<GatewayMetrics>,
}

/// Decode a POST body into its field map.
///
/// Accepts a JSON object or a JSON string that itself holds an object, which
/// is what some clients send when they serialise twice.
pub fn parse_post_body(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body).ok()? {
        Value::Object(map) => Some(map),
        Value::String(inner) => match serde_json::from_str::<Value>(&inner).ok()? {
            Value::Object(map) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

impl Gateway {
    /// Fails with a misconfiguration error when the legacy URL is missing.
    ///
    /// The legacy backend stays the fallback for every action, so the gateway
    /// refuses to serve anything without it.
    pub fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.legacy.is_configured() {
            Ok(())
        } else {
            Err(GatewayError::Misconfiguration(
                "legacy backend URL is not set.".to_owned(),
            ))
        }
    }

    pub fn metrics(&self) -> &Arc<GatewayMetrics> {
        &self.metrics
    }

    pub fn flags(&self) -> RoutingFlags {
        self.flags
    }

    pub fn managed(&self) -> Option<&Arc<ManagedStore>> {
        self.managed.as_ref()
    }

    /// Handle a GET with its decoded query pairs.
    pub async fn handle_get(
        &self,
        query_pairs: Vec<(String, String)>,
        client_ip: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let params = Params::from_pairs(query_pairs.iter().cloned());
        let action_name = params.text("action").unwrap_or_default();
        let action = self.check(validate_get(&action_name, &params))?;
        self.dispatch(GatewayRequest::get(action, query_pairs, client_ip))
            .await
    }

    /// Handle a POST with its raw body.
    pub async fn handle_post(
        &self,
        body: &[u8],
        client_ip: &str,
    ) -> Result<GatewayResponse, GatewayError> {
        let Some(fields) = parse_post_body(body) else {
            return Err(self.reject(PolicyViolation::MissingAction));
        };
        let params = Params::from_object(fields);
        let action_name = params.text("action").unwrap_or_default();
        let action = self.check(validate_post(&action_name, &params))?;
        self.dispatch(GatewayRequest::post(action, params, client_ip))
            .await
    }

    fn check(
        &self,
        verdict: Result<GatewayAction, PolicyViolation>,
    ) -> Result<GatewayAction, GatewayError> {
        verdict.map_err(|violation| self.reject(violation))
    }

    fn reject(&self, violation: PolicyViolation) -> GatewayError {
        self.metrics.increment_policy_rejections();
        debug!(%violation, "request rejected by action policy");
        GatewayError::Policy(violation)
    }

    /// Route an accepted request and execute it.
    #[instrument(
        name = "gateway.dispatch",
        skip_all,
        fields(verb = %request.verb, action = %request.action, backend)
    )]
    pub async fn dispatch(&self, request: GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        self.metrics.increment_requests();

        let mut backend = route(request.action, self.flags, &request.params);
        if backend == Backend::Managed && self.managed.is_none() {
            backend = Backend::Legacy;
        }
        tracing::Span::current().record("backend", tracing::field::debug(backend));

        let result = match backend {
            Backend::Local => {
                self.metrics.increment_local_calls();
                self.exchange_admin_code(&request).await
            }
            Backend::Managed => {
                self.metrics.increment_managed_calls();
                match &self.managed {
                    Some(store) => {
                        debug!(store = store.name(), "executing");
                        store.execute(&request).await
                    }
                    None => self.legacy.execute(&request).await,
                }
            }
            Backend::Legacy => {
                self.metrics.increment_legacy_forwards();
                debug!(store = self.legacy.name(), "executing");
                self.legacy.execute(&request).await
            }
        };

        match &result {
            Ok(response) => {
                if response.as_reply().is_some_and(|r| !r.success) {
                    self.metrics.increment_business_failures();
                }
            }
            Err(e) if e.status() == 502 => {
                self.metrics.increment_transport_errors();
                warn!(error = %e, "backend call failed");
            }
            Err(e) => warn!(error = %e, "request failed"),
        }
        result
    }

    async fn exchange_admin_code(
        &self,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, GatewayError> {
        let code = request.text("code").unwrap_or_default();
        let Some(result) = self.admin.exchange_code(&code) else {
            return self.legacy.execute(request).await;
        };
        let reply: Reply = result?;
        if !reply.success
            && let Some(store) = &self.managed
        {
            store.record(EventKind::AdminFail, &request.client_ip).await;
        }
        Ok(GatewayResponse::reply(&reply))
    }
}
