use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use roombook_core::{Reply, Verb};
use roombook_crypto::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::GatewayError;
use crate::request::{GatewayRequest, GatewayResponse, ResponseBody};
use crate::store::ReservationStore;

/// Field carrying the shared secret to the legacy backend.
pub const SHARED_SECRET_FIELD: &str = "proxySecret";

const POST_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Settings for [`LegacyForwarder`].
#[derive(Debug, Clone)]
pub struct LegacyConfig {
    /// Legacy endpoint URL. Requests fail with a misconfiguration error when unset.
    pub url: Option<String>,
    /// Injected as `proxySecret` into every forwarded request when set.
    pub shared_secret: Option<SecretString>,
    pub timeout: Duration,
    /// Extra attempts for GET requests answered with a 5xx status.
    pub get_retries: u32,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            url: None,
            shared_secret: None,
            timeout: Duration::from_secs(10),
            get_retries: 1,
        }
    }
}

/// Relays requests to the legacy remote-procedure endpoint.
#[derive(Debug)]
pub struct LegacyForwarder {
    client: reqwest::Client,
    url: Option<String>,
    shared_secret: Option<SecretString>,
    get_retries: u32,
}

impl LegacyForwarder {
    pub fn new(config: &LegacyConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Misconfiguration(e.to_string()))?;
        let url = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_owned);
        let shared_secret = config
            .shared_secret
            .clone()
            .filter(|s| !s.expose_secret().is_empty());
        Ok(Self {
            client,
            url,
            shared_secret,
            get_retries: config.get_retries,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    fn endpoint(&self) -> Result<Url, GatewayError> {
        let raw = self.url.as_deref().ok_or_else(|| {
            GatewayError::Misconfiguration("legacy backend URL is not set.".to_owned())
        })?;
        Url::parse(raw)
            .map_err(|e| GatewayError::Misconfiguration(format!("legacy backend URL: {e}")))
    }

    /// Forward a GET with every query pair copied over.
    #[instrument(name = "legacy.get", skip_all)]
    pub async fn forward_get(
        &self,
        pairs: &[(String, String)],
    ) -> Result<GatewayResponse, GatewayError> {
        let mut url = self.endpoint()?;
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in pairs {
                if k == SHARED_SECRET_FIELD {
                    continue;
                }
                query.append_pair(k, v);
            }
            if let Some(secret) = &self.shared_secret {
                query.append_pair(SHARED_SECRET_FIELD, secret.expose_secret());
            }
        }

        let mut attempt = 0;
        loop {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|e| GatewayError::Transport(e.to_string()))?;
            if resp.status().is_server_error() && attempt < self.get_retries {
                attempt += 1;
                warn!(status = %resp.status(), attempt, "legacy GET failed, retrying");
                continue;
            }
            return Self::relay(resp).await;
        }
    }

    /// Forward a POST. The body is re-serialised as JSON and sent as text.
    #[instrument(name = "legacy.post", skip_all)]
    pub async fn forward_post(
        &self,
        mut body: Map<String, Value>,
    ) -> Result<GatewayResponse, GatewayError> {
        let url = self.endpoint()?;
        body.remove(SHARED_SECRET_FIELD);
        if let Some(secret) = &self.shared_secret {
            body.insert(
                SHARED_SECRET_FIELD.to_owned(),
                Value::String(secret.expose_secret().clone()),
            );
        }
        let payload = serde_json::to_string(&body)
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, POST_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Self::relay(resp).await
    }

    /// Call the legacy backend and require a reply envelope back.
    pub async fn call(
        &self,
        verb: Verb,
        fields: Vec<(String, String)>,
    ) -> Result<Reply, GatewayError> {
        let response = match verb {
            Verb::Get => self.forward_get(&fields).await?,
            Verb::Post => {
                let body = fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                self.forward_post(body).await?
            }
        };
        response
            .as_reply()
            .ok_or_else(|| GatewayError::Transport("legacy backend returned no reply".to_owned()))
    }

    async fn relay(resp: reqwest::Response) -> Result<GatewayResponse, GatewayError> {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        debug!(status = %status, len = bytes.len(), "legacy response");

        let body = match serde_json::from_slice::<Value>(&bytes) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw {
                content_type,
                bytes: bytes.to_vec(),
            },
        };
        Ok(GatewayResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ReservationStore for LegacyForwarder {
    fn name(&self) -> &'static str {
        "legacy"
    }

    async fn execute(&self, request: &GatewayRequest) -> Result<GatewayResponse, GatewayError> {
        match request.verb {
            Verb::Get => self.forward_get(&request.query_pairs).await,
            Verb::Post => self.forward_post(request.params.as_object().clone()).await,
        }
    }
}
