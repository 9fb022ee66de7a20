use roombook_core::{GatewayAction, Params, Reply, Verb};
use serde_json::Value;

/// A request that has passed the action policy.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub verb: Verb,
    pub action: GatewayAction,
    /// Query parameters (GET) or body fields (POST).
    pub params: Params,
    /// Raw decoded query pairs for GET, in arrival order. Repeated keys are
    /// kept so they can be forwarded verbatim.
    pub query_pairs: Vec<(String, String)>,
    pub client_ip: String,
}

impl GatewayRequest {
    pub fn get(
        action: GatewayAction,
        query_pairs: Vec<(String, String)>,
        client_ip: impl Into<String>,
    ) -> Self {
        let params = Params::from_pairs(query_pairs.iter().cloned());
        Self {
            verb: Verb::Get,
            action,
            params,
            query_pairs,
            client_ip: client_ip.into(),
        }
    }

    pub fn post(action: GatewayAction, params: Params, client_ip: impl Into<String>) -> Self {
        Self {
            verb: Verb::Post,
            action,
            params,
            query_pairs: Vec::new(),
            client_ip: client_ip.into(),
        }
    }

    /// Trimmed, non-empty text value of `key`.
    pub fn text(&self, key: &str) -> Option<String> {
        self.params.text(key)
    }
}

/// Response body as it will be written to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    /// A non-JSON legacy body relayed unmodified.
    Raw {
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: ResponseBody,
}

impl GatewayResponse {
    /// HTTP 200 carrying a reply envelope.
    pub fn reply(reply: &Reply) -> Self {
        Self {
            status: 200,
            body: ResponseBody::Json(serde_json::to_value(reply).unwrap_or(Value::Null)),
        }
    }

    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            body: ResponseBody::Json(value),
        }
    }

    /// Parse the body as a reply envelope, if it is one.
    pub fn as_reply(&self) -> Option<Reply> {
        match &self.body {
            ResponseBody::Json(v) => serde_json::from_value(v.clone()).ok(),
            ResponseBody::Raw { .. } => None,
        }
    }
}
