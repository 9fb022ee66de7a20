use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response envelope shared by the gateway and the legacy backend.
///
/// `{success, data?, error?, token?}`. Business-rule rejections are carried
/// here with `success: false` and HTTP 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Reply {
    /// Success without payload.
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            token: None,
        }
    }

    /// Success carrying `data`.
    pub fn data(data: impl Serialize) -> Self {
        Self {
            data: Some(serde_json::to_value(data).unwrap_or(Value::Null)),
            ..Self::ok()
        }
    }

    /// Success carrying a freshly issued token.
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::ok()
        }
    }

    /// Business failure with a human-readable message. Never carries a token.
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            token: None,
        }
    }

    pub fn with_data(mut self, data: impl Serialize) -> Self {
        self.data = Some(serde_json::to_value(data).unwrap_or(Value::Null));
        self
    }
}
