use serde::Deserialize;

/// What to do when the counter store fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitErrorBehavior {
    /// Fail open: let the request through.
    #[default]
    Allow,
    /// Fail closed: reject with 429.
    Deny,
}

/// Fixed-window limit per `(client address, method)`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Requests allowed per window; the next one is rejected.
    #[serde(default = "default_max_requests")]
    pub max_requests: u64,
    #[serde(default = "default_window")]
    pub window_seconds: u64,
    #[serde(default)]
    pub on_error: RateLimitErrorBehavior,
    /// How often expired buckets are dropped.
    #[serde(default = "default_prune_interval")]
    pub prune_interval_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_requests: default_max_requests(),
            window_seconds: default_window(),
            on_error: RateLimitErrorBehavior::default(),
            prune_interval_seconds: default_prune_interval(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_max_requests() -> u64 {
    60
}

fn default_window() -> u64 {
    60
}

fn default_prune_interval() -> u64 {
    300
}
