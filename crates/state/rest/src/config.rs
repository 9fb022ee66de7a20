use std::time::Duration;

use secrecy::SecretString;

/// Connection settings for [`RestDatastore`](crate::RestDatastore).
#[derive(Debug, Clone)]
pub struct RestDatastoreConfig {
    /// Project base URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Service-role key sent as `apikey` and `Authorization: Bearer`.
    pub service_key: SecretString,
    /// Path prefix of the REST API.
    pub rest_path: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl RestDatastoreConfig {
    pub fn new(url: impl Into<String>, service_key: SecretString) -> Self {
        Self {
            url: url.into(),
            service_key,
            rest_path: "rest/v1".to_owned(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
