use roombook_crypto::SecretString;
use serde::Deserialize;

/// The legacy remote-procedure endpoint.
#[derive(Debug, Deserialize)]
pub struct LegacyBackendConfig {
    /// Endpoint URL. Every request fails with a misconfiguration error when unset.
    pub url: Option<String>,
    /// Injected as `proxySecret` into every forwarded request.
    pub shared_secret: Option<SecretString>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Extra attempts for GET requests answered with a 5xx status.
    #[serde(default = "default_get_retries")]
    pub get_retries: u32,
}

impl Default for LegacyBackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            shared_secret: None,
            timeout_seconds: default_timeout(),
            get_retries: default_get_retries(),
        }
    }
}

/// Which managed datastore implementation to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreBackend {
    /// PostgREST-style HTTP API. Disabled while `url` is unset.
    #[default]
    Rest,
    /// In-process store, seeded from `rooms`. Single instance only.
    Memory,
}

/// A room created at startup by the memory backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedRoom {
    pub floor: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// The managed datastore.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub backend: DatastoreBackend,
    /// Project base URL for the REST backend.
    pub url: Option<String>,
    /// Service key for the REST backend.
    pub service_key: Option<SecretString>,
    #[serde(default = "default_rest_path")]
    pub rest_path: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub rooms: Vec<SeedRoom>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: DatastoreBackend::default(),
            url: None,
            service_key: None,
            rest_path: default_rest_path(),
            timeout_seconds: default_timeout(),
            rooms: Vec::new(),
        }
    }
}

/// Managed-path switches.
#[derive(Debug, Default, Deserialize)]
pub struct FeatureConfig {
    /// Serve reads and operational actions from the managed datastore.
    #[serde(default)]
    pub read_enabled: bool,
    /// Serve writes from the managed datastore.
    #[serde(default)]
    pub write_enabled: bool,
    /// Refuse legacy password checks for unmigrated reservations.
    #[serde(default)]
    pub strict_password_hash: bool,
}

/// Credential material. All optional; missing values disable what needs them.
#[derive(Debug, Default, Deserialize)]
pub struct SecurityConfig {
    /// HMAC key for reservation and admin tokens.
    pub signing_secret: Option<SecretString>,
    pub password_pepper: Option<SecretString>,
    /// Local admin code. When set, admin rights never fall back to legacy.
    pub admin_code: Option<SecretString>,
}

/// Operational report delivery.
#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Auth failures per hour that raise a security alert. Zero disables.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: u64,
    /// Offset from UTC, in hours, for daily buckets.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            recipients: Vec::new(),
            alert_threshold: default_alert_threshold(),
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_get_retries() -> u32 {
    1
}

fn default_rest_path() -> String {
    "rest/v1".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_alert_threshold() -> u64 {
    5
}

fn default_utc_offset_hours() -> i32 {
    9
}
