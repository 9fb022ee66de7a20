mod backends;
mod server;

#[cfg(test)]
mod tests;

pub use backends::*;
pub use server::*;

use std::path::Path;

use roombook_crypto::SecretString;
use serde::Deserialize;
use tracing::info;

pub use crate::ratelimit::{RateLimitConfig, RateLimitErrorBehavior};
use crate::error::ServerError;

/// Top-level configuration for the RoomBook server, loaded from a TOML file
/// and then overridden from `ROOMBOOK_*` environment variables.
#[derive(Debug, Default, Deserialize)]
pub struct RoomBookConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub legacy: LegacyBackendConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RoomBookConfig {
    /// Read `path`, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        if !path.exists() {
            info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `ROOMBOOK_*` overrides from the process environment.
    pub fn apply_process_env(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply `ROOMBOOK_*` overrides from `lookup`. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let secret = |key: &str| get(key).map(SecretString::new);
        let flag = |key: &str| get(key).map(|v| parse_flag(&v));

        if let Some(v) = get("ROOMBOOK_LEGACY_URL") {
            self.legacy.url = Some(v);
        }
        if let Some(v) = secret("ROOMBOOK_LEGACY_SHARED_SECRET") {
            self.legacy.shared_secret = Some(v);
        }
        if let Some(v) = get("ROOMBOOK_DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Some(v) = secret("ROOMBOOK_DATABASE_SERVICE_KEY") {
            self.database.service_key = Some(v);
        }
        if let Some(v) = flag("ROOMBOOK_DB_READ_ENABLED") {
            self.features.read_enabled = v;
        }
        if let Some(v) = flag("ROOMBOOK_DB_WRITE_ENABLED") {
            self.features.write_enabled = v;
        }
        if let Some(v) = flag("ROOMBOOK_STRICT_PASSWORD_HASH") {
            self.features.strict_password_hash = v;
        }
        if let Some(v) = secret("ROOMBOOK_SIGNING_SECRET") {
            self.security.signing_secret = Some(v);
        }
        if let Some(v) = secret("ROOMBOOK_PASSWORD_PEPPER") {
            self.security.password_pepper = Some(v);
        }
        if let Some(v) = secret("ROOMBOOK_ADMIN_CODE") {
            self.security.admin_code = Some(v);
        }
        if let Some(v) = get("ROOMBOOK_REPORT_WEBHOOK_URL") {
            self.report.webhook_url = Some(v);
        }
        if let Some(v) = get("ROOMBOOK_REPORT_RECIPIENTS") {
            self.report.recipients = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
        }
    }
}

/// `1/true/yes/on` (any case) are true; everything else is false.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
