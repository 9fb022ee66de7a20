use std::sync::Arc;

use roombook_crypto::{PasswordHasher, SecretString, TokenCodec};
use roombook_state::Datastore;

use crate::admin::AdminAuthority;
use crate::clock::{Clock, SystemClock};
use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::legacy::{LegacyConfig, LegacyForwarder};
use crate::managed::{ManagedSettings, ManagedStore, ReportSettings};
use crate::metrics::GatewayMetrics;
use crate::router::RoutingFlags;

/// Fluent builder for a [`Gateway`].
///
/// Nothing is required: a gateway without a legacy URL builds fine and
/// answers every request with a misconfiguration error, and one without a
/// datastore forwards everything to the legacy backend.
pub struct GatewayBuilder {
    legacy: LegacyConfig,
    datastore: Option<Arc<dyn Datastore>>,
    signing_secret: Option<SecretString>,
    password_pepper: Option<SecretString>,
    admin_code: Option<SecretString>,
    read_enabled: bool,
    write_enabled: bool,
    managed: ManagedSettings,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<Arc<GatewayMetrics>>,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            legacy: LegacyConfig::default(),
            datastore: None,
            signing_secret: None,
            password_pepper: None,
            admin_code: None,
            read_enabled: false,
            write_enabled: false,
            managed: ManagedSettings::default(),
            clock: None,
            metrics: None,
        }
    }

    #[must_use]
    pub fn legacy(mut self, config: LegacyConfig) -> Self {
        self.legacy = config;
        self
    }

    /// Set the managed datastore. Without one, every action goes to legacy.
    #[must_use]
    pub fn datastore(mut self, store: Arc<dyn Datastore>) -> Self {
        self.datastore = Some(store);
        self
    }

    /// HMAC key for reservation and admin tokens.
    #[must_use]
    pub fn signing_secret(mut self, secret: SecretString) -> Self {
        self.signing_secret = Some(secret);
        self
    }

    #[must_use]
    pub fn password_pepper(mut self, pepper: SecretString) -> Self {
        self.password_pepper = Some(pepper);
        self
    }

    /// Local admin code. When set, admin rights are decided locally.
    #[must_use]
    pub fn admin_code(mut self, code: SecretString) -> Self {
        self.admin_code = Some(code);
        self
    }

    #[must_use]
    pub fn read_enabled(mut self, enabled: bool) -> Self {
        self.read_enabled = enabled;
        self
    }

    #[must_use]
    pub fn write_enabled(mut self, enabled: bool) -> Self {
        self.write_enabled = enabled;
        self
    }

    #[must_use]
    pub fn strict_password_hash(mut self, strict: bool) -> Self {
        self.managed.strict_password_hash = strict;
        self
    }

    #[must_use]
    pub fn report(mut self, settings: ReportSettings) -> Self {
        self.managed.report = settings;
        self
    }

    /// Override the time source. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share a metrics instance, e.g. with the HTTP layer's rate limiter.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<GatewayMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn build(self) -> Result<Gateway, GatewayError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let legacy = Arc::new(LegacyForwarder::new(&self.legacy)?);
        let codec = TokenCodec::new(self.signing_secret.as_ref());
        let admin = Arc::new(AdminAuthority::new(
            codec.clone(),
            self.admin_code,
            Arc::clone(&legacy),
            Arc::clone(&clock),
        ));

        let managed = match self.datastore {
            Some(db) => Some(Arc::new(ManagedStore::new(
                db,
                codec,
                PasswordHasher::new(
                    self.password_pepper
                        .unwrap_or_else(|| SecretString::new(String::new())),
                ),
                Arc::clone(&admin),
                Arc::clone(&legacy),
                clock,
                self.managed,
            )?)),
            None => None,
        };

        let flags = RoutingFlags {
            db_configured: managed.is_some(),
            read_enabled: self.read_enabled,
            write_enabled: self.write_enabled,
            local_admin: admin.is_local(),
        };

        Ok(Gateway {
            legacy,
            managed,
            admin,
            flags,
            metrics: self.metrics.unwrap_or_default(),
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use roombook_state_memory::MemoryDatastore;

    use super::*;

    #[test]
    fn flags_follow_configuration() {
        let gw = GatewayBuilder::new()
            .read_enabled(true)
            .write_enabled(true)
            .build()
            .unwrap();
        assert_eq!(
            gw.flags(),
            RoutingFlags {
                db_configured: false,
                read_enabled: true,
                write_enabled: true,
                local_admin: false,
            }
        );
        assert!(gw.managed().is_none());

        let gw = GatewayBuilder::new()
            .datastore(Arc::new(MemoryDatastore::new()))
            .admin_code(SecretString::new("   ".into()))
            .build()
            .unwrap();
        assert!(gw.flags().db_configured);
        // A blank admin code counts as unset.
        assert!(!gw.flags().local_admin);
    }

    #[test]
    fn shared_metrics_are_used() {
        let metrics = Arc::new(GatewayMetrics::default());
        let gw = GatewayBuilder::new()
            .metrics(Arc::clone(&metrics))
            .build()
            .unwrap();
        metrics.increment_throttled();
        assert_eq!(gw.metrics().snapshot().throttled, 1);
    }
}
