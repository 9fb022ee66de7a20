use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use roombook_core::{Room, normalize_floor};
use roombook_crypto::{ExposeSecret, SecretString};
use roombook_gateway::{Clock, Gateway, GatewayBuilder, LegacyConfig, ReportSettings};
use roombook_state::{CounterStore, Datastore};
use roombook_state_memory::{MemoryCounterStore, MemoryDatastore};
use roombook_state_rest::{RestDatastore, RestDatastoreConfig};
use tracing::info;

use crate::config::{DatabaseConfig, DatastoreBackend, ReportConfig, RoomBookConfig};
use crate::error::ServerError;

/// Construct the managed datastore, or `None` when it is not configured.
pub fn create_datastore(config: &DatabaseConfig) -> Result<Option<Arc<dyn Datastore>>, ServerError> {
    match config.backend {
        DatastoreBackend::Rest => create_rest(config),
        DatastoreBackend::Memory => Ok(Some(create_memory(config))),
    }
}

fn create_rest(config: &DatabaseConfig) -> Result<Option<Arc<dyn Datastore>>, ServerError> {
    let Some(url) = config.url.as_deref() else {
        return Ok(None);
    };
    let key = config
        .service_key
        .as_ref()
        .ok_or_else(|| ServerError::Config("database.service_key is required with database.url".into()))?;

    let mut rest = RestDatastoreConfig::new(url, copy_secret(key))
        .with_timeout(Duration::from_secs(config.timeout_seconds));
    rest.rest_path.clone_from(&config.rest_path);

    let store = RestDatastore::new(&rest).map_err(|e| ServerError::Config(format!("rest datastore: {e}")))?;
    info!(url, "rest datastore initialized");
    Ok(Some(Arc::new(store)))
}

fn create_memory(config: &DatabaseConfig) -> Arc<dyn Datastore> {
    let rooms = config.rooms.iter().map(|seed| {
        let floor = normalize_floor(&seed.floor);
        Room {
            id: floor.clone(),
            floor,
            name: seed.name.trim().to_owned(),
            is_active: seed.active,
        }
    });
    let store = MemoryDatastore::with_rooms(rooms);
    info!(rooms = config.rooms.len(), "memory datastore initialized");
    Arc::new(store)
}

/// Bucket storage for the rate limiter.
pub fn create_counter_store() -> Arc<dyn CounterStore> {
    Arc::new(MemoryCounterStore::new())
}

/// Assemble the gateway from configuration.
pub fn build_gateway(
    config: &RoomBookConfig,
    datastore: Option<Arc<dyn Datastore>>,
    clock: Arc<dyn Clock>,
) -> Result<Gateway, ServerError> {
    let legacy = LegacyConfig {
        url: config.legacy.url.clone(),
        shared_secret: config.legacy.shared_secret.as_ref().map(copy_secret),
        timeout: Duration::from_secs(config.legacy.timeout_seconds),
        get_retries: config.legacy.get_retries,
    };

    let mut builder = GatewayBuilder::new()
        .legacy(legacy)
        .read_enabled(config.features.read_enabled)
        .write_enabled(config.features.write_enabled)
        .strict_password_hash(config.features.strict_password_hash)
        .report(report_settings(&config.report)?)
        .clock(clock);

    if let Some(store) = datastore {
        builder = builder.datastore(store);
    }
    if let Some(secret) = &config.security.signing_secret {
        builder = builder.signing_secret(copy_secret(secret));
    }
    if let Some(pepper) = &config.security.password_pepper {
        builder = builder.password_pepper(copy_secret(pepper));
    }
    if let Some(code) = &config.security.admin_code {
        builder = builder.admin_code(copy_secret(code));
    }

    Ok(builder.build()?)
}

fn report_settings(config: &ReportConfig) -> Result<ReportSettings, ServerError> {
    let utc_offset = FixedOffset::east_opt(config.utc_offset_hours * 3600).ok_or_else(|| {
        ServerError::Config(format!(
            "report.utc_offset_hours out of range: {}",
            config.utc_offset_hours
        ))
    })?;
    Ok(ReportSettings {
        webhook_url: config.webhook_url.clone(),
        recipients: config.recipients.clone(),
        alert_threshold: config.alert_threshold,
        utc_offset,
    })
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().clone())
}
