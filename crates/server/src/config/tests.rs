use std::collections::HashMap;

use roombook_crypto::ExposeSecret;

use super::*;

#[test]
fn defaults() {
    let config: RoomBookConfig = toml::from_str("").unwrap();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
    assert!(config.legacy.url.is_none());
    assert_eq!(config.legacy.timeout_seconds, 10);
    assert_eq!(config.legacy.get_retries, 1);
    assert_eq!(config.database.backend, DatastoreBackend::Rest);
    assert_eq!(config.database.rest_path, "rest/v1");
    assert!(!config.features.read_enabled);
    assert!(!config.features.write_enabled);
    assert!(config.rate_limit.enabled);
    assert_eq!(config.rate_limit.max_requests, 60);
    assert_eq!(config.rate_limit.window_seconds, 60);
    assert_eq!(config.rate_limit.on_error, RateLimitErrorBehavior::Allow);
    assert_eq!(config.report.alert_threshold, 5);
    assert_eq!(config.report.utc_offset_hours, 9);
    assert_eq!(config.logging.format, LogFormat::Text);
}

#[test]
fn full_file() {
    let toml = r#"
        [server]
        host = "0.0.0.0"
        port = 9000

        [legacy]
        url = "https://script.example.com/exec"
        shared_secret = "s3cret"

        [database]
        backend = "memory"

        [[database.rooms]]
        floor = "6F"
        name = "Main"

        [[database.rooms]]
        floor = "7F"
        name = "Closed"
        active = false

        [features]
        read_enabled = true
        write_enabled = true

        [security]
        signing_secret = "sign"
        admin_code = "123456"

        [rate_limit]
        max_requests = 10
        on_error = "deny"

        [report]
        recipients = ["ops@example.com"]

        [logging]
        format = "json"
    "#;
    let config: RoomBookConfig = toml::from_str(toml).unwrap();
    assert_eq!(config.server.port, 9000);
    assert_eq!(
        config.legacy.url.as_deref(),
        Some("https://script.example.com/exec")
    );
    assert_eq!(
        config.legacy.shared_secret.unwrap().expose_secret(),
        "s3cret"
    );
    assert_eq!(config.database.backend, DatastoreBackend::Memory);
    assert_eq!(config.database.rooms.len(), 2);
    assert!(config.database.rooms[0].active);
    assert!(!config.database.rooms[1].active);
    assert!(config.features.read_enabled);
    assert_eq!(config.rate_limit.max_requests, 10);
    assert_eq!(config.rate_limit.on_error, RateLimitErrorBehavior::Deny);
    assert_eq!(config.report.recipients, vec!["ops@example.com"]);
    assert_eq!(config.logging.format, LogFormat::Json);
}

#[test]
fn environment_overrides_file() {
    let mut config: RoomBookConfig = toml::from_str(
        r#"
        [legacy]
        url = "https://old.example.com/exec"
        [features]
        read_enabled = true
        "#,
    )
    .unwrap();

    let env: HashMap<&str, &str> = HashMap::from([
        ("ROOMBOOK_LEGACY_URL", "https://new.example.com/exec"),
        ("ROOMBOOK_DB_READ_ENABLED", "off"),
        ("ROOMBOOK_DB_WRITE_ENABLED", "YES"),
        ("ROOMBOOK_SIGNING_SECRET", "sign"),
        ("ROOMBOOK_ADMIN_CODE", "   "),
        ("ROOMBOOK_REPORT_RECIPIENTS", "a@example.com, ,b@example.com"),
    ]);
    config.apply_env(|key| env.get(key).map(|v| (*v).to_owned()));

    assert_eq!(
        config.legacy.url.as_deref(),
        Some("https://new.example.com/exec")
    );
    assert!(!config.features.read_enabled);
    assert!(config.features.write_enabled);
    assert_eq!(
        config.security.signing_secret.unwrap().expose_secret(),
        "sign"
    );
    assert!(config.security.admin_code.is_none());
    assert_eq!(
        config.report.recipients,
        vec!["a@example.com", "b@example.com"]
    );
}

#[test]
fn flags() {
    for yes in ["1", "true", "TRUE", "yes", "on", " On "] {
        assert!(parse_flag(yes), "{yes}");
    }
    for no in ["0", "false", "no", "off", "enabled", ""] {
        assert!(!parse_flag(no), "{no}");
    }
}
