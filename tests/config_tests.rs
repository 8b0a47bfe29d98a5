use std::time::Duration;

use microbase::config::{AppConfig, ShutdownOptions};
use microbase::runtime::ShutdownSignalKind;

#[test]
fn toml_overrides_defaults() {
    let config: AppConfig = toml::from_str(
        r#"
        [service]
        name = "billing"

        [server]
        host = "0.0.0.0"
        port = 8080

        [shutdown]
        signals = ["SIGTERM"]
        timeout_ms = 5000
        hard_exit_code = 3

        [health]
        route = "/healthz"
        "#,
    )
    .unwrap();

    assert_eq!(config.service.name, "billing");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.shutdown.signals, vec!["SIGTERM"]);
    assert_eq!(config.shutdown.timeout_ms, 5000);
    assert_eq!(config.shutdown.hard_exit_code, 3);
    assert_eq!(config.health.route, "/healthz");
    // Untouched sections keep their defaults.
    assert_eq!(config.logging.level, "info");
    assert!(config.validate().is_ok());
}

#[test]
fn empty_toml_is_all_defaults() {
    let config: AppConfig = toml::from_str("").unwrap();
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.shutdown.timeout_ms, 10_000);
    assert!(config.validate().is_ok());
}

#[test]
fn env_overrides_take_precedence() {
    // Each env test uses its own variable names to stay parallel-safe.
    unsafe {
        std::env::set_var("SHUTDOWN_TIMEOUT_MS", "2500");
        std::env::set_var("SHUTDOWN_SIGNALS", "SIGTERM, SIGQUIT");
    }

    let mut config = AppConfig::default();
    config.apply_env_overrides();

    assert_eq!(config.shutdown.timeout_ms, 2500);
    assert_eq!(config.shutdown.signals, vec!["SIGTERM", "SIGQUIT"]);

    unsafe {
        std::env::remove_var("SHUTDOWN_TIMEOUT_MS");
        std::env::remove_var("SHUTDOWN_SIGNALS");
    }
}

#[test]
fn invalid_env_values_keep_previous_settings() {
    unsafe { std::env::set_var("SHUTDOWN_HARD_EXIT_CODE", "not-a-number") };

    let mut config = AppConfig::default();
    config.apply_env_overrides();
    assert_eq!(config.shutdown.hard_exit_code, 1);

    unsafe { std::env::remove_var("SHUTDOWN_HARD_EXIT_CODE") };
}

#[test]
fn load_reads_the_file_named_by_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("microbase.toml");
    std::fs::write(
        &path,
        r#"
        [server]
        port = 9099

        [service]
        name = "from-file"
        "#,
    )
    .unwrap();

    unsafe { std::env::set_var("MICROBASE_CONFIG", &path) };
    let config = AppConfig::load();
    unsafe { std::env::remove_var("MICROBASE_CONFIG") };

    // Only fields no other test overrides via env, to stay parallel-safe.
    assert_eq!(config.server.port, 9099);
    assert_eq!(config.service.name, "from-file");
}

#[test]
fn shutdown_options_resolve_signal_names() {
    let options = ShutdownOptions {
        signals: vec!["SIGINT".to_string(), "SIGTERM".to_string()],
        timeout_ms: 100,
        hard_exit_code: 1,
    };
    let shutdown = options.to_shutdown_config().unwrap();
    assert_eq!(
        shutdown.signals,
        vec![ShutdownSignalKind::Interrupt, ShutdownSignalKind::Terminate]
    );
    assert_eq!(shutdown.timeout, Duration::from_millis(100));
}

#[test]
fn validation_failures_carry_error_codes() {
    let mut config = AppConfig::default();
    config.logging.format = "yaml".to_string();
    let err = config.validate().unwrap_err();
    assert_eq!(err.code(), "E001");
    assert!(err.to_string().contains("yaml"));

    let mut config = AppConfig::default();
    config.health.route = "healthz".to_string();
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.shutdown.signals.clear();
    assert!(config.validate().is_err());
}
