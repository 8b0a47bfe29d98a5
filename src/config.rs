//! Configuration management
//!
//! Configuration is loaded once at startup from `microbase.toml` (or the
//! path in `MICROBASE_CONFIG`), then overridden by environment variables.
//! The loaded value is immutable for the lifetime of the process and is
//! accessed through [`get_config`].

use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{MicrobaseError, Result};
use crate::runtime::lifetime::shutdown::{ShutdownConfig, ShutdownSignalKind};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub shutdown: ShutdownOptions,
    #[serde(default)]
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Shows up in logs under the `service` key
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub instance_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Log file path; empty or absent means stdout
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub enable_rotation: bool,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    /// Environment variable names whose values are redacted from log output
    #[serde(default)]
    pub redact_env: Vec<String>,
}

/// Graceful shutdown options as they appear in the config file.
///
/// All fields are optional; defaults are `["SIGINT", "SIGTERM"]`, 10
/// seconds and exit code 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownOptions {
    #[serde(default = "default_shutdown_signals")]
    pub signals: Vec<String>,
    #[serde(default = "default_shutdown_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_hard_exit_code")]
    pub hard_exit_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_route")]
    pub route: String,
    /// Event-loop delay beyond which the service reports under-pressure
    #[serde(default = "default_max_event_loop_delay_ms")]
    pub max_event_loop_delay_ms: u64,
    #[serde(default = "default_health_check_interval_ms")]
    pub check_interval_ms: u64,
}

fn default_service_name() -> String {
    "microbase".to_string()
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    3000
}

fn default_cpu_count() -> usize {
    num_cpus::get()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_backups() -> u32 {
    7
}

fn default_shutdown_signals() -> Vec<String> {
    vec!["SIGINT".to_string(), "SIGTERM".to_string()]
}

fn default_shutdown_timeout_ms() -> u64 {
    10_000
}

fn default_hard_exit_code() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

fn default_health_route() -> String {
    "/_health".to_string()
}

fn default_max_event_loop_delay_ms() -> u64 {
    1_000
}

fn default_health_check_interval_ms() -> u64 {
    5_000
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            instance_id: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cpu_count: default_cpu_count(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            enable_rotation: false,
            max_backups: default_max_backups(),
            redact_env: Vec::new(),
        }
    }
}

impl Default for ShutdownOptions {
    fn default() -> Self {
        Self {
            signals: default_shutdown_signals(),
            timeout_ms: default_shutdown_timeout_ms(),
            hard_exit_code: default_hard_exit_code(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            route: default_health_route(),
            max_event_loop_delay_ms: default_max_event_loop_delay_ms(),
            check_interval_ms: default_health_check_interval_ms(),
        }
    }
}

impl ShutdownOptions {
    /// Resolve the raw signal names into a [`ShutdownConfig`].
    ///
    /// Fails on unknown signal names so that typos surface at startup
    /// instead of leaving the process without a shutdown path.
    pub fn to_shutdown_config(&self) -> Result<ShutdownConfig> {
        let mut signals = Vec::with_capacity(self.signals.len());
        for name in &self.signals {
            let kind: ShutdownSignalKind = name
                .parse()
                .map_err(MicrobaseError::config_validation)?;
            if !signals.contains(&kind) {
                signals.push(kind);
            }
        }
        Ok(ShutdownConfig {
            signals,
            timeout: Duration::from_millis(self.timeout_ms),
            hard_exit_code: self.hard_exit_code,
        })
    }
}

impl AppConfig {
    /// Load configuration from disk and apply environment overrides.
    ///
    /// Missing config file is not an error; defaults are used.
    pub fn load() -> Self {
        let path = env::var("MICROBASE_CONFIG").unwrap_or_else(|_| "microbase.toml".to_string());
        let mut config = Self::load_from_file(&path);
        config.apply_env_overrides();
        config
    }

    fn load_from_file(path: &str) -> Self {
        if !Path::new(path).exists() {
            debug!("Config file {} not found, using defaults", path);
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                Ok(config) => {
                    debug!("Loaded configuration from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse {}: {}, using defaults", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {}: {}, using defaults", path, e);
                Self::default()
            }
        }
    }

    /// Environment variables take precedence over the config file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("SERVICE_NAME") {
            self.service.name = name;
        }
        if let Ok(instance) = env::var("INSTANCE_ID") {
            self.service.instance_id = Some(instance);
        }
        if let Ok(host) = env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = env::var("SERVER_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!("Invalid SERVER_PORT '{}', keeping {}", port, self.server.port),
            }
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = env::var("LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Ok(file) = env::var("LOG_FILE") {
            self.logging.file = if file.is_empty() { None } else { Some(file) };
        }
        if let Ok(signals) = env::var("SHUTDOWN_SIGNALS") {
            self.shutdown.signals = signals
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Ok(timeout) = env::var("SHUTDOWN_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(ms) => self.shutdown.timeout_ms = ms,
                Err(_) => warn!(
                    "Invalid SHUTDOWN_TIMEOUT_MS '{}', keeping {}",
                    timeout, self.shutdown.timeout_ms
                ),
            }
        }
        if let Ok(code) = env::var("SHUTDOWN_HARD_EXIT_CODE") {
            match code.parse() {
                Ok(code) => self.shutdown.hard_exit_code = code,
                Err(_) => warn!(
                    "Invalid SHUTDOWN_HARD_EXIT_CODE '{}', keeping {}",
                    code, self.shutdown.hard_exit_code
                ),
            }
        }
        if let Ok(enabled) = env::var("HEALTH_ENABLED") {
            self.health.enabled = enabled != "false" && enabled != "0";
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.name.is_empty() {
            return Err(MicrobaseError::config_validation(
                "service.name must not be empty",
            ));
        }
        if self.server.cpu_count == 0 {
            return Err(MicrobaseError::config_validation(
                "server.cpu_count must be at least 1",
            ));
        }
        if self.shutdown.timeout_ms == 0 {
            return Err(MicrobaseError::config_validation(
                "shutdown.timeout_ms must be a positive integer",
            ));
        }
        if self.shutdown.signals.is_empty() {
            return Err(MicrobaseError::config_validation(
                "shutdown.signals must contain at least one signal",
            ));
        }
        // Resolves names, catching typos like "SIGTREM"
        self.shutdown.to_shutdown_config()?;
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(MicrobaseError::config_validation(format!(
                "logging.level must be one of trace, debug, info, warn, error, got '{}'",
                self.logging.level
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(MicrobaseError::config_validation(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }
        if self.health.enabled && !self.health.route.starts_with('/') {
            return Err(MicrobaseError::config_validation(format!(
                "health.route must start with '/', got '{}'",
                self.health.route
            )));
        }
        Ok(())
    }
}

static CONFIG: OnceLock<ArcSwap<AppConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<AppConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from `microbase.toml` (or `MICROBASE_CONFIG`) in
/// the current directory. If the file doesn't exist, in-memory defaults
/// with environment overrides are used.
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(AppConfig::load()));
}

/// Initialize the global configuration from an already built value.
///
/// Used by tests and by embedders that assemble their own `AppConfig`.
pub fn init_config_with(config: AppConfig) {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(config));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.shutdown.timeout_ms, 10_000);
        assert_eq!(config.shutdown.hard_exit_code, 1);
        assert_eq!(config.shutdown.signals, vec!["SIGINT", "SIGTERM"]);
        assert_eq!(config.health.route, "/_health");
        assert!(config.health.enabled);
    }

    #[test]
    fn shutdown_options_resolve_and_dedupe() {
        let options = ShutdownOptions {
            signals: vec![
                "SIGTERM".to_string(),
                "sigterm".to_string(),
                "SIGINT".to_string(),
            ],
            timeout_ms: 250,
            hard_exit_code: 7,
        };
        let config = options.to_shutdown_config().unwrap();
        assert_eq!(config.signals.len(), 2);
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.hard_exit_code, 7);
    }

    #[test]
    fn unknown_signal_name_is_rejected() {
        let options = ShutdownOptions {
            signals: vec!["SIGFOO".to_string()],
            ..Default::default()
        };
        let err = options.to_shutdown_config().unwrap_err();
        assert_eq!(err.code(), "E001");
        assert!(err.message().contains("SIGFOO"));
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = AppConfig::default();
        config.shutdown.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "blorp".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.message().contains("blorp"));

        // Levels are case-insensitive.
        config.logging.level = "WARN".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = AppConfig::default();
        config.server.cpu_count = 0;
        let err = config.validate().unwrap_err();
        assert!(err.message().contains("cpu_count"));
    }
}
