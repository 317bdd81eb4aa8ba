//! Server configuration loading from file and environment variables.

use pulse_push::PushConfig;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Push delivery settings.
    #[serde(default)]
    pub push: PushConfig,

    /// Trigger bus and maintenance task settings.
    #[serde(default)]
    pub triggers: TriggerConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "pulse_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Trigger delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Capacity of the in-process queue for events raised by this server's own writes.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Interval of the counter reconciliation task. `0` disables it.
    #[serde(default)]
    pub reconcile_interval_seconds: u64,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "pulse.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            reconcile_interval_seconds: 0,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `PULSE_HOST` overrides `server.host`
/// - `PULSE_PORT` overrides `server.port`
/// - `PULSE_DB_PATH` overrides `database.path`
/// - `PULSE_LOG_LEVEL` overrides `logging.level`
/// - `PULSE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `PULSE_PUSH_PROJECT_ID` overrides `push.project_id`
/// - `PULSE_PUSH_ACCESS_TOKEN` overrides `push.access_token`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(host) = var("PULSE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = var("PULSE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = var("PULSE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("PULSE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("PULSE_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(project_id) = var("PULSE_PUSH_PROJECT_ID") {
        config.push.project_id = project_id;
    }
    if let Some(token) = var("PULSE_PUSH_ACCESS_TOKEN") {
        config.push.access_token = token;
    }
}
