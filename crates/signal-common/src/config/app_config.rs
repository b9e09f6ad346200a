//! Application configuration structs
//!
//! Loads configuration from environment variables, with a `.env` file picked
//! up when present.

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    /// WebSocket gateway listener
    pub gateway: ServerConfig,
    /// Administrative HTTP listener
    pub api: ServerConfig,
    /// Path the WebSocket upgrade is served on
    pub ws_path: String,
    /// Admission guard: pairwise connection records allowed per room
    pub max_connections_per_room: usize,
    pub queue: QueueConfig,
    pub health: HealthConfig,
    /// Room-stats monitor period, milliseconds
    pub room_stats_monitor_ms: u64,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Listener configuration (gateway and API)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Message-queue tuning
#[derive(Debug, Clone, Deserialize)]
pub struct QueueConfig {
    /// Drain loop period, milliseconds
    #[serde(default = "default_drain_ms")]
    pub drain_ms: u64,
    /// Messages taken per room per drain tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

/// Connection-health tuning
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// A connected pair silent this long is considered stale, milliseconds
    #[serde(default = "default_stale_connection_ms")]
    pub stale_connection_ms: u64,
    /// Reconnection attempts before a pair is given up on
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

// Default value functions
fn default_app_name() -> String {
    "signal-server".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_ws_port() -> u16 {
    9030
}

fn default_api_port() -> u16 {
    9031
}

fn default_ws_path() -> String {
    "/signal".to_string()
}

fn default_max_connections_per_room() -> usize {
    20
}

fn default_drain_ms() -> u64 {
    100
}

fn default_batch_size() -> usize {
    10
}

fn default_stale_connection_ms() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_room_stats_monitor_ms() -> u64 {
    30_000
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Every option has a default, so loading cannot fail on absence; only
    /// unparseable values are rejected.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` when a set variable fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            gateway: ServerConfig {
                host: env::var("WS_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("WS_PORT", default_ws_port())?,
            },
            api: ServerConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("API_PORT", default_api_port())?,
            },
            ws_path: env::var("WS_PATH").unwrap_or_else(|_| default_ws_path()),
            max_connections_per_room: parse_var(
                "MAX_CONNECTIONS_PER_ROOM",
                default_max_connections_per_room(),
            )?,
            queue: QueueConfig {
                drain_ms: parse_var("MESSAGE_QUEUE_DRAIN_MS", default_drain_ms())?,
                batch_size: parse_var("MESSAGE_QUEUE_BATCH_SIZE", default_batch_size())?,
            },
            health: HealthConfig {
                stale_connection_ms: parse_var(
                    "STALE_CONNECTION_MS",
                    default_stale_connection_ms(),
                )?,
                max_reconnect_attempts: parse_var(
                    "MAX_RECONNECT_ATTEMPTS",
                    default_max_reconnect_attempts(),
                )?,
            },
            room_stats_monitor_ms: parse_var(
                "ROOM_STATS_MONITOR_MS",
                default_room_stats_monitor_ms(),
            )?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_predicates() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Development.is_production());
        assert!(Environment::Development.is_development());
        assert!(!Environment::Staging.is_development());
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 9030,
        };
        assert_eq!(config.address(), "0.0.0.0:9030");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_app_name(), "signal-server");
        assert_eq!(default_ws_path(), "/signal");
        assert_eq!(default_max_connections_per_room(), 20);
        assert_eq!(default_drain_ms(), 100);
        assert_eq!(default_batch_size(), 10);
        assert_eq!(default_stale_connection_ms(), 30_000);
        assert_eq!(default_max_reconnect_attempts(), 3);
        assert_eq!(default_room_stats_monitor_ms(), 30_000);
    }
}
