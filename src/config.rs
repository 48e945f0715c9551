use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::ws::ConnectionSettings;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Database URL. Without it the in-memory store is used.
    pub db_url: Option<String>,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Apply the bundled migrations (table + notify trigger) at startup
    #[serde(default = "default_true")]
    pub db_run_migrations: bool,

    /// Seconds between liveness pings sent to each client
    #[serde(default = "default_ping_interval_secs")]
    pub ws_ping_interval_secs: u64,

    /// Deadline for writing a ping frame
    #[serde(default = "default_ping_timeout_secs")]
    pub ws_ping_timeout_secs: u64,

    /// Deadline for writing a notification to a single client
    #[serde(default = "default_send_timeout_secs")]
    pub ws_send_timeout_secs: u64,

    /// Notifications a client may fall behind by before it is dropped
    #[serde(default = "default_queue_capacity")]
    pub ws_queue_capacity: usize,

    /// Largest inbound frame accepted from a client
    #[serde(default = "default_max_message_size")]
    pub ws_max_message_size: usize,

    /// Backoff before re-opening a failed change feed subscription
    #[serde(default = "default_feed_retry_secs")]
    pub feed_retry_secs: u64,

    /// Emit every existing list when the change feed (re)subscribes
    #[serde(default = "default_true")]
    pub feed_initial_snapshot: bool,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        let config = match envy::from_env::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                return Err(ConfigError::EnvError(e));
            }
        };
        if let Err(e) = config.validate() {
            error!("❌ Invalid configuration: {}", e);
            return Err(e);
        }
        info!("✅ Configuration loaded successfully");
        Ok(config)
    }

    /// Reject values that would stall or spin the connection and feed loops
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("WS_PING_INTERVAL_SECS", self.ws_ping_interval_secs),
            ("WS_PING_TIMEOUT_SECS", self.ws_ping_timeout_secs),
            ("WS_SEND_TIMEOUT_SECS", self.ws_send_timeout_secs),
            ("WS_QUEUE_CAPACITY", self.ws_queue_capacity as u64),
            ("WS_MAX_MESSAGE_SIZE", self.ws_max_message_size as u64),
            ("FEED_RETRY_SECS", self.feed_retry_secs),
        ];
        match positive.iter().find(|(_, value)| *value == 0) {
            Some((name, _)) => Err(ConfigError::Invalid(format!(
                "{} must be greater than zero",
                name
            ))),
            None => Ok(()),
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            ping_interval: Duration::from_secs(self.ws_ping_interval_secs),
            ping_timeout: Duration::from_secs(self.ws_ping_timeout_secs),
            send_timeout: Duration::from_secs(self.ws_send_timeout_secs),
            queue_capacity: self.ws_queue_capacity,
        }
    }

    pub fn feed_retry_backoff(&self) -> Duration {
        Duration::from_secs(self.feed_retry_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            service_name: default_service_name(),
            db_url: None,
            db_max_connections: default_db_max_connections(),
            db_run_migrations: true,
            ws_ping_interval_secs: default_ping_interval_secs(),
            ws_ping_timeout_secs: default_ping_timeout_secs(),
            ws_send_timeout_secs: default_send_timeout_secs(),
            ws_queue_capacity: default_queue_capacity(),
            ws_max_message_size: default_max_message_size(),
            feed_retry_secs: default_feed_retry_secs(),
            feed_initial_snapshot: true,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    EnvError(envy::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::EnvError(e) => write!(f, "Environment variable error: {}", e),
            ConfigError::Invalid(reason) => write!(f, "Invalid configuration: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_service_name() -> String {
    "listcast".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_ping_interval_secs() -> u64 {
    30
}

fn default_ping_timeout_secs() -> u64 {
    5
}

fn default_send_timeout_secs() -> u64 {
    5
}

fn default_queue_capacity() -> usize {
    crate::ws::connection::DEFAULT_QUEUE_CAPACITY
}

fn default_max_message_size() -> usize {
    512
}

fn default_feed_retry_secs() -> u64 {
    5
}

fn default_true() -> bool {
    true
}
