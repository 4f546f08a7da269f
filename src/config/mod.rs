//! Configuration module - environment variable parsing

use std::env;

/// Client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// WebSocket URL of the game server (e.g. ws://localhost:8080/ws)
    pub server_url: String,
    /// Display name sent in the join request
    pub display_name: String,
    /// Class selection sent in the join request (warrior, ranger, mage)
    pub player_class: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// First reconnect delay in milliseconds
    pub reconnect_base_ms: u64,
    /// Upper bound on the reconnect delay in milliseconds
    pub reconnect_cap_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url =
            env::var("SERVER_URL").map_err(|_| ConfigError::Missing("SERVER_URL"))?;

        let reconnect_base_ms = parse_ms("RECONNECT_BASE_MS", 1_000)?;
        let reconnect_cap_ms = parse_ms("RECONNECT_CAP_MS", 30_000)?;

        Ok(Self {
            server_url,
            display_name: env::var("PLAYER_NAME").unwrap_or_else(|_| "Player".to_string()),
            player_class: env::var("PLAYER_CLASS").unwrap_or_else(|_| "warrior".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            reconnect_base_ms,
            reconnect_cap_ms,
        })
    }
}

fn parse_ms(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidNumber(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),
}
