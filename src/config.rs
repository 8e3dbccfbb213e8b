use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Upstream
    pub pds_base_url: String,
    pub appview_base_url: String,

    // Sessions & pagination continuations
    pub session_ttl: Duration,
    pub continuation_ttl: Duration,
    pub cleanup_interval: Duration,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/bridge.sqlite")),

            // Upstream
            pds_base_url: env_or_default("PDS_BASE_URL", "https://bsky.social"),
            appview_base_url: env_or_default("APPVIEW_BASE_URL", "https://public.api.bsky.app"),

            // Sessions & pagination continuations
            session_ttl: Duration::from_secs(parse_env_u64(
                "SESSION_TTL_SECS",
                30 * 24 * 3600, // 30 days
            )?),
            continuation_ttl: Duration::from_secs(parse_env_u64(
                "CONTINUATION_TTL_SECS",
                24 * 3600, // 1 day
            )?),
            cleanup_interval: Duration::from_secs(parse_env_u64("CLEANUP_INTERVAL_SECS", 3600)?),

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 3000)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pds_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "PDS_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.appview_base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "APPVIEW_BASE_URL".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.continuation_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "CONTINUATION_TTL_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.session_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_TTL_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
