//! Process configuration, loaded from environment variables with validated defaults.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration for the engine service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP/WebSocket server binds to.
    pub bind_addr: SocketAddr,
    /// Directory the durable journal file lives in.
    pub journal_dir: PathBuf,
    /// Bounded capacity of the engine's command channel.
    pub channel_capacity: usize,
    /// Default depth used by `GetSnapshot` when the caller omits one.
    pub default_snapshot_depth: usize,
    /// Interval between push-stream broadcasts.
    pub push_interval: Duration,
}

/// Errors produced while loading or validating [`Config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that could not be parsed.
    InvalidValue {
        /// The environment variable's name.
        var: String,
        /// The offending raw value.
        value: String,
    },
    /// A value was outside its allowed range.
    OutOfRange {
        /// The field name.
        field: String,
        /// A description of the allowed range.
        allowed: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { var, value } => {
                write!(f, "environment variable {var} has invalid value {value:?}")
            }
            ConfigError::OutOfRange { field, allowed } => {
                write!(f, "{field} must be {allowed}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_JOURNAL_DIR: &str = "./data";
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_SNAPSHOT_DEPTH: usize = 5;
const DEFAULT_PUSH_INTERVAL_MS: u64 = 1000;

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset, and validates the result.
    ///
    /// Recognized variables: `CLOB_BIND_ADDR`, `CLOB_JOURNAL_DIR`,
    /// `CLOB_CHANNEL_CAPACITY`, `CLOB_SNAPSHOT_DEPTH`, `CLOB_PUSH_INTERVAL_MS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = parse_env("CLOB_BIND_ADDR", DEFAULT_BIND_ADDR)?;
        let journal_dir = std::env::var("CLOB_JOURNAL_DIR")
            .unwrap_or_else(|_| DEFAULT_JOURNAL_DIR.to_string())
            .into();
        let channel_capacity: usize = parse_env("CLOB_CHANNEL_CAPACITY", &DEFAULT_CHANNEL_CAPACITY.to_string())?;
        let default_snapshot_depth: usize =
            parse_env("CLOB_SNAPSHOT_DEPTH", &DEFAULT_SNAPSHOT_DEPTH.to_string())?;
        let push_interval_ms: u64 =
            parse_env("CLOB_PUSH_INTERVAL_MS", &DEFAULT_PUSH_INTERVAL_MS.to_string())?;

        let config = Config {
            bind_addr,
            journal_dir,
            channel_capacity,
            default_snapshot_depth,
            push_interval: Duration::from_millis(push_interval_ms),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                field: "channel_capacity".to_string(),
                allowed: "greater than zero".to_string(),
            });
        }
        if !(1..=20).contains(&self.default_snapshot_depth) {
            return Err(ConfigError::OutOfRange {
                field: "default_snapshot_depth".to_string(),
                allowed: "in 1..=20".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &str, default: &str) -> Result<T, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        var: var.to_string(),
        value: raw,
    })
}
