use std::time::Duration;

use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::error::ShieldError;

const DEFAULT_LOG_LEVEL: &str = "INFO";
// Stays under the 5s function timeout so a slow presigned URL fails inside the handler.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 4_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub log_level: Level,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ShieldError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ShieldError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
        let log_level = parse_log_level(&log_level)?;

        let fetch_timeout = match lookup("FETCH_TIMEOUT_MS") {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    ShieldError::Config(format!("FETCH_TIMEOUT_MS must be an integer, got {raw:?}"))
                })?;
                if millis == 0 {
                    return Err(ShieldError::Config(
                        "FETCH_TIMEOUT_MS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
        };

        Ok(Config {
            log_level,
            fetch_timeout,
        })
    }

    /// Installs the JSON log subscriber. Call once per execution environment.
    pub fn init_logging(&self) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::new(self.log_level.as_str().to_lowercase()))
            .with_target(false)
            .with_current_span(false)
            .init();
    }
}

/// Accepts the level names operators already use for Python functions.
fn parse_log_level(raw: &str) -> Result<Level, ShieldError> {
    match raw.trim().to_uppercase().as_str() {
        "TRACE" | "NOTSET" => Ok(Level::TRACE),
        "DEBUG" => Ok(Level::DEBUG),
        "INFO" => Ok(Level::INFO),
        "WARN" | "WARNING" => Ok(Level::WARN),
        "ERROR" | "CRITICAL" | "FATAL" => Ok(Level::ERROR),
        _ => Err(ShieldError::Config(format!("unknown LOG_LEVEL {raw:?}"))),
    }
}
