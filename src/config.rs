//! Process configuration from environment

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REFERENCE_PATH: &str = "data/state-dist-map.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 900;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a port number, got {value:?}")]
    InvalidPort { var: &'static str, value: String },
    #[error("{var} must be a positive number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
}

/// Startup settings
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub port: u16,
    pub reference_path: PathBuf,
    pub cowin_base_url: String,
    pub postal_base_url: String,
    pub http_timeout: Duration,
    /// Idle conversations are forgotten after this long
    pub session_timeout: Duration,
    /// Telegram transport runs only when set
    pub telegram_token: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match var("VACCINE_BOT_PORT") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidPort {
                var: "VACCINE_BOT_PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let timeout_secs = seconds(&var, "VACCINE_BOT_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let session_timeout_secs = seconds(
            &var,
            "VACCINE_BOT_SESSION_TIMEOUT_SECS",
            DEFAULT_SESSION_TIMEOUT_SECS,
        )?;

        Ok(Self {
            port,
            reference_path: var("VACCINE_BOT_REFERENCE_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_REFERENCE_PATH), PathBuf::from),
            cowin_base_url: var("COWIN_BASE_URL")
                .unwrap_or_else(|| crate::cowin::DEFAULT_BASE_URL.to_string()),
            postal_base_url: var("POSTAL_BASE_URL")
                .unwrap_or_else(|| crate::postal::DEFAULT_BASE_URL.to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
            session_timeout: Duration::from_secs(session_timeout_secs),
            telegram_token: var("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()),
        })
    }
}

fn seconds(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout { var: name, value }),
        None => Ok(default),
    }
}
