//! Dashboard configuration from CLI flags and `MONITOR_*` environment variables.

use std::time::Duration;

use time::UtcOffset;
use time::macros::format_description;
use tracing::Level;

use crate::api::ApiTimeouts;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_UTC_OFFSET: &str = "+00:00";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend URL must start with http:// or https://: {0}")]
    InvalidBackendUrl(String),
    #[error("invalid UTC offset '{0}' (expected ±HH:MM or Z)")]
    InvalidUtcOffset(String),
    #[error("unsupported log level '{0}' (expected debug, info, warn or error)")]
    InvalidLogLevel(String),
}

/// Global flags shared by every subcommand. Each falls back to its env var.
#[derive(Debug, Clone, clap::Args)]
pub struct ConfigArgs {
    /// Monitoring backend base URL.
    #[arg(long, global = true, env = "MONITOR_BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    pub backend_url: String,

    /// Seconds between automatic refreshes; 0 disables polling.
    #[arg(long, global = true, env = "MONITOR_REFRESH_INTERVAL_SECS", default_value_t = DEFAULT_REFRESH_INTERVAL_SECS)]
    pub refresh_interval_secs: u64,

    #[arg(long, global = true, env = "MONITOR_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    #[arg(long, global = true, env = "MONITOR_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,

    /// Offset used when displaying times, e.g. `+09:00`.
    #[arg(long, global = true, env = "MONITOR_UTC_OFFSET", default_value = DEFAULT_UTC_OFFSET, allow_hyphen_values = true)]
    pub utc_offset: String,

    #[arg(long, global = true, env = "MONITOR_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub backend_url: String,
    pub refresh_interval: Duration,
    pub timeouts: ApiTimeouts,
    pub utc_offset: UtcOffset,
    pub log_level: Level,
}

impl DashboardConfig {
    /// Validate raw flag values into typed config.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] naming the first invalid value.
    pub fn from_args(args: &ConfigArgs) -> Result<Self, ConfigError> {
        Ok(Self {
            backend_url: parse_backend_url(&args.backend_url)?,
            refresh_interval: Duration::from_secs(args.refresh_interval_secs),
            timeouts: ApiTimeouts {
                request: Duration::from_secs(args.request_timeout_secs),
                connect: Duration::from_secs(args.connect_timeout_secs),
            },
            utc_offset: parse_utc_offset(&args.utc_offset)?,
            log_level: parse_log_level(&args.log_level)?,
        })
    }
}

fn parse_backend_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match host {
        Some(rest) if !rest.is_empty() => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidBackendUrl(raw.to_owned())),
    }
}

/// Parse `±HH:MM` or `Z`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidUtcOffset`] for anything else.
pub fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(raw, format_description!("[offset_hour sign:mandatory]:[offset_minute]"))
        .map_err(|_| ConfigError::InvalidUtcOffset(raw.to_owned()))
}

fn parse_log_level(raw: &str) -> Result<Level, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(ConfigError::InvalidLogLevel(raw.to_owned())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
