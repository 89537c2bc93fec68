//! Startup configuration (spec §3.1).
//!
//! Follows the same `ConfigLoader`-trait-with-blanket-impl idiom as the rest
//! of this codebase's TOML-driven configuration: a default `load()`
//! implementation for any `DeserializeOwned`, distinct error variants for
//! file-not-found/parse/validation failures, and `#[serde(default = ...)]`
//! per optional field.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("config validation failed: {0}")]
    ValidationError(String),
}

/// Blanket-implemented trait for loading a TOML-backed config type from disk.
pub trait ConfigLoader: DeserializeOwned {
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: DeserializeOwned> ConfigLoader for T {}

/// Rate limiter defaults (spec §3: `RateLimiter`), loaded once at startup.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimiterConfig {
    #[serde(default = "default_allowed_messages")]
    pub allowed_messages: u32,
    #[serde(default = "default_time_window_ms")]
    pub time_window_ms: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            allowed_messages: default_allowed_messages(),
            time_window_ms: default_time_window_ms(),
        }
    }
}

fn default_allowed_messages() -> u32 {
    10
}
fn default_time_window_ms() -> u64 {
    100
}

/// Top-level SI core configuration (spec §3.1), loaded from TOML at startup
/// and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiConfig {
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u32,

    #[serde(default = "default_fm_budget_ms")]
    pub fm_budget_ms: u64,

    #[serde(default = "default_status_notification_ticks")]
    pub status_notification_ticks: u32,

    #[serde(default = "default_persistence_path")]
    pub persistence_path: String,

    #[serde(default = "default_event_log_path")]
    pub event_log_path: String,

    #[serde(default = "default_log_rotate_bytes")]
    pub log_rotate_bytes: u64,

    #[serde(default = "default_log_generations")]
    pub log_generations: u8,

    #[serde(default = "default_crc_error_max")]
    pub crc_error_max: u8,

    #[serde(default = "default_rolling_counter_error_limit")]
    pub rolling_counter_error_limit: u8,

    #[serde(default)]
    pub rate_limiter: RateLimiterConfig,
}

const TICK_PERIOD_MS_MIN: u32 = 5;
const TICK_PERIOD_MS_MAX: u32 = 1000;

fn default_tick_period_ms() -> u32 {
    25
}
fn default_fm_budget_ms() -> u64 {
    5000
}
fn default_status_notification_ticks() -> u32 {
    20
}
fn default_persistence_path() -> String {
    "event_data.bin".to_string()
}
fn default_event_log_path() -> String {
    "events.log".to_string()
}
fn default_log_rotate_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_log_generations() -> u8 {
    5
}
fn default_crc_error_max() -> u8 {
    3
}
fn default_rolling_counter_error_limit() -> u8 {
    3
}

impl Default for SiConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
            fm_budget_ms: default_fm_budget_ms(),
            status_notification_ticks: default_status_notification_ticks(),
            persistence_path: default_persistence_path(),
            event_log_path: default_event_log_path(),
            log_rotate_bytes: default_log_rotate_bytes(),
            log_generations: default_log_generations(),
            crc_error_max: default_crc_error_max(),
            rolling_counter_error_limit: default_rolling_counter_error_limit(),
            rate_limiter: RateLimiterConfig::default(),
        }
    }
}

impl SiConfig {
    /// Bounds-check loaded values (spec §3.1's bounds column).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms < TICK_PERIOD_MS_MIN || self.tick_period_ms > TICK_PERIOD_MS_MAX {
            return Err(ConfigError::ValidationError(format!(
                "tick_period_ms {} out of range [{}, {}]",
                self.tick_period_ms, TICK_PERIOD_MS_MIN, TICK_PERIOD_MS_MAX
            )));
        }
        if self.log_generations == 0 {
            return Err(ConfigError::ValidationError(
                "log_generations must be at least 1".to_string(),
            ));
        }
        if self.rate_limiter.allowed_messages == 0 {
            return Err(ConfigError::ValidationError(
                "rate_limiter.allowed_messages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
