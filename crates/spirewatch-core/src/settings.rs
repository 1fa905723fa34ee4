//! Dashboard settings.
//!
//! `Settings` is an immutable value: every change produces a new instance
//! which is then handed to whoever needs it. The refresh interval is always
//! a positive number of seconds; invalid input falls back to
//! [`DEFAULT_REFRESH_INTERVAL_SECS`] instead of failing.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_SERVER_CONTEXT: &str = "spire-server-cluster";
pub const DEFAULT_WORKLOAD_CONTEXT: &str = "workload-cluster";

/// Invalid settings input. Always recovered locally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("refresh interval is not a number: {0:?}")]
    NotANumber(String),

    #[error("refresh interval must be a positive number of seconds, got {0}")]
    NonPositive(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    server_context: String,
    workload_context: String,
    refresh_interval_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_context: DEFAULT_SERVER_CONTEXT.to_string(),
            workload_context: DEFAULT_WORKLOAD_CONTEXT.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
        }
    }
}

impl Settings {
    /// Build settings from typed values. A zero interval falls back to the
    /// default.
    pub fn new(
        server_context: impl Into<String>,
        workload_context: impl Into<String>,
        refresh_interval_secs: u64,
    ) -> Self {
        Self {
            server_context: server_context.into(),
            workload_context: workload_context.into(),
            refresh_interval_secs: positive_or_default(refresh_interval_secs),
        }
    }

    /// Build settings from free-form text input, as typed into a settings
    /// form. An unparsable interval falls back to the default.
    pub fn from_input(
        server_context: &str,
        workload_context: &str,
        refresh_interval: &str,
    ) -> Self {
        Self {
            server_context: server_context.trim().to_string(),
            workload_context: workload_context.trim().to_string(),
            refresh_interval_secs: Self::refresh_interval_or_default(refresh_interval),
        }
    }

    /// Strictly parse a refresh interval in whole seconds.
    pub fn parse_refresh_interval(input: &str) -> Result<u64, ConfigError> {
        let trimmed = input.trim();
        let value: i64 = trimmed
            .parse()
            .map_err(|_| ConfigError::NotANumber(trimmed.to_string()))?;
        if value <= 0 {
            return Err(ConfigError::NonPositive(value));
        }
        Ok(value as u64)
    }

    /// Parse a refresh interval, substituting the default on error.
    pub fn refresh_interval_or_default(input: &str) -> u64 {
        match Self::parse_refresh_interval(input) {
            Ok(secs) => secs,
            Err(e) => {
                warn!(
                    error = %e,
                    default_secs = DEFAULT_REFRESH_INTERVAL_SECS,
                    "invalid refresh interval, using default"
                );
                DEFAULT_REFRESH_INTERVAL_SECS
            }
        }
    }

    pub fn server_context(&self) -> &str {
        &self.server_context
    }

    pub fn workload_context(&self) -> &str {
        &self.workload_context
    }

    pub fn refresh_interval_secs(&self) -> u64 {
        self.refresh_interval_secs
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    /// Copy with a different refresh interval (zero falls back to default).
    pub fn with_refresh_interval(&self, secs: u64) -> Self {
        Self {
            refresh_interval_secs: positive_or_default(secs),
            ..self.clone()
        }
    }

    /// Copy with different cluster contexts.
    pub fn with_contexts(
        &self,
        server_context: impl Into<String>,
        workload_context: impl Into<String>,
    ) -> Self {
        Self {
            server_context: server_context.into(),
            workload_context: workload_context.into(),
            ..self.clone()
        }
    }
}

fn positive_or_default(secs: u64) -> u64 {
    if secs > 0 {
        secs
    } else {
        warn!(
            error = %ConfigError::NonPositive(0),
            default_secs = DEFAULT_REFRESH_INTERVAL_SECS,
            "invalid refresh interval, using default"
        );
        DEFAULT_REFRESH_INTERVAL_SECS
    }
}
