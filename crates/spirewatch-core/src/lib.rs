//! spirewatch-core — shared types for the spirewatch dashboard.
//!
//! Holds the status data model (registrations, agents, server health),
//! the per-category [`Snapshot`] wrapper, the immutable [`Settings`]
//! value, and the `spirewatch.toml` file format.

pub mod config;
pub mod settings;
pub mod types;
pub mod uptime;

pub use config::SpirewatchConfig;
pub use settings::{ConfigError, Settings};
pub use types::*;
