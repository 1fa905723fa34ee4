//! spirewatch-scheduler — keeps the state store fresh.
//!
//! The [`RefreshScheduler`] runs a repeating timer; every tick starts a
//! refresh cycle of three independent fetch tasks, one per category.
//! Manual refreshes start the same tasks immediately. Each task records
//! its own outcome, so a slow or failing category never holds back the
//! others.
//!
//! # Architecture
//!
//! ```text
//! ConfigManager ──watch<Arc<Settings>>──┐
//!                                       ▼
//! SchedulerHandle ──Command──▶ scheduler loop (ticker, JoinSet of fetches)
//!                                  │ spawn per category    ▲ CategoryUpdate
//!                                  ▼                       │
//!                  DataSource::fetch_*() (bounded by fetch_timeout)
//!
//! scheduler loop ──▶ StateStore::update(), in completion order
//! ```
//!
//! Changing the interval restarts the timer without cancelling fetches
//! already in flight. Shutdown stops the timer, waits up to a grace
//! period for in-flight fetches, then aborts whatever is left.

pub mod config;
pub mod error;
pub mod scheduler;

pub use config::ConfigManager;
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{RefreshScheduler, SchedulerHandle, SchedulerOptions, SchedulerState};
