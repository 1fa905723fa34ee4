//! Scheduler error types.

use thiserror::Error;

/// Errors reported to callers of the scheduler.
///
/// Fetch failures never show up here: they are recorded in the state
/// store against their category.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no async runtime available to run the scheduler: {0}")]
    NoRuntime(String),

    #[error("scheduler is stopped")]
    Stopped,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
