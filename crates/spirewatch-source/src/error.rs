//! Fetch error types.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for data source fetches.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors a data source can report for one category.
///
/// Fetch errors are scoped to their category: they are recorded next to
/// that category's last good data and never affect other fetches.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("i/o error: {0}")]
    Io(String),
}
