//! spirewatch-source — where status data comes from.
//!
//! A [`DataSource`] fetches each category on demand. Calls may fail and
//! may complete in any order; the refresh scheduler runs them
//! concurrently and records each result independently.
//!
//! # Implementations
//!
//! ```text
//! DataSource
//!   ├── FixtureSource    built-in demonstration data, optional latency/failures
//!   └── DirectorySource  registrations.json / agents.json / server.json
//! ```

pub mod directory;
pub mod error;
pub mod fixture;
pub mod source;

pub use directory::DirectorySource;
pub use error::{FetchError, FetchResult};
pub use fixture::FixtureSource;
pub use source::DataSource;
