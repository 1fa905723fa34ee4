//! Values flowing into and out of the state store.

use std::sync::Arc;

use spirewatch_core::{AgentRecord, Category, RegistrationEntry, ServerHealth, Snapshot};

/// The outcome of one category fetch, ready to be recorded.
///
/// Errors are carried as display strings: that is all a snapshot keeps.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryUpdate {
    Registrations(Result<Vec<RegistrationEntry>, String>),
    Agents(Result<Vec<AgentRecord>, String>),
    Server(Result<ServerHealth, String>),
}

impl CategoryUpdate {
    /// A failed fetch of `category`.
    pub fn failed(category: Category, error: impl Into<String>) -> Self {
        let error = error.into();
        match category {
            Category::Registrations => CategoryUpdate::Registrations(Err(error)),
            Category::Agents => CategoryUpdate::Agents(Err(error)),
            Category::Server => CategoryUpdate::Server(Err(error)),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            CategoryUpdate::Registrations(_) => Category::Registrations,
            CategoryUpdate::Agents(_) => Category::Agents,
            CategoryUpdate::Server(_) => Category::Server,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CategoryUpdate::Registrations(Err(e))
            | CategoryUpdate::Agents(Err(e))
            | CategoryUpdate::Server(Err(e)) => Some(e),
            _ => None,
        }
    }
}

/// A read of all three categories.
///
/// Each snapshot is internally consistent; the three may come from
/// different refresh cycles since categories update independently.
#[derive(Debug, Clone)]
pub struct StateView {
    pub registrations: Arc<Snapshot<Vec<RegistrationEntry>>>,
    pub agents: Arc<Snapshot<Vec<AgentRecord>>>,
    pub server: Arc<Snapshot<ServerHealth>>,
    /// Number of updates applied to the store when this view was taken.
    pub revision: u64,
}

impl StateView {
    /// Registrations from the last successful fetch, empty if none yet.
    pub fn registrations(&self) -> &[RegistrationEntry] {
        self.registrations.data.as_deref().unwrap_or_default()
    }

    /// Agents from the last successful fetch, empty if none yet.
    pub fn agents(&self) -> &[AgentRecord] {
        self.agents.data.as_deref().unwrap_or_default()
    }

    /// Whether `category` has completed at least one fetch attempt.
    pub fn has_reported(&self, category: Category) -> bool {
        match category {
            Category::Registrations => self.registrations.has_reported(),
            Category::Agents => self.agents.has_reported(),
            Category::Server => self.server.has_reported(),
        }
    }

    /// Error from the latest attempt for `category`, if it failed.
    pub fn error(&self, category: Category) -> Option<&str> {
        match category {
            Category::Registrations => self.registrations.error.as_deref(),
            Category::Agents => self.agents.error.as_deref(),
            Category::Server => self.server.error.as_deref(),
        }
    }

    /// Unix timestamp of the last successful fetch of `category`.
    pub fn fetched_at(&self, category: Category) -> Option<u64> {
        match category {
            Category::Registrations => self.registrations.fetched_at,
            Category::Agents => self.agents.fetched_at,
            Category::Server => self.server.fetched_at,
        }
    }

    pub fn status_line(&self, category: Category) -> String {
        match category {
            Category::Registrations => self.registrations.status_line(),
            Category::Agents => self.agents.status_line(),
            Category::Server => self.server.status_line(),
        }
    }
}
