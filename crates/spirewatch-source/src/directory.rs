//! Directory-backed data source.
//!
//! Reads one JSON document per category from a directory, typically kept
//! up to date by an external exporter:
//!
//! ```text
//! <dir>/registrations.json   [RegistrationEntry, ...]
//! <dir>/agents.json          [AgentRecord, ...]
//! <dir>/server.json          ServerHealth
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use spirewatch_core::{AgentRecord, Category, RegistrationEntry, ServerHealth};
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::source::DataSource;

#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document holding `category`.
    pub fn path_for(&self, category: Category) -> PathBuf {
        let file = match category {
            Category::Registrations => "registrations.json",
            Category::Agents => "agents.json",
            Category::Server => "server.json",
        };
        self.dir.join(file)
    }

    async fn read<T: DeserializeOwned>(&self, category: Category) -> FetchResult<T> {
        let path = self.path_for(category);
        let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FetchError::Unavailable(format!("{} not found", path.display())),
            _ => FetchError::Io(format!("{}: {e}", path.display())),
        })?;
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::Malformed(format!("{}: {e}", path.display())))?;
        debug!(%category, path = %path.display(), bytes = bytes.len(), "read category document");
        Ok(value)
    }
}

impl DataSource for DirectorySource {
    async fn fetch_registrations(&self) -> FetchResult<Vec<RegistrationEntry>> {
        self.read(Category::Registrations).await
    }

    async fn fetch_agents(&self) -> FetchResult<Vec<AgentRecord>> {
        self.read(Category::Agents).await
    }

    async fn fetch_server_health(&self) -> FetchResult<ServerHealth> {
        self.read(Category::Server).await
    }
}
