//! Data source selected by configuration.

use anyhow::bail;
use spirewatch_core::config::{SourceConfig, SourceKind};
use spirewatch_core::{AgentRecord, RegistrationEntry, ServerHealth};
use spirewatch_source::{DataSource, DirectorySource, FetchResult, FixtureSource};

pub enum ConfiguredSource {
    Fixture(FixtureSource),
    Directory(DirectorySource),
}

impl ConfiguredSource {
    pub fn from_config(config: &SourceConfig) -> anyhow::Result<Self> {
        match (config.kind, &config.dir) {
            (SourceKind::Fixture, _) => Ok(Self::Fixture(FixtureSource::demo())),
            (SourceKind::Directory, Some(dir)) => Ok(Self::Directory(DirectorySource::new(dir))),
            (SourceKind::Directory, None) => {
                bail!("source kind \"directory\" needs a data directory (--dir or source.dir)")
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Fixture(_) => "fixture (demo data)".to_string(),
            Self::Directory(source) => format!("directory {}", source.dir().display()),
        }
    }
}

impl DataSource for ConfiguredSource {
    async fn fetch_registrations(&self) -> FetchResult<Vec<RegistrationEntry>> {
        match self {
            Self::Fixture(source) => source.fetch_registrations().await,
            Self::Directory(source) => source.fetch_registrations().await,
        }
    }

    async fn fetch_agents(&self) -> FetchResult<Vec<AgentRecord>> {
        match self {
            Self::Fixture(source) => source.fetch_agents().await,
            Self::Directory(source) => source.fetch_agents().await,
        }
    }

    async fn fetch_server_health(&self) -> FetchResult<ServerHealth> {
        match self {
            Self::Fixture(source) => source.fetch_server_health().await,
            Self::Directory(source) => source.fetch_server_health().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn directory_kind_requires_dir() {
        let config = SourceConfig {
            kind: SourceKind::Directory,
            ..SourceConfig::default()
        };
        assert!(ConfiguredSource::from_config(&config).is_err());

        let config = SourceConfig {
            kind: SourceKind::Directory,
            dir: Some(PathBuf::from("/var/lib/spirewatch/data")),
            ..SourceConfig::default()
        };
        let source = ConfiguredSource::from_config(&config).unwrap();
        assert_eq!(source.describe(), "directory /var/lib/spirewatch/data");
    }

    #[tokio::test]
    async fn fixture_kind_serves_demo_data() {
        let source = ConfiguredSource::from_config(&SourceConfig::default()).unwrap();
        assert_eq!(source.fetch_agents().await.unwrap().len(), 3);
    }
}
