//! spirewatch.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::settings::{
    DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_SERVER_CONTEXT, DEFAULT_WORKLOAD_CONTEXT, Settings,
};

pub const DEFAULT_WORKLOADS_PER_AGENT: u32 = 3;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GRACE_PERIOD_SECS: u64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpirewatchConfig {
    pub dashboard: DashboardConfig,
    pub metrics: MetricsConfig,
    pub source: SourceConfig,
    pub shutdown: ShutdownConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub server_context: String,
    pub workload_context: String,
    /// Integer or string; anything that is not a positive integer falls
    /// back to the default.
    pub refresh_interval: Option<toml::Value>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_context: DEFAULT_SERVER_CONTEXT.to_string(),
            workload_context: DEFAULT_WORKLOAD_CONTEXT.to_string(),
            refresh_interval: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Assumed workloads per healthy agent for the workload estimate.
    pub workloads_per_agent: u32,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            workloads_per_agent: DEFAULT_WORKLOADS_PER_AGENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Built-in demonstration data.
    #[default]
    Fixture,
    /// JSON files read from `source.dir`.
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub dir: Option<PathBuf>,
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::Fixture,
            dir: None,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    pub grace_period_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: DEFAULT_GRACE_PERIOD_SECS,
        }
    }
}

impl SpirewatchConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SpirewatchConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The startup settings described by the `[dashboard]` section.
    pub fn settings(&self) -> Settings {
        let dashboard = &self.dashboard;
        let interval = match &dashboard.refresh_interval {
            None => DEFAULT_REFRESH_INTERVAL_SECS,
            Some(toml::Value::Integer(n)) => Settings::refresh_interval_or_default(&n.to_string()),
            Some(toml::Value::String(s)) => Settings::refresh_interval_or_default(s),
            Some(other) => {
                warn!(
                    value = %other,
                    default_secs = DEFAULT_REFRESH_INTERVAL_SECS,
                    "refresh_interval has an unsupported type, using default"
                );
                DEFAULT_REFRESH_INTERVAL_SECS
            }
        };
        Settings::new(&*dashboard.server_context, &*dashboard.workload_context, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = SpirewatchConfig::from_toml_str("").unwrap();
        assert_eq!(config.settings(), Settings::default());
        assert_eq!(config.metrics.workloads_per_agent, 3);
        assert_eq!(config.source.kind, SourceKind::Fixture);
        assert_eq!(config.source.fetch_timeout_secs, 10);
        assert_eq!(config.shutdown.grace_period_secs, 5);
    }

    #[test]
    fn parse_full() {
        let toml_str = r#"
[dashboard]
server_context = "upstream-spire-cluster"
workload_context = "downstream-spire-cluster"
refresh_interval = 10

[metrics]
workloads_per_agent = 5

[source]
kind = "directory"
dir = "/var/lib/spirewatch/data"
fetch_timeout_secs = 3
"#;
        let config = SpirewatchConfig::from_toml_str(toml_str).unwrap();
        let settings = config.settings();
        assert_eq!(settings.server_context(), "upstream-spire-cluster");
        assert_eq!(settings.refresh_interval_secs(), 10);
        assert_eq!(config.metrics.workloads_per_agent, 5);
        assert_eq!(config.source.kind, SourceKind::Directory);
        assert_eq!(
            config.source.dir.as_deref(),
            Some(Path::new("/var/lib/spirewatch/data"))
        );
    }

    #[test]
    fn invalid_interval_falls_back() {
        for value in ["\"abc\"", "0", "-3", "2.5", "true"] {
            let toml_str = format!("[dashboard]\nrefresh_interval = {value}\n");
            let config = SpirewatchConfig::from_toml_str(&toml_str).unwrap();
            assert_eq!(config.settings().refresh_interval_secs(), 30, "value {value}");
        }

        let config = SpirewatchConfig::from_toml_str("[dashboard]\nrefresh_interval = \"15\"\n")
            .unwrap();
        assert_eq!(config.settings().refresh_interval_secs(), 15);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SpirewatchConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("workloads_per_agent = 3"));
        let parsed = SpirewatchConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.settings(), config.settings());
    }
}
