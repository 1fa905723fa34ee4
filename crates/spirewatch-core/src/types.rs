//! Domain types for the spirewatch dashboard.
//!
//! These types describe the status data fetched from a workload-identity
//! control plane: registration entries, agent records, and server health.
//! Each category is held in its own [`Snapshot`], fetched and replaced
//! independently of the others.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ── Categories ─────────────────────────────────────────────────────

/// One independently fetched and stored kind of status data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Registrations,
    Agents,
    Server,
}

impl Category {
    /// Every category, in refresh order.
    pub const ALL: [Category; 3] = [Category::Registrations, Category::Agents, Category::Server];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Registrations => "registrations",
            Category::Agents => "agents",
            Category::Server => "server",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a category name is not recognised.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown category: {0:?} (expected registrations, agents, or server)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "registrations" | "registration" | "entries" => Ok(Category::Registrations),
            "agents" | "agent" => Ok(Category::Agents),
            "server" | "health" | "server-health" => Ok(Category::Server),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

// ── Health ─────────────────────────────────────────────────────────

/// Health of an agent or of the server.
///
/// Any status string other than `Healthy` / `Unhealthy` (case-insensitive)
/// maps to `Unknown` instead of being folded into either bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

impl HealthStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "healthy" => HealthStatus::Healthy,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "Healthy",
            HealthStatus::Unhealthy => "Unhealthy",
            HealthStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for HealthStatus {
    fn from(s: String) -> Self {
        HealthStatus::parse(&s)
    }
}

impl From<HealthStatus> for String {
    fn from(status: HealthStatus) -> Self {
        status.as_str().to_string()
    }
}

// ── Registrations ──────────────────────────────────────────────────

/// A registration entry mapping an identity to its parent and selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationEntry {
    /// URI-like identity, e.g. `spiffe://example.org/workload/service1`.
    pub id: String,
    pub parent_id: String,
    /// Accepts either a JSON array or a comma-joined string.
    #[serde(deserialize_with = "deserialize_selectors")]
    pub selectors: BTreeSet<String>,
}

impl RegistrationEntry {
    pub fn new<I, S>(id: impl Into<String>, parent_id: impl Into<String>, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            parent_id: parent_id.into(),
            selectors: selectors
                .into_iter()
                .map(Into::into)
                .filter_map(|s| normalize_selector(&s))
                .collect(),
        }
    }

    /// Split a comma-joined selector list (`k8s:ns:workload,k8s:sa:default`).
    pub fn parse_selectors(joined: &str) -> BTreeSet<String> {
        joined.split(',').filter_map(normalize_selector).collect()
    }

    pub fn selectors_display(&self) -> String {
        self.selectors
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn normalize_selector(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SelectorsRepr {
    Joined(String),
    List(Vec<String>),
}

fn deserialize_selectors<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match SelectorsRepr::deserialize(deserializer)? {
        SelectorsRepr::Joined(joined) => RegistrationEntry::parse_selectors(&joined),
        SelectorsRepr::List(list) => list.iter().filter_map(|s| normalize_selector(s)).collect(),
    })
}

// ── Agents ─────────────────────────────────────────────────────────

/// Status of a single agent as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub name: String,
    pub status: HealthStatus,
    pub node: String,
    pub version: String,
    /// Exchanged as text such as `"2d 5h 30m"`.
    #[serde(with = "crate::uptime::text")]
    pub uptime: Duration,
}

// ── Server ─────────────────────────────────────────────────────────

/// Health summary of the control-plane server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerHealth {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub version: String,
}

// ── Snapshot ───────────────────────────────────────────────────────

/// The latest known state of one category.
///
/// `data` is replaced wholesale on every successful fetch. A failed fetch
/// only sets `error` and `checked_at`; the previous data stays visible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot<T> {
    /// Last successfully fetched data, absent until the first success.
    pub data: Option<T>,
    /// Unix timestamp (seconds) of the last successful fetch.
    pub fetched_at: Option<u64>,
    /// Unix timestamp (seconds) of the last fetch attempt, successful or not.
    pub checked_at: Option<u64>,
    /// Error from the most recent attempt, cleared on success.
    pub error: Option<String>,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            fetched_at: None,
            checked_at: None,
            error: None,
        }
    }
}

impl<T> Snapshot<T> {
    /// A snapshot for a category that has never been fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A snapshot holding freshly fetched data.
    pub fn loaded(data: T, at: u64) -> Self {
        Self {
            data: Some(data),
            fetched_at: Some(at),
            checked_at: Some(at),
            error: None,
        }
    }

    /// Derive the snapshot recorded after a failed fetch: same data,
    /// new error.
    pub fn with_error(&self, error: impl Into<String>, at: u64) -> Self
    where
        T: Clone,
    {
        Self {
            data: self.data.clone(),
            fetched_at: self.fetched_at,
            checked_at: Some(at),
            error: Some(error.into()),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    /// Data is present but the latest attempt failed.
    pub fn is_stale(&self) -> bool {
        self.data.is_some() && self.error.is_some()
    }

    /// At least one fetch attempt has completed.
    pub fn has_reported(&self) -> bool {
        self.checked_at.is_some()
    }
}

/// Short description of loaded category data for status lines.
pub trait LoadedSummary {
    fn loaded_summary(&self) -> String;
}

impl LoadedSummary for Vec<RegistrationEntry> {
    fn loaded_summary(&self) -> String {
        format!("Loaded {} entries", self.len())
    }
}

impl LoadedSummary for Vec<AgentRecord> {
    fn loaded_summary(&self) -> String {
        format!("Loaded {} agents", self.len())
    }
}

impl LoadedSummary for ServerHealth {
    fn loaded_summary(&self) -> String {
        "Loaded".to_string()
    }
}

impl<T: LoadedSummary> Snapshot<T> {
    /// One-line status for a category: loading, loaded, or error.
    pub fn status_line(&self) -> String {
        if let Some(ref error) = self.error {
            return format!("Error - {error}");
        }
        match self.data {
            Some(ref data) => data.loaded_summary(),
            None => "Loading...".to_string(),
        }
    }
}

/// Current Unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str, status: HealthStatus) -> AgentRecord {
        AgentRecord {
            name: name.to_string(),
            status,
            node: "node1".to_string(),
            version: "1.6.3".to_string(),
            uptime: Duration::from_secs(900),
        }
    }

    #[test]
    fn health_status_parses_known_and_unknown() {
        assert_eq!(HealthStatus::parse("Healthy"), HealthStatus::Healthy);
        assert_eq!(HealthStatus::parse(" unhealthy "), HealthStatus::Unhealthy);
        assert_eq!(HealthStatus::parse("Degraded"), HealthStatus::Unknown);
        assert_eq!(HealthStatus::parse(""), HealthStatus::Unknown);
    }

    #[test]
    fn health_status_serde_uses_display_names() {
        let json = serde_json::to_string(&HealthStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"Unhealthy\"");
        let status: HealthStatus = serde_json::from_str("\"Crashlooping\"").unwrap();
        assert_eq!(status, HealthStatus::Unknown);
    }

    #[test]
    fn category_from_str() {
        assert_eq!("agents".parse::<Category>().unwrap(), Category::Agents);
        assert_eq!("Server".parse::<Category>().unwrap(), Category::Server);
        assert_eq!(
            "registrations".parse::<Category>().unwrap(),
            Category::Registrations
        );
        assert!("nodes".parse::<Category>().is_err());
    }

    #[test]
    fn selectors_parse_and_dedupe() {
        let selectors =
            RegistrationEntry::parse_selectors("k8s:sa:default, k8s:ns:workload,,k8s:sa:default");
        assert_eq!(selectors.len(), 2);
        assert!(selectors.contains("k8s:ns:workload"));

        let entry = RegistrationEntry::new("id", "parent", ["b", "a", " "]);
        assert_eq!(entry.selectors_display(), "a,b");
    }

    #[test]
    fn registration_accepts_joined_or_listed_selectors() {
        let joined: RegistrationEntry = serde_json::from_str(
            r#"{"id":"spiffe://x/workload/a","parent_id":"p","selectors":"k8s:ns:a,k8s:sa:b"}"#,
        )
        .unwrap();
        let listed: RegistrationEntry = serde_json::from_str(
            r#"{"id":"spiffe://x/workload/a","parent_id":"p","selectors":["k8s:sa:b","k8s:ns:a"]}"#,
        )
        .unwrap();
        assert_eq!(joined, listed);
    }

    #[test]
    fn agent_record_uptime_is_text() {
        let json = serde_json::to_value(agent("spire-agent-3", HealthStatus::Unhealthy)).unwrap();
        assert_eq!(json["uptime"], "0h 15m");
        assert_eq!(json["status"], "Unhealthy");
    }

    #[test]
    fn failed_fetch_keeps_previous_data() {
        let loaded = Snapshot::loaded(vec![agent("a", HealthStatus::Healthy)], 100);
        let failed = loaded.with_error("connection refused", 130);

        assert_eq!(failed.data, loaded.data);
        assert_eq!(failed.fetched_at, Some(100));
        assert_eq!(failed.checked_at, Some(130));
        assert!(failed.is_stale());
        assert_eq!(failed.status_line(), "Error - connection refused");
    }

    #[test]
    fn status_lines() {
        let empty: Snapshot<Vec<AgentRecord>> = Snapshot::empty();
        assert_eq!(empty.status_line(), "Loading...");
        assert!(!empty.has_reported());

        let regs = Snapshot::loaded(vec![RegistrationEntry::new("a", "b", ["c"])], 1);
        assert_eq!(regs.status_line(), "Loaded 1 entries");

        let server = Snapshot::loaded(ServerHealth::default(), 1);
        assert_eq!(server.status_line(), "Loaded");

        let never_loaded: Snapshot<ServerHealth> = Snapshot::empty().with_error("timeout", 5);
        assert!(!never_loaded.is_loaded());
        assert!(!never_loaded.is_stale());
        assert_eq!(never_loaded.status_line(), "Error - timeout");
    }
}
