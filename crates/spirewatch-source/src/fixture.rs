//! In-memory data source.
//!
//! Serves fixed data, optionally after a simulated delay and with chosen
//! categories failing. `FixtureSource::demo()` is the demonstration data
//! set the dashboard shows when no real source is configured.

use std::collections::HashMap;
use std::time::Duration;

use spirewatch_core::{AgentRecord, Category, HealthStatus, RegistrationEntry, ServerHealth};
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::source::DataSource;

const TRUST_DOMAIN: &str = "spiffe://example.org";
const DEMO_VERSION: &str = "1.6.3";

#[derive(Debug, Clone)]
pub struct FixtureSource {
    registrations: Vec<RegistrationEntry>,
    agents: Vec<AgentRecord>,
    server: ServerHealth,
    /// Delay applied before every fetch completes.
    latency: Duration,
    /// Categories that fail, with the message they report.
    failures: HashMap<Category, String>,
}

impl FixtureSource {
    pub fn new(
        registrations: Vec<RegistrationEntry>,
        agents: Vec<AgentRecord>,
        server: ServerHealth,
    ) -> Self {
        Self {
            registrations,
            agents,
            server,
            latency: Duration::ZERO,
            failures: HashMap::new(),
        }
    }

    /// Three workload registrations, three agents (one unhealthy) and a
    /// healthy server.
    pub fn demo() -> Self {
        let parent = format!("{TRUST_DOMAIN}/agent/k8s_psat/cluster/spire-agent");
        let registrations = (1..=3)
            .map(|i| {
                RegistrationEntry::new(
                    format!("{TRUST_DOMAIN}/workload/service{i}"),
                    parent.clone(),
                    RegistrationEntry::parse_selectors(&format!(
                        "k8s:ns:workload,k8s:sa:default,k8s:pod-label:app:service{i}"
                    )),
                )
            })
            .collect();

        let agents = vec![
            demo_agent(1, HealthStatus::Healthy, 2 * DAY + 5 * HOUR + 30 * MINUTE),
            demo_agent(2, HealthStatus::Healthy, 2 * DAY + 5 * HOUR + 25 * MINUTE),
            demo_agent(3, HealthStatus::Unhealthy, 15 * MINUTE),
        ];

        let server = ServerHealth {
            status: HealthStatus::Healthy,
            uptime_seconds: 3 * DAY + 12 * HOUR + 45 * MINUTE,
            version: DEMO_VERSION.to_string(),
        };

        Self::new(registrations, agents, server)
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every fetch of `category` fail with `message`.
    pub fn with_failure(mut self, category: Category, message: impl Into<String>) -> Self {
        self.failures.insert(category, message.into());
        self
    }

    async fn serve<T: Clone>(&self, category: Category, data: &T) -> FetchResult<T> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = self.failures.get(&category) {
            debug!(%category, %message, "fixture fetch failing");
            return Err(FetchError::Unavailable(message.clone()));
        }
        Ok(data.clone())
    }
}

impl DataSource for FixtureSource {
    async fn fetch_registrations(&self) -> FetchResult<Vec<RegistrationEntry>> {
        self.serve(Category::Registrations, &self.registrations).await
    }

    async fn fetch_agents(&self) -> FetchResult<Vec<AgentRecord>> {
        self.serve(Category::Agents, &self.agents).await
    }

    async fn fetch_server_health(&self) -> FetchResult<ServerHealth> {
        self.serve(Category::Server, &self.server).await
    }
}

const MINUTE: u64 = 60;
const HOUR: u64 = 60 * MINUTE;
const DAY: u64 = 24 * HOUR;

fn demo_agent(index: u32, status: HealthStatus, uptime_secs: u64) -> AgentRecord {
    AgentRecord {
        name: format!("spire-agent-{index}"),
        status,
        node: format!("node{index}"),
        version: DEMO_VERSION.to_string(),
        uptime: Duration::from_secs(uptime_secs),
    }
}
