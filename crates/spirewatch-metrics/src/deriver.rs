//! Derived metrics — counters computed from category snapshots.
//!
//! Registration classification and the workload estimate are heuristics
//! over the fetched data, not measurements:
//!
//! - A registration is a *node* registration when its id contains
//!   [`NODE_ID_MARKER`]; every other id counts as a workload registration.
//!   Nothing in the data structurally guarantees this convention.
//! - Workloads are *estimated* from agent health as
//!   `healthy_agents * workloads_per_agent`. This stands in for a real
//!   workload count until a source provides one.

use serde::Serialize;
use spirewatch_core::{AgentRecord, HealthStatus, RegistrationEntry};
use spirewatch_state::StateView;

pub use spirewatch_core::config::DEFAULT_WORKLOADS_PER_AGENT;

/// Id segment marking an agent (node) identity.
pub const NODE_ID_MARKER: &str = "/agent/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationKind {
    Node,
    Workload,
}

/// Classify a registration by its id.
pub fn classify(entry: &RegistrationEntry) -> RegistrationKind {
    if entry.id.contains(NODE_ID_MARKER) {
        RegistrationKind::Node
    } else {
        RegistrationKind::Workload
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationCounts {
    pub total: u64,
    pub node: u64,
    pub workload: u64,
}

pub fn count_registrations(entries: &[RegistrationEntry]) -> RegistrationCounts {
    entries
        .iter()
        .fold(RegistrationCounts::default(), |mut counts, entry| {
            counts.total += 1;
            match classify(entry) {
                RegistrationKind::Node => counts.node += 1,
                RegistrationKind::Workload => counts.workload += 1,
            }
            counts
        })
}

/// Agents bucketed by health. `Unknown` agents are counted on their own
/// and never folded into healthy or unhealthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AgentCounts {
    pub total: u64,
    pub healthy: u64,
    pub unhealthy: u64,
    pub unknown: u64,
}

pub fn tally_agents(agents: &[AgentRecord]) -> AgentCounts {
    agents
        .iter()
        .fold(AgentCounts::default(), |mut counts, agent| {
            counts.total += 1;
            match agent.status {
                HealthStatus::Healthy => counts.healthy += 1,
                HealthStatus::Unhealthy => counts.unhealthy += 1,
                HealthStatus::Unknown => counts.unknown += 1,
            }
            counts
        })
}

/// Estimated workload counts. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkloadEstimate {
    pub total: u64,
    pub active: u64,
    pub pending: u64,
}

/// Estimate workloads from agent health.
///
/// `total = healthy * workloads_per_agent`, `pending = unhealthy`,
/// `active = total - unhealthy` clamped at zero.
pub fn estimate_workloads(agents: &AgentCounts, workloads_per_agent: u32) -> WorkloadEstimate {
    let total = agents.healthy.saturating_mul(u64::from(workloads_per_agent));
    WorkloadEstimate {
        total,
        active: total.saturating_sub(agents.unhealthy),
        pending: agents.unhealthy,
    }
}

/// All summary counters for one view of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DerivedMetrics {
    pub total_registrations: u64,
    pub node_registrations: u64,
    pub workload_registrations: u64,
    pub total_agents: u64,
    pub healthy_agents: u64,
    pub unhealthy_agents: u64,
    pub unknown_agents: u64,
    pub total_workloads: u64,
    pub active_workloads: u64,
    pub pending_workloads: u64,
}

impl DerivedMetrics {
    pub fn from_parts(
        registrations: RegistrationCounts,
        agents: AgentCounts,
        workloads: WorkloadEstimate,
    ) -> Self {
        Self {
            total_registrations: registrations.total,
            node_registrations: registrations.node,
            workload_registrations: registrations.workload,
            total_agents: agents.total,
            healthy_agents: agents.healthy,
            unhealthy_agents: agents.unhealthy,
            unknown_agents: agents.unknown,
            total_workloads: workloads.total,
            active_workloads: workloads.active,
            pending_workloads: workloads.pending,
        }
    }
}

/// Derive every counter from the last successfully fetched data.
///
/// Categories that have never loaded contribute zeros; stale data (latest
/// fetch failed) is still counted.
pub fn derive(view: &StateView, workloads_per_agent: u32) -> DerivedMetrics {
    let registrations = count_registrations(view.registrations());
    let agents = tally_agents(view.agents());
    let workloads = estimate_workloads(&agents, workloads_per_agent);
    DerivedMetrics::from_parts(registrations, agents, workloads)
}
