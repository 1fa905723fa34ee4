//! Dashboard and report rendering.

use std::fmt::Write as _;
use std::time::Duration;

use serde::Serialize;
use spirewatch_core::uptime::format_uptime;
use spirewatch_core::{AgentRecord, Category, RegistrationEntry, ServerHealth, Settings, Snapshot};
use spirewatch_metrics::DerivedMetrics;
use spirewatch_state::StateView;

/// Human-readable dashboard: summary counters, then one section per
/// category with its status line.
pub fn dashboard(view: &StateView, settings: &Settings, metrics: &DerivedMetrics) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "spirewatch | server: {} | workload: {} | refresh: {}s | revision {}",
        settings.server_context(),
        settings.workload_context(),
        settings.refresh_interval_secs(),
        view.revision,
    );
    let _ = writeln!(
        out,
        "registrations {} (node {}, workload {})   \
         agents {} (healthy {}, unhealthy {}, unknown {})",
        metrics.total_registrations,
        metrics.node_registrations,
        metrics.workload_registrations,
        metrics.total_agents,
        metrics.healthy_agents,
        metrics.unhealthy_agents,
        metrics.unknown_agents,
    );
    let _ = writeln!(
        out,
        "workloads (estimated) {} (active {}, pending {})",
        metrics.total_workloads, metrics.active_workloads, metrics.pending_workloads,
    );

    section(&mut out, view, Category::Registrations);
    for entry in view.registrations() {
        let _ = writeln!(
            out,
            "  {:<48} {:<56} {}",
            entry.id,
            entry.parent_id,
            entry.selectors_display()
        );
    }

    section(&mut out, view, Category::Agents);
    for agent in view.agents() {
        let _ = writeln!(
            out,
            "  {:<20} {:<10} {:<12} {:<8} {}",
            agent.name,
            agent.status.as_str(),
            agent.node,
            agent.version,
            format_uptime(agent.uptime)
        );
    }

    section(&mut out, view, Category::Server);
    if let Some(ref server) = view.server.data {
        let _ = writeln!(
            out,
            "  status {}  version {}  uptime {}",
            server.status,
            server.version,
            format_uptime(Duration::from_secs(server.uptime_seconds))
        );
    }

    out
}

fn section(out: &mut String, view: &StateView, category: Category) {
    let _ = writeln!(out);
    let _ = writeln!(out, "[{category}] {}", view.status_line(category));
}

#[derive(Serialize)]
struct Report<'a> {
    settings: &'a Settings,
    metrics: &'a DerivedMetrics,
    revision: u64,
    registrations: &'a Snapshot<Vec<RegistrationEntry>>,
    agents: &'a Snapshot<Vec<AgentRecord>>,
    server: &'a Snapshot<ServerHealth>,
}

/// Full state plus derived metrics as pretty-printed JSON.
pub fn json(
    view: &StateView,
    settings: &Settings,
    metrics: &DerivedMetrics,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Report {
        settings,
        metrics,
        revision: view.revision,
        registrations: &view.registrations,
        agents: &view.agents,
        server: &view.server,
    })
}
