//! Prometheus text exposition format.
//!
//! Renders derived metrics and per-category freshness for scraping by a
//! Prometheus server or compatible agent.

use std::fmt::Write as _;

use spirewatch_core::{Category, HealthStatus};
use spirewatch_state::StateView;

use crate::deriver::DerivedMetrics;

/// Render derived metrics plus category freshness as Prometheus text.
pub fn render_prometheus(metrics: &DerivedMetrics, view: &StateView) -> String {
    let mut out = String::new();

    header(&mut out, "spirewatch_registrations", "Registration entries by kind.", "gauge");
    sample(&mut out, "spirewatch_registrations", "kind", "node", metrics.node_registrations);
    sample(
        &mut out,
        "spirewatch_registrations",
        "kind",
        "workload",
        metrics.workload_registrations,
    );

    header(&mut out, "spirewatch_agents", "Agents by reported health.", "gauge");
    sample(&mut out, "spirewatch_agents", "status", "healthy", metrics.healthy_agents);
    sample(&mut out, "spirewatch_agents", "status", "unhealthy", metrics.unhealthy_agents);
    sample(&mut out, "spirewatch_agents", "status", "unknown", metrics.unknown_agents);

    header(
        &mut out,
        "spirewatch_workloads_estimated",
        "Estimated workloads (heuristic from healthy agent count).",
        "gauge",
    );
    sample(&mut out, "spirewatch_workloads_estimated", "state", "total", metrics.total_workloads);
    sample(&mut out, "spirewatch_workloads_estimated", "state", "active", metrics.active_workloads);
    sample(
        &mut out,
        "spirewatch_workloads_estimated",
        "state",
        "pending",
        metrics.pending_workloads,
    );

    if let Some(ref server) = view.server.data {
        header(&mut out, "spirewatch_server_healthy", "1 if the server reports Healthy.", "gauge");
        let _ = writeln!(
            out,
            "spirewatch_server_healthy {}",
            u8::from(server.status == HealthStatus::Healthy)
        );
        header(&mut out, "spirewatch_server_uptime_seconds", "Server uptime.", "gauge");
        let _ = writeln!(out, "spirewatch_server_uptime_seconds {}", server.uptime_seconds);
    }

    header(
        &mut out,
        "spirewatch_fetch_error",
        "1 if the latest fetch of the category failed.",
        "gauge",
    );
    for category in Category::ALL {
        let failed = view.error(category).is_some();
        sample(
            &mut out,
            "spirewatch_fetch_error",
            "category",
            category.as_str(),
            u64::from(failed),
        );
    }

    header(
        &mut out,
        "spirewatch_last_success_timestamp_seconds",
        "Unix time of the last successful fetch.",
        "gauge",
    );
    for category in Category::ALL {
        if let Some(at) = view.fetched_at(category) {
            sample(
                &mut out,
                "spirewatch_last_success_timestamp_seconds",
                "category",
                category.as_str(),
                at,
            );
        }
    }

    header(
        &mut out,
        "spirewatch_state_updates_total",
        "Updates applied to the state store.",
        "counter",
    );
    let _ = writeln!(out, "spirewatch_state_updates_total {}", view.revision);

    out
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
}

fn sample(out: &mut String, name: &str, label: &str, value_label: &str, value: u64) {
    let _ = writeln!(out, "{name}{{{label}=\"{value_label}\"}} {value}");
}
