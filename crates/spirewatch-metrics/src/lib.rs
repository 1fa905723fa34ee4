//! spirewatch-metrics — summary counters derived from fetched status data.
//!
//! Everything here is a pure function of the current snapshots: nothing is
//! stored, and deriving twice from the same view gives the same result.
//!
//! # Architecture
//!
//! ```text
//! StateView
//!   ├── count_registrations() → RegistrationCounts   (node vs workload by id)
//!   ├── tally_agents()        → AgentCounts          (healthy / unhealthy / unknown)
//!   └── estimate_workloads()  → WorkloadEstimate     (placeholder heuristic)
//!        └── derive() → DerivedMetrics → render_prometheus()
//! ```

pub mod deriver;
pub mod prometheus;

pub use deriver::{
    AgentCounts, DerivedMetrics, RegistrationCounts, RegistrationKind, WorkloadEstimate,
    classify, count_registrations, derive, estimate_workloads, tally_agents,
};
pub use prometheus::render_prometheus;
