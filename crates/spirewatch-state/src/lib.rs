//! spirewatch-state — in-memory state store for spirewatch.
//!
//! Holds the latest [`Snapshot`](spirewatch_core::Snapshot) of each
//! category and serves consistent reads to any number of readers while
//! the refresh scheduler publishes updates.
//!
//! # Architecture
//!
//! ```text
//! StateStore (Clone, Arc-backed)
//!   ├── registrations: RwLock<Arc<Snapshot<Vec<RegistrationEntry>>>>
//!   ├── agents:        RwLock<Arc<Snapshot<Vec<AgentRecord>>>>
//!   ├── server:        RwLock<Arc<Snapshot<ServerHealth>>>
//!   └── revision:      watch::Sender<u64>  → subscribers re-read on change
//! ```
//!
//! Each category has its own lock, so an update to one never waits on
//! readers of another. Lock hold time is a single `Arc` clone or swap.

pub mod store;
pub mod update;

pub use store::StateStore;
pub use update::{CategoryUpdate, StateView};
