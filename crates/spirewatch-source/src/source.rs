//! The data source contract.

use std::future::Future;

use spirewatch_core::{AgentRecord, RegistrationEntry, ServerHealth};

use crate::error::FetchResult;

/// Fetches status data for each category on demand.
///
/// The three operations are independent: callers may invoke them
/// concurrently and any of them may fail while the others succeed.
/// Implementations are shared across background tasks, so they must be
/// `Send + Sync` and their futures `Send`.
pub trait DataSource: Send + Sync + 'static {
    fn fetch_registrations(
        &self,
    ) -> impl Future<Output = FetchResult<Vec<RegistrationEntry>>> + Send;

    fn fetch_agents(&self) -> impl Future<Output = FetchResult<Vec<AgentRecord>>> + Send;

    fn fetch_server_health(&self) -> impl Future<Output = FetchResult<ServerHealth>> + Send;
}
