//! Refresh cycle tests.
//!
//! Run on a paused clock: tokio advances time whenever every task is
//! waiting, so the interval and latency assertions are exact and fast.

use std::time::Duration;

use spirewatch_core::{AgentRecord, Category, RegistrationEntry, ServerHealth, Settings};
use spirewatch_scheduler::{ConfigManager, RefreshScheduler, SchedulerOptions, SchedulerState};
use spirewatch_source::{DataSource, FetchResult, FixtureSource};
use spirewatch_state::StateStore;
use tokio::time::{Instant, sleep};

fn config(interval_secs: u64) -> ConfigManager {
    ConfigManager::new(Settings::default().with_refresh_interval(interval_secs))
}

async fn wait_for_revision(store: &StateStore, revision: u64) {
    store
        .subscribe()
        .wait_for(|r| *r >= revision)
        .await
        .unwrap();
}

/// Agent listing panics; the other categories come from the demo data.
struct PanickingAgents(FixtureSource);

impl DataSource for PanickingAgents {
    async fn fetch_registrations(&self) -> FetchResult<Vec<RegistrationEntry>> {
        self.0.fetch_registrations().await
    }

    async fn fetch_agents(&self) -> FetchResult<Vec<AgentRecord>> {
        panic!("agent listing exploded")
    }

    async fn fetch_server_health(&self) -> FetchResult<ServerHealth> {
        self.0.fetch_server_health().await
    }
}

#[tokio::test(start_paused = true)]
async fn first_cycle_is_immediate_then_periodic() {
    let store = StateStore::new();
    let start = Instant::now();
    let handle = RefreshScheduler::new(FixtureSource::demo(), store.clone(), &config(30))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(handle.cycles_started(), 1);

    let view = store.get();
    assert_eq!(view.registrations().len(), 3);
    assert_eq!(view.agents().len(), 3);
    assert!(view.server.is_loaded());

    wait_for_revision(&store, 6).await;
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert!(start.elapsed() < Duration::from_secs(31));
    assert_eq!(handle.cycles_started(), 2);

    assert_eq!(handle.shutdown().await, SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn failing_category_does_not_affect_others() {
    let store = StateStore::new();
    let source = FixtureSource::demo().with_failure(Category::Agents, "connection refused");
    let handle = RefreshScheduler::new(source, store.clone(), &config(30))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    let view = store.get();
    assert_eq!(view.registrations().len(), 3);
    assert_eq!(view.error(Category::Registrations), None);
    assert!(view.server.is_loaded());
    assert!(!view.agents.is_loaded());
    assert!(
        view.error(Category::Agents)
            .unwrap()
            .contains("connection refused")
    );
    assert_eq!(
        view.status_line(Category::Agents),
        "Error - source unavailable: connection refused"
    );

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_time_out_per_category() {
    let store = StateStore::new();
    let source = FixtureSource::demo().with_latency(Duration::from_secs(60));
    let start = Instant::now();
    let handle = RefreshScheduler::new(source, store.clone(), &config(300))
        .with_options(SchedulerOptions::default().with_fetch_timeout(Duration::from_secs(10)))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    assert!(start.elapsed() >= Duration::from_secs(10));
    assert!(start.elapsed() < Duration::from_secs(11));

    let view = store.get();
    for category in Category::ALL {
        assert!(view.error(category).unwrap().contains("timed out"));
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interval_change_keeps_in_flight_fetches() {
    let store = StateStore::new();
    let config = config(30);
    let source = FixtureSource::demo().with_latency(Duration::from_secs(20));
    let start = Instant::now();
    let handle = RefreshScheduler::new(source, store.clone(), &config)
        .with_options(SchedulerOptions::default().with_fetch_timeout(Duration::from_secs(60)))
        .start()
        .unwrap();

    sleep(Duration::from_secs(5)).await;
    assert_eq!(handle.state(), SchedulerState::Running);
    assert!(config.set_refresh_interval(10));

    // First-cycle fetches still land at t=20, and the restarted timer has
    // already started a second cycle at t=15.
    wait_for_revision(&store, 3).await;
    assert!(start.elapsed() >= Duration::from_secs(20));
    assert!(start.elapsed() < Duration::from_secs(21));
    assert_eq!(handle.cycles_started(), 2);

    let view = store.get();
    for category in Category::ALL {
        assert_eq!(view.error(category), None);
        assert!(view.has_reported(category));
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn manual_refresh_does_not_reset_timer() {
    let store = StateStore::new();
    let start = Instant::now();
    let handle = RefreshScheduler::new(FixtureSource::demo(), store.clone(), &config(30))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    sleep(Duration::from_secs(20)).await;

    handle.refresh(Category::Agents).unwrap();
    wait_for_revision(&store, 4).await;
    assert_eq!(handle.cycles_started(), 1);

    // The next periodic cycle still fires at t=30, not t=50.
    wait_for_revision(&store, 7).await;
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert!(start.elapsed() < Duration::from_secs(31));
    assert_eq!(handle.cycles_started(), 2);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn refresh_all_fetches_every_category() {
    let store = StateStore::new();
    let handle = RefreshScheduler::new(FixtureSource::demo(), store.clone(), &config(300))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    handle.refresh_all().unwrap();
    wait_for_revision(&store, 6).await;
    assert_eq!(handle.cycles_started(), 1);

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_aborts_after_grace_period() {
    let store = StateStore::new();
    let source = FixtureSource::demo().with_latency(Duration::from_secs(60));
    let options = SchedulerOptions::default()
        .with_fetch_timeout(Duration::from_secs(120))
        .with_shutdown_grace(Duration::from_secs(5));
    let start = Instant::now();
    let handle = RefreshScheduler::new(source, store.clone(), &config(30))
        .with_options(options)
        .start()
        .unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.state(), SchedulerState::Running);

    assert_eq!(handle.shutdown().await, SchedulerState::Stopped);
    assert!(start.elapsed() >= Duration::from_secs(6));
    assert!(start.elapsed() < Duration::from_secs(7));
    // Aborted fetches record nothing.
    assert_eq!(store.revision(), 0);
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_fetches_within_grace() {
    let store = StateStore::new();
    let source = FixtureSource::demo().with_latency(Duration::from_secs(2));
    let handle = RefreshScheduler::new(source, store.clone(), &config(30))
        .start()
        .unwrap();

    sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.shutdown().await, SchedulerState::Stopped);
    assert_eq!(store.revision(), 3);
    assert_eq!(store.get().agents().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn dropping_handle_stops_scheduler() {
    let store = StateStore::new();
    let handle = RefreshScheduler::new(FixtureSource::demo(), store.clone(), &config(30))
        .start()
        .unwrap();
    let mut state = handle.subscribe_state();

    wait_for_revision(&store, 3).await;
    drop(handle);

    state
        .wait_for(|s| *s == SchedulerState::Stopped)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn panicking_fetch_is_recorded_as_error() {
    let store = StateStore::new();
    let source = PanickingAgents(FixtureSource::demo());
    let handle = RefreshScheduler::new(source, store.clone(), &config(30))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    let view = store.get();
    assert!(view.error(Category::Agents).unwrap().contains("panicked"));
    assert_eq!(view.registrations().len(), 3);
    assert!(view.server.is_loaded());

    // The loop survives and keeps scheduling.
    wait_for_revision(&store, 6).await;
    assert_eq!(handle.cycles_started(), 2);
    assert_eq!(handle.shutdown().await, SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn huge_interval_change_keeps_scheduler_alive() {
    let store = StateStore::new();
    let config = config(30);
    let handle = RefreshScheduler::new(FixtureSource::demo(), store.clone(), &config)
        .start()
        .unwrap();
    wait_for_revision(&store, 3).await;

    let huge = Settings::refresh_interval_or_default(&i64::MAX.to_string());
    assert_eq!(huge, i64::MAX as u64);
    assert!(config.set_refresh_interval(huge));

    // The old 30 s timer is gone and the new one is far in the future.
    sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.cycles_started(), 1);

    handle.refresh(Category::Agents).unwrap();
    wait_for_revision(&store, 4).await;
    assert_eq!(handle.state(), SchedulerState::Idle);
    assert_eq!(handle.shutdown().await, SchedulerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn huge_interval_at_start_runs_first_cycle() {
    let store = StateStore::new();
    let handle = RefreshScheduler::new(FixtureSource::demo(), store.clone(), &config(u64::MAX))
        .start()
        .unwrap();

    wait_for_revision(&store, 3).await;
    handle.refresh_all().unwrap();
    wait_for_revision(&store, 6).await;
    assert_eq!(handle.cycles_started(), 1);
    assert_eq!(handle.shutdown().await, SchedulerState::Stopped);
}
