//! RefreshScheduler — periodic and on-demand category fetches.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use spirewatch_core::config::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_GRACE_PERIOD_SECS};
use spirewatch_core::{Category, Settings};
use spirewatch_source::{DataSource, FetchError, FetchResult};
use spirewatch_state::{CategoryUpdate, StateStore};
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ConfigManager;
use crate::error::{SchedulerError, SchedulerResult};

/// What the scheduler is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Waiting for the next tick or command.
    Idle,
    /// At least one fetch is in flight.
    Running,
    /// The loop has exited; no further fetches will start.
    Stopped,
}

/// Tunables that are not part of the user-facing settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Upper bound on a single fetch. Expiry is recorded as a
    /// [`FetchError::Timeout`] for that category.
    pub fetch_timeout: Duration,
    /// How long shutdown waits for in-flight fetches before aborting them.
    pub shutdown_grace: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_GRACE_PERIOD_SECS),
        }
    }
}

impl SchedulerOptions {
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, shutdown_grace: Duration) -> Self {
        self.shutdown_grace = shutdown_grace;
        self
    }
}

#[derive(Debug)]
enum Command {
    Refresh(Category),
    RefreshAll,
}

/// Builds and starts the background refresh loop.
pub struct RefreshScheduler<S: DataSource> {
    source: Arc<S>,
    store: StateStore,
    settings: watch::Receiver<Arc<Settings>>,
    options: SchedulerOptions,
}

impl<S: DataSource> RefreshScheduler<S> {
    pub fn new(source: S, store: StateStore, config: &ConfigManager) -> Self {
        Self {
            source: Arc::new(source),
            store,
            settings: config.subscribe(),
            options: SchedulerOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SchedulerOptions) -> Self {
        self.options = options;
        self
    }

    /// Spawn the refresh loop on the current tokio runtime.
    ///
    /// The first refresh cycle starts immediately; later cycles follow the
    /// configured interval.
    pub fn start(self) -> SchedulerResult<SchedulerHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| SchedulerError::NoRuntime(e.to_string()))?;

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Idle);
        let (cycles_tx, cycles_rx) = watch::channel(0);

        let worker = Worker {
            source: self.source,
            store: self.store,
            settings: self.settings,
            options: self.options,
            commands: commands_rx,
            shutdown: shutdown_rx,
            state: state_tx,
            cycles: cycles_tx,
            fetches: JoinSet::new(),
            in_flight: HashMap::new(),
        };
        let task = runtime.spawn(worker.run());

        Ok(SchedulerHandle {
            commands: commands_tx,
            shutdown: shutdown_tx,
            state: state_rx,
            cycles: cycles_rx,
            task,
        })
    }
}

/// Control over a running scheduler. Dropping the handle stops the loop
/// the same way [`SchedulerHandle::shutdown`] does, without waiting.
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<SchedulerState>,
    cycles: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Fetch one category now. The periodic timer is not affected.
    pub fn refresh(&self, category: Category) -> SchedulerResult<()> {
        self.send(Command::Refresh(category))
    }

    /// Fetch every category now. The periodic timer is not affected.
    pub fn refresh_all(&self) -> SchedulerResult<()> {
        self.send(Command::RefreshAll)
    }

    fn send(&self, command: Command) -> SchedulerResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SchedulerError::Stopped)
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    /// Number of timer-driven refresh cycles started so far. Manual
    /// refreshes are not counted.
    pub fn cycles_started(&self) -> u64 {
        *self.cycles.borrow()
    }

    /// Stop the timer, wait up to the grace period for in-flight fetches
    /// and abort the rest. Returns the final state.
    pub async fn shutdown(self) -> SchedulerState {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "scheduler loop failed");
        }
        *self.state.borrow()
    }
}

struct Worker<S: DataSource> {
    source: Arc<S>,
    store: StateStore,
    settings: watch::Receiver<Arc<Settings>>,
    options: SchedulerOptions,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: watch::Receiver<bool>,
    state: watch::Sender<SchedulerState>,
    cycles: watch::Sender<u64>,
    fetches: JoinSet<CategoryUpdate>,
    /// Category of every spawned fetch, so a panicked task can still be
    /// reported against its category.
    in_flight: HashMap<task::Id, Category>,
}

impl<S: DataSource> Worker<S> {
    async fn run(mut self) {
        let mut period = self.settings.borrow_and_update().refresh_interval();
        let mut ticker = tokio::time::interval(tick_period(period));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut settings_open = true;

        info!(interval_secs = period.as_secs(), "refresh scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => self.start_cycle(),

                changed = self.settings.changed(), if settings_open => {
                    if changed.is_err() {
                        // Config manager gone: keep the last interval.
                        settings_open = false;
                        continue;
                    }
                    let next = self.settings.borrow_and_update().refresh_interval();
                    if next != period {
                        info!(
                            from_secs = period.as_secs(),
                            to_secs = next.as_secs(),
                            "refresh interval changed, restarting timer"
                        );
                        period = next;
                        ticker = restart_ticker(tick_period(period));
                    }
                }

                command = self.commands.recv() => match command {
                    Some(Command::Refresh(category)) => {
                        debug!(%category, "manual refresh");
                        self.spawn_fetch(category);
                    }
                    Some(Command::RefreshAll) => {
                        debug!("manual refresh of all categories");
                        for category in Category::ALL {
                            self.spawn_fetch(category);
                        }
                    }
                    None => break,
                },

                Some(joined) = self.fetches.join_next_with_id(), if !self.fetches.is_empty() => {
                    self.finish(joined);
                }

                // A send or a dropped handle both mean stop.
                _ = self.shutdown.changed() => break,
            }
            self.publish_state();
        }

        self.drain().await;
        self.state.send_replace(SchedulerState::Stopped);
        info!("refresh scheduler stopped");
    }

    fn start_cycle(&mut self) {
        let mut cycle = 0;
        self.cycles.send_modify(|c| {
            *c += 1;
            cycle = *c;
        });
        debug!(cycle, "refresh cycle started");
        for category in Category::ALL {
            self.spawn_fetch(category);
        }
    }

    fn spawn_fetch(&mut self, category: Category) {
        let source = Arc::clone(&self.source);
        let limit = self.options.fetch_timeout;
        let handle = self
            .fetches
            .spawn(async move { fetch_category(source.as_ref(), category, limit).await });
        self.in_flight.insert(handle.id(), category);
    }

    fn finish(&mut self, joined: Result<(task::Id, CategoryUpdate), JoinError>) {
        let update = match joined {
            Ok((id, update)) => {
                self.in_flight.remove(&id);
                update
            }
            Err(e) => {
                let Some(category) = self.in_flight.remove(&e.id()) else {
                    return;
                };
                if e.is_cancelled() {
                    return;
                }
                error!(%category, error = %e, "fetch task panicked");
                CategoryUpdate::failed(category, format!("fetch task panicked: {e}"))
            }
        };
        self.store.update(update);
    }

    async fn drain(&mut self) {
        if self.fetches.is_empty() {
            return;
        }
        let grace = self.options.shutdown_grace;
        let waited = tokio::time::timeout(grace, async {
            while let Some(joined) = self.fetches.join_next_with_id().await {
                self.finish(joined);
            }
        })
        .await;

        if waited.is_err() {
            warn!(
                remaining = self.fetches.len(),
                grace_secs = grace.as_secs(),
                "fetches still running after grace period, aborting"
            );
            self.fetches.shutdown().await;
            self.in_flight.clear();
        }
    }

    fn publish_state(&self) {
        let next = if self.fetches.is_empty() {
            SchedulerState::Idle
        } else {
            SchedulerState::Running
        };
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
    }
}

/// Longest timer period. Any positive interval is a valid setting, but
/// deadlines past this point would overflow `Instant`.
const MAX_TICK_PERIOD: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

fn tick_period(interval: Duration) -> Duration {
    if interval <= MAX_TICK_PERIOD {
        return interval;
    }
    warn!(
        interval_secs = interval.as_secs(),
        max_secs = MAX_TICK_PERIOD.as_secs(),
        "refresh interval too long, capping timer period"
    );
    MAX_TICK_PERIOD
}

fn restart_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}

async fn fetch_category<S: DataSource>(
    source: &S,
    category: Category,
    limit: Duration,
) -> CategoryUpdate {
    match category {
        Category::Registrations => {
            CategoryUpdate::Registrations(bounded(limit, source.fetch_registrations()).await)
        }
        Category::Agents => CategoryUpdate::Agents(bounded(limit, source.fetch_agents()).await),
        Category::Server => {
            CategoryUpdate::Server(bounded(limit, source.fetch_server_health()).await)
        }
    }
}

async fn bounded<T>(
    limit: Duration,
    fetch: impl Future<Output = FetchResult<T>>,
) -> Result<T, String> {
    let result = match tokio::time::timeout(limit, fetch).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(limit)),
    };
    result.map_err(|e| e.to_string())
}
