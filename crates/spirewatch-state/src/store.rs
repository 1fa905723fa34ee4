//! StateStore — latest snapshot per category.
//!
//! Snapshots are immutable and shared behind `Arc`: readers clone the
//! pointer under a read lock and keep using it after the lock is released,
//! while an update builds the next snapshot and swaps it in. A successful
//! fetch replaces the data wholesale; a failed fetch keeps the previous
//! data and records the error next to it.

use std::sync::{Arc, PoisonError, RwLock};

use spirewatch_core::{
    AgentRecord, Category, RegistrationEntry, ServerHealth, Snapshot, epoch_secs,
};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::update::{CategoryUpdate, StateView};

type Slot<T> = RwLock<Arc<Snapshot<T>>>;

struct Inner {
    registrations: Slot<Vec<RegistrationEntry>>,
    agents: Slot<Vec<AgentRecord>>,
    server: Slot<ServerHealth>,
    /// Count of updates applied so far.
    revision: watch::Sender<u64>,
}

/// Thread-safe store for the three category snapshots.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Inner>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create a store with every category empty.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                registrations: RwLock::new(Arc::new(Snapshot::empty())),
                agents: RwLock::new(Arc::new(Snapshot::empty())),
                server: RwLock::new(Arc::new(Snapshot::empty())),
                revision,
            }),
        }
    }

    /// Read all three categories.
    ///
    /// The revision is read before the snapshots, so the view contains at
    /// least every update counted in `revision`.
    pub fn get(&self) -> StateView {
        let revision = *self.inner.revision.borrow();
        StateView {
            registrations: read(&self.inner.registrations),
            agents: read(&self.inner.agents),
            server: read(&self.inner.server),
            revision,
        }
    }

    pub fn registrations(&self) -> Arc<Snapshot<Vec<RegistrationEntry>>> {
        read(&self.inner.registrations)
    }

    pub fn agents(&self) -> Arc<Snapshot<Vec<AgentRecord>>> {
        read(&self.inner.agents)
    }

    pub fn server(&self) -> Arc<Snapshot<ServerHealth>> {
        read(&self.inner.server)
    }

    /// Record the outcome of one category fetch and return the new revision.
    pub fn update(&self, update: CategoryUpdate) -> u64 {
        self.update_at(update, epoch_secs())
    }

    /// Record a fetch outcome observed at Unix time `now`.
    pub fn update_at(&self, update: CategoryUpdate, now: u64) -> u64 {
        let category = update.category();
        match update {
            CategoryUpdate::Registrations(result) => {
                replace(&self.inner.registrations, result, category, now)
            }
            CategoryUpdate::Agents(result) => replace(&self.inner.agents, result, category, now),
            CategoryUpdate::Server(result) => replace(&self.inner.server, result, category, now),
        }

        let mut revision = 0;
        self.inner.revision.send_modify(|r| {
            *r += 1;
            revision = *r;
        });
        debug!(%category, revision, "state updated");
        revision
    }

    /// Number of updates applied so far.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Subscribe to revision changes. The receiver is notified after every
    /// update; call [`StateStore::get`] to read the new state.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }
}

fn read<T>(slot: &Slot<T>) -> Arc<Snapshot<T>> {
    // A poisoned lock still holds a whole snapshot: writers only swap an Arc.
    let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(&*guard)
}

fn replace<T: Clone>(slot: &Slot<T>, result: Result<T, String>, category: Category, now: u64) {
    let error = match result {
        Ok(data) => {
            swap(slot, Arc::new(Snapshot::loaded(data, now)));
            return;
        }
        Err(error) => error,
    };

    // Built outside the lock; swapped in only if no other write landed.
    loop {
        let current = read(slot);
        let next = Arc::new(current.with_error(error.clone(), now));
        let mut guard = slot.write().unwrap_or_else(PoisonError::into_inner);
        if Arc::ptr_eq(&*guard, &current) {
            *guard = next;
            drop(guard);
            warn!(
                %category,
                %error,
                stale = current.is_loaded(),
                "fetch failed, keeping last data"
            );
            return;
        }
    }
}

fn swap<T>(slot: &Slot<T>, next: Arc<Snapshot<T>>) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = next;
}
