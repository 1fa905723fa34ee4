//! ConfigManager — the current settings and change notification.
//!
//! Settings are never mutated in place. Saving publishes a new
//! `Arc<Settings>` on a watch channel; the scheduler (and anyone else who
//! subscribed) picks it up on its next turn.

use std::sync::Arc;

use spirewatch_core::Settings;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
pub struct ConfigManager {
    tx: Arc<watch::Sender<Arc<Settings>>>,
}

impl ConfigManager {
    pub fn new(settings: Settings) -> Self {
        let (tx, _) = watch::channel(Arc::new(settings));
        Self { tx: Arc::new(tx) }
    }

    /// The settings currently in effect.
    pub fn current(&self) -> Arc<Settings> {
        Arc::clone(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }

    /// Replace the settings. Returns `true` if they differ from the
    /// current ones; subscribers are only notified in that case.
    pub fn save(&self, settings: Settings) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if **current == settings {
                return false;
            }
            *current = Arc::new(settings.clone());
            true
        });
        if changed {
            info!(
                server_context = settings.server_context(),
                workload_context = settings.workload_context(),
                refresh_interval_secs = settings.refresh_interval_secs(),
                "settings saved"
            );
        }
        changed
    }

    /// Save settings entered as text. An invalid interval falls back to
    /// the default rather than being rejected.
    pub fn save_input(
        &self,
        server_context: &str,
        workload_context: &str,
        refresh_interval: &str,
    ) -> Arc<Settings> {
        self.save(Settings::from_input(
            server_context,
            workload_context,
            refresh_interval,
        ));
        self.current()
    }

    /// Change only the refresh interval.
    pub fn set_refresh_interval(&self, secs: u64) -> bool {
        self.save(self.current().with_refresh_interval(secs))
    }

    /// Change only the cluster contexts.
    pub fn set_contexts(&self, server_context: &str, workload_context: &str) -> bool {
        self.save(self.current().with_contexts(server_context, workload_context))
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_replaces_and_reports_change() {
        let config = ConfigManager::default();
        let before = config.current();

        assert!(config.set_refresh_interval(10));
        assert_eq!(config.current().refresh_interval_secs(), 10);
        // The old value is untouched.
        assert_eq!(before.refresh_interval_secs(), 30);

        assert!(!config.set_refresh_interval(10));
    }

    #[test]
    fn save_input_falls_back_on_invalid_interval() {
        let config = ConfigManager::new(Settings::default().with_refresh_interval(10));
        let saved = config.save_input("server", "workload", "abc");
        assert_eq!(saved.refresh_interval_secs(), 30);
        assert_eq!(saved.server_context(), "server");
    }

    #[tokio::test]
    async fn subscribers_are_notified_only_on_change() {
        let config = ConfigManager::default();
        let mut rx = config.subscribe();

        assert!(!config.save(Settings::default()));
        assert!(!rx.has_changed().unwrap());

        config.set_contexts("upstream-spire-cluster", "downstream-spire-cluster");
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().server_context(), "upstream-spire-cluster");
    }
}
