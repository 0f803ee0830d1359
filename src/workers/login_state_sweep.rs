use crate::storage::SharedSessionStore;
use std::time::Duration;

/// Periodically evicts expired `state → verifier` login records.
///
/// Abandoned login attempts (the user never returns from the provider) would
/// otherwise accumulate until process restart.
#[derive(Debug)]
pub struct LoginStateSweepWorker {
    store: SharedSessionStore,
    sweep_interval_secs: u64,
}

impl LoginStateSweepWorker {
    #[must_use]
    pub const fn new(store: SharedSessionStore, sweep_interval_secs: u64) -> Self {
        Self { store, sweep_interval_secs }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        if self.sweep_interval_secs == 0 {
            tracing::info!("Login state sweep is disabled (interval = 0)");
            return;
        }

        let mut interval = tokio::time::interval(Duration::from_secs(self.sweep_interval_secs));

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = self.store.sweep().await;
                    if evicted > 0 {
                        tracing::info!(count = %evicted, "Evicted expired login states");
                    }
                }
                _ = shutdown.changed() => {}
            }
        }
        tracing::info!("Login state sweep loop shutting down...");
    }
}
