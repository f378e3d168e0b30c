use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use super::RevocationStore;
use crate::error::DatabaseError;

/// Periodic purge of expired revocation records.
///
/// Runs in its own task, off the request path. A failed sweep is logged and
/// the next tick tries again.
pub struct RevocationSweeper {
    store: Arc<dyn RevocationStore>,
    interval: Duration,
}

impl RevocationSweeper {
    pub fn new(store: Arc<dyn RevocationStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Runs one purge against the current time
    pub async fn sweep_once(&self) -> Result<u64, DatabaseError> {
        let purged = self.store.purge_expired(Utc::now().timestamp()).await?;

        if purged > 0 {
            tracing::info!(purged = purged, "Purged expired revocation records");
        } else {
            tracing::debug!("No expired revocation records to purge");
        }

        Ok(purged)
    }

    /// Sweeps on every interval tick until `cancel` flips to `true`
    pub async fn run(self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            interval_seconds = self.interval.as_secs(),
            "Revocation sweeper started"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep_once().await {
                        tracing::error!(error = %e, "Revocation sweep failed; retrying next interval");
                    }
                }
            }
        }

        tracing::info!("Revocation sweeper stopped");
    }

    /// Spawns `run` on the current runtime
    pub fn spawn(self, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
