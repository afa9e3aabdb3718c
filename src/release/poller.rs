//! Background task keeping the catalog in sync with the upstream feed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::release::ReleaseCatalog;

/// Periodically refreshes the catalog until told to shut down.
///
/// A failed cycle is logged and the previous catalog stays in place; the
/// next tick tries again.
pub struct Poller {
    catalog: Arc<ReleaseCatalog>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Poller {
    pub fn new(
        catalog: Arc<ReleaseCatalog>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            catalog,
            interval,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the startup refresh already
        // ran, so consume it.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::info!("polling release feed");
                    if let Err(err) = self.catalog.refresh().await {
                        tracing::warn!(%err, "catalog refresh failed, keeping previous state");
                    }
                }
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("poller stopped");
    }
}
