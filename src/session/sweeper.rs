//! Background eviction of idle sessions.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::SessionStore;

/// Periodically sweeps a [`SessionStore`] for idle sessions.
#[derive(Debug, Clone)]
pub struct SessionSweeper {
    store: SessionStore,
    interval: Duration,
    timeout: Duration,
}

impl SessionSweeper {
    /// Create a sweeper that runs every `interval` and evicts sessions idle
    /// for longer than `timeout`.
    #[must_use]
    pub fn new(store: SessionStore, interval: Duration, timeout: Duration) -> Self {
        Self {
            store,
            interval,
            timeout,
        }
    }

    /// Run a single sweep against the current wall clock.
    ///
    /// Returns the number of sessions evicted.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.store.sweep(Utc::now(), self.timeout);
        if evicted.is_empty() {
            return 0;
        }

        info!(
            name: "relay.session.evicted",
            count = evicted.len(),
            remaining = self.store.len(),
            "Evicted idle sessions"
        );
        debug!(conversation_ids = ?evicted, "Evicted conversation ids");
        evicted.len()
    }

    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first sweep happens one full interval after start.
    #[must_use]
    pub fn start(self) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!(
            interval_secs = self.interval.as_secs_f64(),
            timeout_secs = self.timeout.as_secs_f64(),
            "Session sweeper started"
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // consume immediate first tick

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                }
            }

            debug!("Session sweeper loop exited");
        });

        SweeperHandle { cancel, task }
    }
}

/// Handle to a running [`SessionSweeper`].
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the loop to stop and wait for it to finish.
    ///
    /// A sweep already in progress completes before the loop exits.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Session sweeper task failed");
        }
        info!("Session sweeper stopped");
    }

    /// Whether the loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
