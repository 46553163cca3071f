//! Background eviction of idle sessions.
//!
//! Periodically drops sessions that have not been looked up within the configured
//! lifetime, so abandoned browser tabs do not accumulate in memory.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::state::SessionStore;

/// Background worker that evicts idle sessions.
pub struct SessionSweeper {
    store: Arc<SessionStore>,
    ttl: Duration,
    interval: Duration,
    shutdown: Arc<Notify>,
}

impl SessionSweeper {
    /// Create a sweeper that drops sessions idle for longer than `ttl`, checking every
    /// `interval`.
    #[must_use]
    pub fn new(store: Arc<SessionStore>, ttl: Duration, interval: Duration) -> Self {
        Self {
            store,
            ttl,
            interval,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notifier that stops the worker.
    #[must_use]
    pub fn shutdown_notifier(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Spawn the sweep loop as a tokio task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        info!(ttl = ?self.ttl, interval = ?self.interval, "Starting session sweeper");

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {
                    let evicted = self.sweep_once(Utc::now());
                    if evicted > 0 {
                        info!(evicted, live = self.store.len(), "Evicted idle sessions");
                    } else {
                        debug!("Session sweep found nothing idle");
                    }
                }
                () = self.shutdown.notified() => {
                    info!("Session sweeper shutting down");
                    break;
                }
            }
        }
    }

    /// Run one sweep as of `now`. Returns the number of sessions dropped.
    pub fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let cutoff = TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl));
        match cutoff {
            Some(cutoff) => self.store.evict_idle(cutoff),
            None => {
                warn!(ttl = ?self.ttl, "Session lifetime out of range; skipping sweep");
                0
            }
        }
    }
}
