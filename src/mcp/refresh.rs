//! Periodic configuration refresh
//!
//! The loop alternates between two states: idle until the next tick, then
//! refreshing (fetch, compare, maybe swap). The refresh is awaited inline and
//! missed ticks are skipped, so at most one refresh is ever in flight. A failed
//! fetch leaves the active config in place and the loop keeps running.

use crate::config::ConfigSource;
use crate::mcp::registry::SharedRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Unchanged,
    Swapped,
    Failed(String),
}

pub struct RefreshLoop {
    registry: SharedRegistry,
    source: Arc<dyn ConfigSource>,
    interval: Duration,
}

impl RefreshLoop {
    pub fn new(
        registry: SharedRegistry,
        source: Arc<dyn ConfigSource>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            source,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    /// Runs a single fetch-compare-swap cycle
    pub async fn refresh_once(&self) -> RefreshOutcome {
        match self.source.fetch().await {
            Ok(candidate) => {
                if self.registry.swap_if_changed(candidate).await {
                    tracing::info!(
                        source = %self.source.describe(),
                        generation = self.registry.generation(),
                        "Capability configuration changed; swapped in new config"
                    );
                    RefreshOutcome::Swapped
                } else {
                    tracing::debug!(
                        source = %self.source.describe(),
                        "Capability configuration unchanged"
                    );
                    RefreshOutcome::Unchanged
                }
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %e,
                    "Config refresh failed; keeping active configuration"
                );
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }

    /// Starts the loop on a background task
    ///
    /// The first tick fires one interval from now; the initial load is the
    /// caller's job.
    pub fn spawn(self) -> RefreshHandle {
        let ct = CancellationToken::new();
        let token = ct.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = self.refresh_once() => {}
                }
            }

            tracing::debug!("Refresh loop stopped");
        });

        RefreshHandle { ct, task }
    }
}

/// Owner of a running [`RefreshLoop`]
pub struct RefreshHandle {
    ct: CancellationToken,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancels the loop and waits for the task to finish
    pub async fn stop(self) {
        self.ct.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Refresh loop task failed: {}", e);
        }
    }
}
