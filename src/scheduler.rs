//! Periodic auto-sync owned by the service process.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::models::{PlatformSelector, SyncOutcome};
use crate::orchestrator::SyncOrchestrator;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoSyncStatus {
    pub enabled: bool,
    /// Effective period in whole seconds, rounded up.
    pub interval_secs: Option<u64>,
    /// Effective period in milliseconds.
    pub interval_ms: Option<u64>,
    /// Whether a sync (manual or periodic) is in flight right now.
    pub sync_running: bool,
}

struct Ticker {
    handle: JoinHandle<()>,
    period: Duration,
}

/// Shortest period the ticker accepts; `interval` panics on zero.
pub const MIN_PERIOD: Duration = Duration::from_millis(10);

fn secs_rounded_up(period: Duration) -> u64 {
    if period.subsec_nanos() > 0 {
        period.as_secs().saturating_add(1)
    } else {
        period.as_secs()
    }
}

/// Start/stop toggle around a ticker that triggers `run_sync(ALL)`.
///
/// Each tick spawns its run as a detached task, so `stop` returns at once
/// and never cancels a run in flight. Overlap is rejected by the
/// orchestrator's run guard.
pub struct AutoSyncScheduler {
    orchestrator: Arc<SyncOrchestrator>,
    ticker: Mutex<Option<Ticker>>,
}

impl AutoSyncScheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self {
            orchestrator,
            ticker: Mutex::new(None),
        }
    }

    /// Starts ticking every `period`, raised to [`MIN_PERIOD`] if shorter.
    /// Restarting replaces the previous period. The first run happens after
    /// one full period.
    pub async fn start(&self, period: Duration) {
        if period < MIN_PERIOD {
            tracing::warn!("Auto-sync period {:?} raised to {:?}", period, MIN_PERIOD);
        }
        let period = period.max(MIN_PERIOD);
        let mut ticker = self.ticker.lock().await;
        if let Some(previous) = ticker.take() {
            previous.handle.abort();
        }

        let orchestrator = self.orchestrator.clone();
        let handle = tokio::spawn(async move {
            let mut ticks = interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticks.tick().await;

            loop {
                ticks.tick().await;
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    if let SyncOutcome::Skipped =
                        orchestrator.run_sync(PlatformSelector::All).await
                    {
                        tracing::debug!("Auto-sync tick skipped: sync already running");
                    }
                });
            }
        });

        tracing::info!("Auto-sync enabled every {:?}", period);
        *ticker = Some(Ticker { handle, period });
    }

    /// Stops future ticks. A run already in flight is left to finish.
    pub async fn stop(&self) {
        if let Some(ticker) = self.ticker.lock().await.take() {
            ticker.handle.abort();
            tracing::info!("Auto-sync disabled");
        }
    }

    pub async fn status(&self) -> AutoSyncStatus {
        let ticker = self.ticker.lock().await;
        AutoSyncStatus {
            enabled: ticker.is_some(),
            interval_secs: ticker.as_ref().map(|t| secs_rounded_up(t.period)),
            interval_ms: ticker
                .as_ref()
                .map(|t| u64::try_from(t.period.as_millis()).unwrap_or(u64::MAX)),
            sync_running: self.orchestrator.is_running(),
        }
    }
}

impl Drop for AutoSyncScheduler {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryLeadStore;

    fn scheduler() -> AutoSyncScheduler {
        let store = Arc::new(InMemoryLeadStore::new());
        AutoSyncScheduler::new(Arc::new(SyncOrchestrator::new(Vec::new(), store)))
    }

    #[test]
    fn test_secs_rounded_up() {
        assert_eq!(secs_rounded_up(Duration::from_secs(60)), 60);
        assert_eq!(secs_rounded_up(Duration::from_millis(250)), 1);
        assert_eq!(secs_rounded_up(Duration::from_millis(1500)), 2);
    }

    #[tokio::test]
    async fn test_sub_second_period_is_reported_exactly() {
        let scheduler = scheduler();

        scheduler.start(Duration::from_millis(250)).await;
        let status = scheduler.status().await;
        assert_eq!(status.interval_ms, Some(250));
        assert_eq!(status.interval_secs, Some(1));

        scheduler.start(Duration::ZERO).await;
        let status = scheduler.status().await;
        assert_eq!(status.interval_ms, Some(10));
        assert_eq!(status.interval_secs, Some(1));

        scheduler.stop().await;
        let status = scheduler.status().await;
        assert_eq!(status.interval_ms, None);
        assert_eq!(status.interval_secs, None);
    }
}
