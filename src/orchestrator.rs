//! Sync orchestrator: fetch → normalize → upsert → audit, per platform.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};

use crate::dedup::DedupEngine;
use crate::errors::SyncError;
use crate::models::{
    NewSyncRun, Platform, PlatformResult, PlatformSelector, SyncOutcome, SyncStatus, SyncSummary,
};
use crate::providers::ProviderAdapter;
use crate::store::LeadStore;

/// Upsert parallelism used when none is configured.
pub const DEFAULT_SYNC_CONCURRENCY: usize = 4;

/// Single-slot IDLE/RUNNING token owned by one orchestrator.
///
/// This only stops the same instance from overlapping itself. Duplicate
/// protection across writers comes from the store constraints.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves IDLE → RUNNING, or returns `None` if a run is in flight.
    pub fn try_acquire(&self) -> Option<RunLease> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunLease {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Held for the duration of a run; dropping it returns the guard to IDLE,
/// including on error or panic.
#[derive(Debug)]
pub struct RunLease {
    running: Arc<AtomicBool>,
}

impl Drop for RunLease {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Tally of one adapter invocation before it is written to the audit log.
#[derive(Debug, Default)]
struct RunTally {
    fetched: u64,
    imported: u64,
    dropped: u64,
    failure: Option<String>,
}

impl RunTally {
    fn status(&self) -> SyncStatus {
        if self.failure.is_some() {
            SyncStatus::Error
        } else if self.dropped > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Success
        }
    }

    fn notes(&self) -> Option<String> {
        match (&self.failure, self.dropped) {
            (Some(failure), _) => Some(failure.clone()),
            (None, 0) => None,
            (None, dropped) => Some(format!("{} lead(s) dropped during normalization", dropped)),
        }
    }
}

pub struct SyncOrchestrator {
    adapters: HashMap<Platform, ProviderAdapter>,
    store: Arc<dyn LeadStore>,
    dedup: DedupEngine,
    guard: RunGuard,
    concurrency: usize,
}

impl SyncOrchestrator {
    pub fn new(adapters: Vec<ProviderAdapter>, store: Arc<dyn LeadStore>) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.platform(), adapter))
            .collect();

        Self {
            adapters,
            dedup: DedupEngine::new(store.clone()),
            store,
            guard: RunGuard::new(),
            concurrency: DEFAULT_SYNC_CONCURRENCY,
        }
    }

    /// Caps how many upserts of one batch may be in flight at once.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn is_running(&self) -> bool {
        self.guard.is_running()
    }

    /// Runs every platform the selector names and writes one audit entry per
    /// platform. Returns `Skipped` without doing any work if a run is already
    /// in flight on this orchestrator.
    pub async fn run_sync(&self, selector: PlatformSelector) -> SyncOutcome {
        let Some(_lease) = self.guard.try_acquire() else {
            tracing::info!("Sync {:?} skipped: another run is in progress", selector);
            return SyncOutcome::Skipped;
        };

        tracing::info!("🔄 Starting sync for {:?}", selector);

        let runs = selector
            .platforms()
            .into_iter()
            .map(|platform| self.run_platform(platform));
        let results = futures::future::join_all(runs).await;

        let summary = SyncSummary::from_results(results);
        tracing::info!(
            "Sync {:?} finished: ok={}, imported={}",
            selector,
            summary.ok,
            summary.imported
        );

        SyncOutcome::Completed(summary)
    }

    /// One adapter invocation. Never fails: every outcome becomes a result
    /// and, when the store allows it, a `SyncRun`.
    async fn run_platform(&self, platform: Platform) -> PlatformResult {
        let started_at = Utc::now();

        let tally = match self.adapters.get(&platform) {
            Some(adapter) => self.ingest(adapter).await,
            None => RunTally {
                failure: Some(format!("No adapter configured for {}", platform)),
                ..RunTally::default()
            },
        };

        let status = tally.status();
        let run = NewSyncRun {
            platform,
            fetched_count: tally.fetched,
            imported_count: tally.imported,
            started_at,
            finished_at: Utc::now(),
            status,
            notes: tally.notes(),
        };

        let mut result = PlatformResult {
            platform,
            fetched: tally.fetched,
            imported: tally.imported,
            ok: status == SyncStatus::Success,
            status,
            error: tally.failure.clone(),
        };

        if let Err(e) = self.store.record_sync_run(&run).await {
            tracing::error!("Failed to record {} sync run: {}", platform, e);
            result.ok = false;
            result.status = SyncStatus::Error;
            result.error = Some(match result.error {
                Some(previous) => format!("{}; audit log write failed: {}", previous, e),
                None => format!("audit log write failed: {}", e),
            });
        }

        match result.status {
            SyncStatus::Error => tracing::error!(
                "❌ {} sync failed after fetched={}, imported={}: {}",
                platform,
                result.fetched,
                result.imported,
                result.error.as_deref().unwrap_or("unknown error")
            ),
            _ => tracing::info!(
                "✓ {} sync {}: fetched={}, imported={}",
                platform,
                result.status,
                result.fetched,
                result.imported
            ),
        }

        result
    }

    async fn ingest(&self, adapter: &ProviderAdapter) -> RunTally {
        let mut tally = RunTally::default();
        let platform = adapter.platform();

        let raw_batch = match adapter.fetch_raw().await {
            Ok(batch) => batch,
            Err(e) => {
                tally.failure = Some(e.to_string());
                return tally;
            }
        };
        tally.fetched = raw_batch.len() as u64;

        let drafts: Vec<_> = raw_batch
            .iter()
            .filter_map(|raw| match adapter.normalize(raw) {
                Ok(draft) => Some(draft),
                Err(SyncError::Normalization(reason)) | Err(SyncError::Fetch(reason)) => {
                    tracing::warn!("⚠️  Dropping {} lead: {}", platform, reason);
                    tally.dropped += 1;
                    None
                }
            })
            .collect();

        let mut pending = drafts.into_iter();
        let mut in_flight = FuturesUnordered::new();
        for draft in pending.by_ref().take(self.concurrency) {
            in_flight.push(self.dedup.upsert(draft));
        }

        // After the first failure no new writes start, but writes already in
        // flight are awaited: they may have committed and must be counted.
        while let Some(outcome) = in_flight.next().await {
            match outcome {
                Ok(outcome) if outcome.created => tally.imported += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("{} lead write failed: {}", platform, e);
                    tally.failure.get_or_insert_with(|| e.to_string());
                }
            }

            if tally.failure.is_none() {
                if let Some(draft) = pending.next() {
                    in_flight.push(self.dedup.upsert(draft));
                }
            }
        }

        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_releases_on_drop() {
        let guard = RunGuard::new();
        let lease = guard.try_acquire().expect("idle guard");
        assert!(guard.is_running());
        assert!(guard.try_acquire().is_none());

        drop(lease);
        assert!(!guard.is_running());
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_lease_releases_on_panic() {
        let guard = RunGuard::new();
        let cloned = guard.clone();

        let result = std::panic::catch_unwind(move || {
            let _lease = cloned.try_acquire().unwrap();
            panic!("run crashed");
        });

        assert!(result.is_err());
        assert!(!guard.is_running());
    }

    #[test]
    fn test_tally_status_resolution() {
        let tally = RunTally::default();
        assert_eq!(tally.status(), SyncStatus::Success);
        assert_eq!(tally.notes(), None);

        let tally = RunTally {
            fetched: 3,
            dropped: 1,
            ..RunTally::default()
        };
        assert_eq!(tally.status(), SyncStatus::Partial);
        assert!(tally.notes().unwrap().contains("1 lead(s) dropped"));

        let tally = RunTally {
            dropped: 1,
            failure: Some("META fetch failed: 500".into()),
            ..RunTally::default()
        };
        assert_eq!(tally.status(), SyncStatus::Error);
        assert_eq!(tally.notes().as_deref(), Some("META fetch failed: 500"));
    }
}
