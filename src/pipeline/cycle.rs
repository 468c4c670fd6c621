//! One detection cycle across every watched pair.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, WatchedUrl, flatten};
use crate::notify::MessageSender;
use crate::services::{ChangeDetector, CheckOutcome};
use crate::storage::{SnapshotStore, WatchListProvider};

/// Per-outcome counts of a finished cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub total: usize,
    pub first_seen: usize,
    pub unchanged: usize,
    pub changed: usize,
    /// Non-success HTTP status
    pub skipped: usize,
    /// Transport, store or notification errors
    pub failed: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: &CheckOutcome) {
        match outcome {
            CheckOutcome::FirstSnapshot => self.first_seen += 1,
            CheckOutcome::Unchanged => self.unchanged += 1,
            CheckOutcome::Changed { .. } => self.changed += 1,
            CheckOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    /// Pairs that were fetched and stored.
    pub fn completed(&self) -> usize {
        self.first_seen + self.unchanged + self.changed
    }
}

/// Check every registered pair and wait for all checks to finish.
///
/// A failing pair is logged and counted; it never stops the others. Only a
/// failure to enumerate the watch lists is returned.
pub async fn run_cycle(
    detector: &ChangeDetector,
    provider: &dyn WatchListProvider,
    max_concurrent: usize,
) -> Result<CycleReport> {
    let pairs = flatten(&provider.enumerate_all().await?);
    let mut report = CycleReport {
        total: pairs.len(),
        ..CycleReport::default()
    };
    if pairs.is_empty() {
        log::info!("No watched URLs registered");
        return Ok(report);
    }

    // 0 = one in-flight check per pair
    let width = match max_concurrent {
        0 => pairs.len(),
        n => n,
    };
    log::info!("Checking {} watched URLs (concurrency {})", pairs.len(), width);

    let mut checks = stream::iter(pairs)
        .map(|pair: WatchedUrl| async move {
            let result = detector.check_one(&pair.user_id, &pair.url).await;
            (pair, result)
        })
        .buffer_unordered(width);

    while let Some((pair, result)) = checks.next().await {
        match result {
            Ok(outcome) => report.record(&outcome),
            Err(error) => {
                report.failed += 1;
                log::warn!(
                    "Check failed for {} ({}): {}",
                    pair.user_id,
                    pair.url,
                    error
                );
            }
        }
    }

    Ok(report)
}

/// Run one detection cycle against `storage`, logging instead of failing.
pub async fn run_detection<S>(
    config: &Config,
    storage: Arc<S>,
    sender: Arc<dyn MessageSender>,
) -> CycleReport
where
    S: SnapshotStore + WatchListProvider + 'static,
{
    let start = Instant::now();

    let detector = match ChangeDetector::from_config(config, storage.clone(), sender) {
        Ok(detector) => detector,
        Err(e) => {
            log::error!("Cannot start detection cycle: {}", e);
            return CycleReport::default();
        }
    };

    match run_cycle(&detector, storage.as_ref(), config.detector.max_concurrent).await {
        Ok(report) => {
            log::info!(
                "Cycle finished in {}ms: {} total, {} new, {} unchanged, {} changed, {} skipped, {} failed",
                start.elapsed().as_millis(),
                report.total,
                report.first_seen,
                report.unchanged,
                report.changed,
                report.skipped,
                report.failed
            );
            report
        }
        Err(e) => {
            log::error!("Detection cycle aborted: {}", e);
            CycleReport::default()
        }
    }
}
