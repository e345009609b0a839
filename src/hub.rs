//! Shared state container for one process's pipeline jobs.
//!
//! [`ProgressHub`] owns the progress and report stores and is handed to both
//! sides of a job: the pipeline writes through callbacks and inferred
//! messages while the interface polls snapshots, logs and reports. Cloning
//! the hub shares the same stores.

use crate::progress::{
    ProgressCallback, ProgressSnapshot, ProgressStatus, ProgressStore, WriteResult,
};
use crate::report::{ReportBundle, ReportId, ReportStore};
use crate::stage::{self, StageDefinition};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::debug;

/// Progress and report state for every in-flight job.
pub struct ProgressHub<R = ReportBundle> {
    progress: Arc<ProgressStore>,
    reports: Arc<ReportStore<R>>,
}

impl<R> ProgressHub<R> {
    /// Create a hub with default sharding and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(Arc::new(ProgressStore::new()), Arc::new(ReportStore::new()))
    }

    /// Create a hub whose progress store uses `shards` lock shards.
    #[must_use]
    pub fn with_shards(shards: NonZeroUsize) -> Self {
        Self::from_parts(
            Arc::new(ProgressStore::with_shards(shards)),
            Arc::new(ReportStore::new()),
        )
    }

    /// Assemble a hub from existing stores.
    #[must_use]
    pub const fn from_parts(progress: Arc<ProgressStore>, reports: Arc<ReportStore<R>>) -> Self {
        Self { progress, reports }
    }

    /// Callback recording explicit updates for `report_id`.
    #[must_use]
    pub fn make_callback(&self, report_id: ReportId) -> ProgressCallback {
        self.progress.make_callback(report_id)
    }

    /// See [`ProgressStore::record_explicit`].
    ///
    /// # Errors
    ///
    /// Propagates the store's rejection of unknown stage indices.
    pub fn record_explicit(
        &self,
        report_id: &ReportId,
        stage_index: usize,
        status: ProgressStatus,
        message: &str,
    ) -> WriteResult {
        self.progress
            .record_explicit(report_id, stage_index, status, message)
    }

    /// See [`ProgressStore::record_inferred`].
    ///
    /// # Errors
    ///
    /// Propagates timestamp formatting failures.
    pub fn record_inferred(&self, report_id: &ReportId, message: &str) -> WriteResult {
        self.progress.record_inferred(report_id, message)
    }

    /// Store the finalised report for `report_id`.
    pub fn persist(&self, report_id: &ReportId, report: R) {
        drop(self.reports.persist(report_id, report));
    }

    /// Current snapshot, or the default snapshot for unknown ids.
    #[must_use]
    pub fn read_snapshot(&self, report_id: &ReportId) -> ProgressSnapshot {
        self.progress.read_snapshot(report_id)
    }

    /// Log lines in arrival order.
    #[must_use]
    pub fn read_log(&self, report_id: &ReportId) -> Vec<String> {
        self.progress.read_log(report_id)
    }

    /// The persisted report, if any.
    #[must_use]
    pub fn get_report(&self, report_id: &ReportId) -> Option<Arc<R>> {
        self.reports.get(report_id)
    }

    /// Forget the report's snapshot, log and report. Idempotent.
    pub fn cleanup(&self, report_id: &ReportId) {
        let progress = self.progress.cleanup(report_id);
        let report = self.reports.cleanup(report_id);
        debug!(report_id = %report_id, progress, report, "report state cleaned up");
    }

    /// The stage catalogue, in pipeline order.
    #[must_use]
    pub fn stages(&self) -> &'static [StageDefinition] {
        stage::stages()
    }
}

impl<R> Clone for ProgressHub<R> {
    fn clone(&self) -> Self {
        Self {
            progress: Arc::clone(&self.progress),
            reports: Arc::clone(&self.reports),
        }
    }
}

impl<R> Default for ProgressHub<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ProgressHub<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressHub")
            .field("progress", &self.progress)
            .field("reports", &self.reports)
            .finish()
    }
}
