//! In-memory store of finalised reports.

use super::{ReportBundle, ReportId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// Finalised reports keyed by report id.
///
/// Reports are opaque to the store. Readers share an [`Arc`] to the stored
/// value, so a lookup never copies the report and a later `persist` for the
/// same id does not disturb readers holding the previous one.
pub struct ReportStore<R = ReportBundle> {
    reports: RwLock<HashMap<ReportId, Arc<R>>>,
}

impl<R> ReportStore<R> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(HashMap::new()),
        }
    }

    /// Store `report` under `report_id`, returning any report it replaced.
    pub fn persist(&self, report_id: &ReportId, report: R) -> Option<Arc<R>> {
        let previous = self.write().insert(report_id.clone(), Arc::new(report));
        debug!(
            report_id = %report_id,
            replaced = previous.is_some(),
            "report persisted"
        );
        previous
    }

    /// The report stored under `report_id`, if any.
    #[must_use]
    pub fn get(&self, report_id: &ReportId) -> Option<Arc<R>> {
        self.read().get(report_id).cloned()
    }

    /// Forget the report. Returns whether one was stored.
    pub fn cleanup(&self, report_id: &ReportId) -> bool {
        self.write().remove(report_id).is_some()
    }

    /// Number of stored reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// `true` when no reports are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ReportId, Arc<R>>> {
        self.reports.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ReportId, Arc<R>>> {
        self.reports.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R> Default for ReportStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for ReportStore<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportStore")
            .field("reports", &self.len())
            .finish()
    }
}
