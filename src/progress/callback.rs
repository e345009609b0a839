//! Report-bound progress callbacks handed to the analysis pipeline.

use super::{ProgressStatus, ProgressStore, WriteResult};
use crate::report::ReportId;
use std::sync::Arc;

/// Callback the pipeline invokes with `(stage_index, status, message)`.
///
/// The callback is bound to one report id when it is created, so pipeline
/// code never sees the store. Its result may be discarded.
pub type ProgressCallback = Box<dyn Fn(usize, ProgressStatus, &str) -> WriteResult + Send + Sync>;

impl ProgressStore {
    /// Build a [`ProgressCallback`] that records explicit updates for
    /// `report_id`.
    ///
    /// # Examples
    ///
    /// ```
    /// use grantscope_progress::progress::{ProgressStatus, ProgressStore};
    /// use grantscope_progress::report::ReportId;
    /// use std::sync::Arc;
    ///
    /// let store = Arc::new(ProgressStore::new());
    /// let report_id = ReportId::from("RPT-DOCTEST");
    /// let callback = store.make_callback(report_id.clone());
    /// drop(callback(2, ProgressStatus::Running, "Planning analysis (tools)"));
    /// assert_eq!(store.read_snapshot(&report_id).step_number(), Some(3));
    /// ```
    #[must_use]
    pub fn make_callback(self: &Arc<Self>, report_id: ReportId) -> ProgressCallback {
        let store = Arc::clone(self);
        Box::new(move |stage_index, status, message| {
            store.record_explicit(&report_id, stage_index, status, message)
        })
    }
}
