//! Sharded, lock-guarded progress state keyed by report id.

use super::{ProgressError, ProgressSnapshot, ProgressStatus};
use crate::report::ReportId;
use crate::stage::{PIPELINE_STAGE_COUNT, PipelineStage, classify_stage};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, trace, warn};

/// Source of wall-clock timestamps for snapshots and log lines.
pub type Clock = dyn Fn() -> OffsetDateTime + Send + Sync;

/// Shard count used by [`ProgressStore::new`].
pub const DEFAULT_SHARD_COUNT: NonZeroUsize = match NonZeroUsize::new(16) {
    Some(count) => count,
    None => NonZeroUsize::MIN,
};

/// Upper bound accepted for configurable shard counts.
pub const MAX_SHARD_COUNT: usize = 256;

/// Result of a progress write.
pub type WriteResult = Result<WriteOutcome, ProgressError>;

/// What a successful write did to the snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// An explicit update replaced the snapshot.
    Applied,
    /// An inferred update matched a stage and advanced the snapshot to it.
    Classified(PipelineStage),
    /// An inferred update matched no stage; only message and time changed.
    Unclassified,
    /// The report is terminal; the message was logged but the snapshot kept.
    TerminalLocked(ProgressStatus),
}

#[derive(Debug, Default)]
struct ProgressEntry {
    snapshot: ProgressSnapshot,
    log: Vec<String>,
}

type Shard = HashMap<ReportId, ProgressEntry>;

/// Concurrent progress state for any number of reports.
///
/// Reports are spread over a fixed set of mutex-guarded shards chosen by
/// hashing the report id, so jobs for different reports rarely contend. A
/// report's snapshot and log share one shard entry, which makes every
/// operation atomic across all of its fields. Locks are held only for map
/// access; timestamps and classification are computed beforehand.
pub struct ProgressStore {
    shards: Box<[Mutex<Shard>]>,
    clock: Box<Clock>,
}

impl ProgressStore {
    /// Create a store with [`DEFAULT_SHARD_COUNT`] shards and the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARD_COUNT)
    }

    /// Create a store with `count` shards. A count of one gives a single
    /// global lock.
    #[must_use]
    pub fn with_shards(count: NonZeroUsize) -> Self {
        Self::with_clock(count, Box::new(OffsetDateTime::now_utc))
    }

    /// Create a store that reads timestamps from `clock`.
    #[must_use]
    pub fn with_clock(count: NonZeroUsize, clock: Box<Clock>) -> Self {
        let shards = (0..count.get())
            .map(|_| Mutex::new(Shard::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self { shards, clock }
    }

    /// Number of lock shards.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Overwrite the report's snapshot with an authoritative update.
    ///
    /// This is the path that sets terminal statuses. It performs no terminal
    /// guard: a later explicit write may move a terminal report back to
    /// another status (this is logged). Explicit writes do not touch the log.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::StageOutOfRange`] when `stage_index` is not in
    /// the catalogue; the snapshot is left unchanged.
    pub fn record_explicit(
        &self,
        report_id: &ReportId,
        stage_index: usize,
        status: ProgressStatus,
        message: &str,
    ) -> WriteResult {
        let Some(stage) = PipelineStage::from_index(stage_index) else {
            warn!(
                report_id = %report_id,
                stage_index,
                "explicit progress update names an unknown stage"
            );
            return Err(ProgressError::StageOutOfRange {
                index: stage_index,
                count: PIPELINE_STAGE_COUNT,
            });
        };
        let now = self.now();

        let mut shard = self.lock_shard(report_id);
        let entry = shard.entry(report_id.clone()).or_default();
        let previous = entry.snapshot.status;
        entry.snapshot = ProgressSnapshot {
            current_stage: Some(stage),
            status,
            message: message.to_owned(),
            updated_at: Some(now),
        };
        drop(shard);

        if previous.is_terminal() && !status.is_terminal() {
            warn!(
                report_id = %report_id,
                from = %previous,
                to = %status,
                "explicit progress update reopened a terminal report"
            );
        }
        debug!(report_id = %report_id, stage = stage.index(), %status, "progress recorded");
        Ok(WriteOutcome::Applied)
    }

    /// Log a free-text message and advance the snapshot from it.
    ///
    /// The message is always appended to the log. Unless the report is
    /// already terminal, the snapshot then takes the classified stage (if
    /// any), the message and a fresh timestamp; a pending report becomes
    /// running.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::Timestamp`] when the log timestamp cannot be
    /// formatted; nothing is recorded in that case.
    pub fn record_inferred(&self, report_id: &ReportId, message: &str) -> WriteResult {
        let now = self.now();
        let line = log_line(now, message)?;
        let classified = classify_stage(message);
        if classified.is_none() {
            trace!(report_id = %report_id, text = message, "message matched no stage marker");
        }

        let mut shard = self.lock_shard(report_id);
        let entry = shard.entry(report_id.clone()).or_default();
        entry.log.push(line);
        let snapshot = &mut entry.snapshot;
        if snapshot.status.is_terminal() {
            return Ok(WriteOutcome::TerminalLocked(snapshot.status));
        }
        if let Some(stage) = classified {
            snapshot.current_stage = Some(stage);
        }
        if snapshot.status == ProgressStatus::Pending {
            snapshot.status = ProgressStatus::Running;
        }
        message.clone_into(&mut snapshot.message);
        snapshot.updated_at = Some(now);
        drop(shard);

        debug!(report_id = %report_id, text = message, "progress message recorded");
        Ok(classified.map_or(WriteOutcome::Unclassified, WriteOutcome::Classified))
    }

    /// Current snapshot for the report, or the default snapshot if unknown.
    #[must_use]
    pub fn read_snapshot(&self, report_id: &ReportId) -> ProgressSnapshot {
        self.lock_shard(report_id)
            .get(report_id)
            .map(|entry| entry.snapshot.clone())
            .unwrap_or_default()
    }

    /// Log lines for the report in arrival order; empty if unknown.
    #[must_use]
    pub fn read_log(&self, report_id: &ReportId) -> Vec<String> {
        self.lock_shard(report_id)
            .get(report_id)
            .map(|entry| entry.log.clone())
            .unwrap_or_default()
    }

    /// `true` when any progress state is held for the report.
    #[must_use]
    pub fn contains(&self, report_id: &ReportId) -> bool {
        self.lock_shard(report_id).contains_key(report_id)
    }

    /// Drop the report's snapshot and log. Returns whether anything was held.
    pub fn cleanup(&self, report_id: &ReportId) -> bool {
        self.lock_shard(report_id).remove(report_id).is_some()
    }

    fn now(&self) -> OffsetDateTime {
        (self.clock)().to_offset(UtcOffset::UTC)
    }

    fn lock_shard(&self, report_id: &ReportId) -> MutexGuard<'_, Shard> {
        self.shard_for(report_id)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[expect(
        clippy::indexing_slicing,
        reason = "slot is reduced modulo the non-empty shard count"
    )]
    fn shard_for(&self, report_id: &ReportId) -> &Mutex<Shard> {
        let mut hasher = DefaultHasher::new();
        report_id.hash(&mut hasher);
        let count = u64::try_from(self.shards.len()).unwrap_or(1);
        let slot = usize::try_from(hasher.finish() % count).unwrap_or_default();
        &self.shards[slot]
    }
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProgressStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressStore")
            .field("shards", &self.shards.len())
            .finish_non_exhaustive()
    }
}

fn log_line(at: OffsetDateTime, message: &str) -> Result<String, ProgressError> {
    let stamp = at.format(&Rfc3339)?;
    Ok(format!("[{stamp}] {message}"))
}
