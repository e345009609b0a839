//! Per-report progress tracking for the advisor pipeline.
//!
//! A long-running analysis job writes progress through two paths:
//!
//! - the explicit path ([`ProgressStore::record_explicit`], usually through a
//!   [`ProgressCallback`]) which states the stage and status outright, and
//! - the inferred path ([`ProgressStore::record_inferred`]) which receives a
//!   free-text message, appends it to the report's log and classifies it
//!   against the stage catalogue.
//!
//! Readers poll [`ProgressStore::read_snapshot`] and
//! [`ProgressStore::read_log`] concurrently with the writer. Progress
//! tracking is best effort: write failures come back as [`ProgressError`]
//! values that producers are free to discard.

mod callback;
mod error;
mod store;

pub use callback::ProgressCallback;
pub use error::ProgressError;
pub use store::{Clock, DEFAULT_SHARD_COUNT, MAX_SHARD_COUNT, ProgressStore, WriteOutcome, WriteResult};

use crate::stage::{PIPELINE_STAGE_COUNT, PipelineStage};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

/// Lifecycle status of one report's pipeline run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Nothing has been recorded yet.
    #[default]
    Pending,
    /// The pipeline is working through its stages.
    Running,
    /// The pipeline finished and its report was persisted.
    Completed,
    /// The pipeline stopped on a failure.
    Error,
}

impl ProgressStatus {
    /// Lowercase wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// `true` for [`Completed`](Self::Completed) and [`Error`](Self::Error).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProgressStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(ProgressError::UnknownStatus {
                value: s.to_owned(),
            }),
        }
    }
}

/// Point-in-time view of one report's progress.
///
/// The default value (no stage, [`ProgressStatus::Pending`], empty message,
/// no timestamp) is what readers see for report ids that were never written
/// or have been cleaned up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Stage the job last reported; serialised as its index or `-1`.
    #[serde(serialize_with = "serialize_current_stage")]
    pub current_stage: Option<PipelineStage>,
    /// Current lifecycle status.
    pub status: ProgressStatus,
    /// Last message written to the snapshot.
    pub message: String,
    /// Time of the last snapshot write.
    #[serde(with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

/// How a single stage should be presented for a given snapshot.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StageState {
    /// The job has moved past this stage.
    Done,
    /// The job is at this stage with the given status.
    Active(ProgressStatus),
    /// The job has not reached this stage.
    Pending,
}

impl ProgressSnapshot {
    /// Classify `stage` relative to the snapshot's current stage.
    #[must_use]
    pub fn stage_state(&self, stage: PipelineStage) -> StageState {
        match self.current_stage {
            Some(current) if stage < current => StageState::Done,
            Some(current) if stage == current => StageState::Active(self.status),
            _ => StageState::Pending,
        }
    }

    /// One-based step number of the current stage.
    #[must_use]
    pub fn step_number(&self) -> Option<usize> {
        self.current_stage.map(|stage| stage.index() + 1)
    }

    /// Share of the catalogue reached so far, in `0.0..=1.0`.
    #[must_use]
    pub fn completed_fraction(&self) -> f64 {
        let Some(step) = self.step_number().and_then(|n| u32::try_from(n).ok()) else {
            return 0.0;
        };
        let total = u32::try_from(PIPELINE_STAGE_COUNT).unwrap_or(u32::MAX);
        (f64::from(step) / f64::from(total)).min(1.0)
    }

    /// `true` once the snapshot has reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

fn serialize_current_stage<S: Serializer>(
    stage: &Option<PipelineStage>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match stage {
        Some(current) => current.serialize(serializer),
        None => serializer.serialize_i64(-1),
    }
}

#[cfg(test)]
mod tests;
