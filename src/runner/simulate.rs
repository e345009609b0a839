//! Simulated analysis job that drives the progress hub like the real
//! pipeline does.

use super::sample;
use crate::hub::ProgressHub;
use crate::progress::{ProgressStatus, WriteResult};
use crate::report::{InterviewInput, ReportId};
use crate::stage::PipelineStage;
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Final message written when every stage has run.
pub const COMPLETION_MESSAGE: &str = "Pipeline complete";

/// Parameters of one simulated run.
#[derive(Debug, Clone)]
pub struct Simulation {
    /// Time spent in each stage.
    pub stage_delay: Duration,
    /// Stage at which the run reports an error and stops.
    pub fail_at: Option<PipelineStage>,
    /// Interview the report is built from.
    pub interview: InterviewInput,
}

/// How a simulated run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// All stages ran and the report was persisted.
    Completed,
    /// The run stopped at `stage`.
    Failed {
        /// Stage that failed.
        stage: PipelineStage,
    },
}

/// Run every stage for `report_id`, writing progress through `hub`.
///
/// Each stage first sends its marker as a free-text message, then an
/// explicit `running` update through the report's callback. Progress write
/// failures are logged and otherwise ignored.
pub fn run_pipeline(
    hub: &ProgressHub,
    report_id: &ReportId,
    simulation: &Simulation,
) -> PipelineOutcome {
    let callback = hub.make_callback(report_id.clone());
    for stage in PipelineStage::ALL {
        let marker = format!("Stage {}: {}", stage.index(), stage.marker());
        note(report_id, hub.record_inferred(report_id, &marker));

        if simulation.fail_at == Some(stage) {
            let message = format!("{} failed: simulated failure", stage.title());
            note(report_id, callback(stage.index(), ProgressStatus::Error, &message));
            debug!(report_id = %report_id, stage = stage.index(), "simulated pipeline failed");
            return PipelineOutcome::Failed { stage };
        }

        let message = format!("Starting {}", stage.title());
        note(report_id, callback(stage.index(), ProgressStatus::Running, &message));
        thread::sleep(simulation.stage_delay);
    }

    let report = sample::sample_report(&simulation.interview, OffsetDateTime::now_utc());
    hub.persist(report_id, report);
    note(
        report_id,
        callback(
            PipelineStage::BuildingFigures.index(),
            ProgressStatus::Completed,
            COMPLETION_MESSAGE,
        ),
    );
    note(report_id, hub.record_inferred(report_id, COMPLETION_MESSAGE));
    PipelineOutcome::Completed
}

fn note(report_id: &ReportId, result: WriteResult) {
    if let Err(err) = result {
        warn!(report_id = %report_id, error = %err, "progress write failed");
    }
}
