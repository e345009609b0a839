//! Error types for the runner module.

use crate::report::ReportId;
use miette::Diagnostic;
use thiserror::Error;

/// Errors raised during command execution.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The analysis job ended in the `error` state.
    #[error("analysis {report_id} failed at stage {stage_index}: {message}")]
    #[diagnostic(
        code(grantscope::runner::pipeline_failed),
        help("rerun without --fail-at to let the pipeline complete")
    )]
    PipelineFailed {
        /// Report whose job failed.
        report_id: ReportId,
        /// Stage the job was at.
        stage_index: usize,
        /// Last progress message.
        message: String,
    },

    /// A merged setting is outside its accepted range.
    #[error("{setting} must be between {min} and {max}, got {value}")]
    #[diagnostic(
        code(grantscope::runner::setting_out_of_range),
        help("check the value in your grantscope config file or GRANTSCOPE_* environment")
    )]
    SettingOutOfRange {
        /// Name of the setting.
        setting: &'static str,
        /// Rejected value.
        value: u64,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
    },

    /// The job finished without persisting a report.
    #[error("no report was persisted for {report_id}")]
    #[diagnostic(code(grantscope::runner::missing_report))]
    MissingReport {
        /// Report id that has no stored report.
        report_id: ReportId,
    },
}
