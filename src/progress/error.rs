//! Error types for progress writes.

use miette::Diagnostic;
use thiserror::Error;

/// Reasons a progress write can be rejected.
///
/// None of these should stop a pipeline: callers typically log and discard
/// them.
#[derive(Debug, Error, Diagnostic)]
pub enum ProgressError {
    /// An explicit update named a stage index the catalogue does not have.
    #[error("stage index {index} is outside the catalogue of {count} stages")]
    #[diagnostic(
        code(grantscope::progress::stage_out_of_range),
        help("stage indices are zero-based and must be below the catalogue length")
    )]
    StageOutOfRange {
        /// Index supplied by the caller.
        index: usize,
        /// Number of stages in the catalogue.
        count: usize,
    },

    /// A status string did not name a known status.
    #[error("unknown progress status '{value}'")]
    #[diagnostic(
        code(grantscope::progress::unknown_status),
        help("expected one of: pending, running, completed, error")
    )]
    UnknownStatus {
        /// The rejected input.
        value: String,
    },

    /// The log timestamp could not be rendered as RFC 3339.
    #[error("failed to format progress log timestamp")]
    #[diagnostic(code(grantscope::progress::timestamp))]
    Timestamp(#[from] time::error::Format),
}
