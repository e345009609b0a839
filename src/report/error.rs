//! Error types for report encoding.

use miette::Diagnostic;
use thiserror::Error;

/// Failures encoding or decoding report bundles.
#[derive(Debug, Error, Diagnostic)]
pub enum ReportError {
    /// The report could not be encoded as JSON.
    #[error("failed to encode report as JSON")]
    #[diagnostic(code(grantscope::report::serialize))]
    Serialize(#[source] serde_json::Error),

    /// The JSON text is not a valid report bundle.
    #[error("invalid report bundle JSON")]
    #[diagnostic(
        code(grantscope::report::parse),
        help("the bundle must contain at least `interview`, `needs` and `plan` objects")
    )]
    Parse(#[source] serde_json::Error),
}
