//! Map free-text backend messages onto catalogue stages.

use super::{PipelineStage, StageDefinition};

/// Return the first stage whose marker occurs in `message`.
///
/// Matching is a case-insensitive substring test performed in catalogue
/// order, so extra detail around the marker ("Stage 3: Executing planned
/// metrics now") still resolves. Returns `None` when no marker matches.
///
/// # Examples
///
/// ```
/// use grantscope_progress::stage::{PipelineStage, classify_stage};
///
/// assert_eq!(
///     classify_stage("Executing planned metrics now"),
///     Some(PipelineStage::ExecutingMetrics)
/// );
/// assert_eq!(classify_stage("unrelated text"), None);
/// ```
#[must_use]
pub fn classify_stage(message: &str) -> Option<PipelineStage> {
    let haystack = message.to_lowercase();
    PipelineStage::ALL
        .into_iter()
        .find(|stage| haystack.contains(&stage.marker().to_lowercase()))
}

/// Catalogue entry for the stage `message` refers to, if any.
#[must_use]
pub fn classify(message: &str) -> Option<&'static StageDefinition> {
    classify_stage(message).map(PipelineStage::definition)
}
