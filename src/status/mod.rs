//! Terminal views of a report's progress.
//!
//! A [`ProgressView`] is fed snapshots polled from the progress store and
//! renders them for the user. [`AccessibleView`] prints one static, labelled
//! line per change. [`IndicatifView`] keeps one persistent line per stage
//! plus an overall step bar in an `indicatif::MultiProgress`. [`SilentView`]
//! renders nothing.
//!
//! Views never fail: terminal write errors are discarded so that rendering
//! cannot disturb the job being observed.

mod indicatif_view;

pub use indicatif_view::IndicatifView;

use crate::output_mode::OutputMode;
use crate::progress::{ProgressSnapshot, ProgressStatus, StageState};
use crate::stage::{PIPELINE_STAGE_COUNT, PipelineStage};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Renders progress snapshots for a user.
pub trait ProgressView {
    /// Render a freshly polled snapshot. Called repeatedly, often with an
    /// unchanged snapshot.
    fn observe(&self, snapshot: &ProgressSnapshot);

    /// Render the terminal snapshot once polling has stopped.
    fn finish(&self, snapshot: &ProgressSnapshot);
}

/// Pick the view for the resolved output mode. `progress == false` silences
/// progress output entirely.
#[must_use]
pub fn make_view(mode: OutputMode, progress: bool) -> Box<dyn ProgressView> {
    match (progress, mode) {
        (false, _) => Box::new(SilentView),
        (true, OutputMode::Accessible) => Box::new(AccessibleView::new()),
        (true, OutputMode::Standard) => Box::new(IndicatifView::new()),
    }
}

/// `Stage <n>/<total>: <title>`, numbered from one.
#[must_use]
pub fn stage_label(stage: PipelineStage) -> String {
    format!(
        "Stage {}/{PIPELINE_STAGE_COUNT}: {}",
        stage.index() + 1,
        stage.title()
    )
}

/// Short word describing a stage's state.
#[must_use]
pub const fn state_label(state: StageState) -> &'static str {
    match state {
        StageState::Done | StageState::Active(ProgressStatus::Completed) => "done",
        StageState::Active(ProgressStatus::Running) => "running",
        StageState::Active(ProgressStatus::Error) => "failed",
        StageState::Active(ProgressStatus::Pending) | StageState::Pending => "pending",
    }
}

/// `[<state>] Stage <n>/<total>: <title>` for one catalogue line.
#[must_use]
pub fn stage_summary(state: StageState, stage: PipelineStage) -> String {
    format!("[{}] {}", state_label(state), stage_label(stage))
}

/// `Step <n> of <total> complete (<percent>%)` once a stage has been reached.
#[must_use]
pub fn overall_line(snapshot: &ProgressSnapshot) -> Option<String> {
    let step = snapshot.step_number()?;
    let percent = snapshot.completed_fraction() * 100.0;
    Some(format!(
        "Step {step} of {PIPELINE_STAGE_COUNT} complete ({percent:.0}%)"
    ))
}

/// Closing line for a terminal snapshot, if it is terminal.
#[must_use]
pub fn outcome_line(snapshot: &ProgressSnapshot) -> Option<String> {
    match snapshot.status {
        ProgressStatus::Completed => Some(format!("Report ready: {}", snapshot.message)),
        ProgressStatus::Error => Some(format!("Analysis failed: {}", snapshot.message)),
        ProgressStatus::Pending | ProgressStatus::Running => None,
    }
}

/// Silent view: renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentView;

impl ProgressView for SilentView {
    fn observe(&self, _snapshot: &ProgressSnapshot) {}
    fn finish(&self, _snapshot: &ProgressSnapshot) {}
}

#[derive(Debug)]
struct AccessibleState<W> {
    out: W,
    last: Option<ProgressSnapshot>,
}

/// Accessible view: writes a static, labelled line whenever the stage,
/// status or message changes, followed by the overall step line when the
/// stage advances.
#[derive(Debug)]
pub struct AccessibleView<W = io::Stderr> {
    state: Mutex<AccessibleState<W>>,
}

impl AccessibleView {
    /// View writing to standard error.
    #[must_use]
    pub fn new() -> Self {
        Self::with_writer(io::stderr())
    }
}

impl Default for AccessibleView {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> AccessibleView<W> {
    /// View writing to `out`.
    #[must_use]
    pub const fn with_writer(out: W) -> Self {
        Self {
            state: Mutex::new(AccessibleState { out, last: None }),
        }
    }

    /// Recover the writer, e.g. to inspect captured output.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .out
    }

    fn line_for(snapshot: &ProgressSnapshot) -> String {
        let status = snapshot.status;
        match snapshot.current_stage {
            Some(stage) => format!("{} ({status}): {}", stage_label(stage), snapshot.message),
            None => format!("Progress ({status}): {}", snapshot.message),
        }
    }
}

impl<W: Write> ProgressView for AccessibleView<W> {
    fn observe(&self, snapshot: &ProgressSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let unchanged = state.last.as_ref().is_some_and(|last| {
            last.current_stage == snapshot.current_stage
                && last.status == snapshot.status
                && last.message == snapshot.message
        });
        if unchanged || (snapshot.current_stage.is_none() && snapshot.message.is_empty()) {
            return;
        }
        let previous_step = state.last.as_ref().and_then(ProgressSnapshot::step_number);
        drop(writeln!(state.out, "{}", Self::line_for(snapshot)));
        if let Some(overall) =
            overall_line(snapshot).filter(|_| snapshot.step_number() != previous_step)
        {
            drop(writeln!(state.out, "{overall}"));
        }
        state.last = Some(snapshot.clone());
    }

    fn finish(&self, snapshot: &ProgressSnapshot) {
        self.observe(snapshot);
        let Some(line) = outcome_line(snapshot) else {
            return;
        };
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        drop(writeln!(state.out, "{line}"));
    }
}
