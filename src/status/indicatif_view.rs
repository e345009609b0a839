//! Persistent per-stage progress lines backed by `indicatif`.

use super::{ProgressView, outcome_line, overall_line, stage_summary};
use crate::progress::{ProgressSnapshot, StageState};
use crate::stage::{PIPELINE_STAGE_COUNT, PipelineStage};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

#[derive(Debug)]
struct IndicatifState {
    progress: MultiProgress,
    bars: Vec<ProgressBar>,
    rendered: Vec<StageState>,
    overall: ProgressBar,
    overall_step: Option<usize>,
    finished: bool,
    is_hidden: bool,
}

impl IndicatifState {
    fn render(&mut self, snapshot: &ProgressSnapshot, finish_lines: bool) {
        for stage in PipelineStage::ALL {
            let index = stage.index();
            let state = snapshot.stage_state(stage);
            let changed = self.rendered.get(index) != Some(&state);
            if let Some(slot) = self.rendered.get_mut(index) {
                *slot = state;
            }
            let message = stage_summary(state, stage);
            if self.is_hidden {
                if changed && state != StageState::Pending {
                    drop(writeln!(io::stderr(), "{message}"));
                }
                continue;
            }
            let Some(bar) = self.bars.get(index) else {
                continue;
            };
            if finish_lines || state == StageState::Done {
                if !bar.is_finished() {
                    bar.finish_with_message(message);
                }
            } else if changed {
                bar.set_message(message);
            }
        }
        self.render_overall(snapshot, finish_lines);
    }

    fn render_overall(&mut self, snapshot: &ProgressSnapshot, finish_line: bool) {
        let step = snapshot.step_number();
        let changed = step != self.overall_step;
        self.overall_step = step;
        let Some(line) = overall_line(snapshot) else {
            return;
        };
        if changed {
            self.overall
                .set_position(step.and_then(|n| u64::try_from(n).ok()).unwrap_or(0));
            self.overall.set_message(line.clone());
            if self.is_hidden {
                drop(writeln!(io::stderr(), "{line}"));
            }
        }
        if finish_line && !self.overall.is_finished() {
            self.overall.finish_with_message(line);
        }
    }
}

/// Standard view backed by `indicatif::MultiProgress`.
///
/// Every catalogue stage owns one line that moves from pending through
/// running to done (or failed), and a final bar tracks the overall step.
/// When stderr is not a terminal the bars are hidden and changes are written
/// as plain lines instead.
#[derive(Debug)]
pub struct IndicatifView {
    state: Mutex<IndicatifState>,
}

impl IndicatifView {
    /// Construct a view with one persistent line per stage.
    #[must_use]
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr_with_hz(12))
    }

    /// Construct a view drawing to `target`.
    #[must_use]
    pub fn with_draw_target(target: ProgressDrawTarget) -> Self {
        let progress = MultiProgress::with_draw_target(target);
        progress.set_move_cursor(false);
        let style = ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());

        let initial = ProgressSnapshot::default();
        let mut bars = Vec::with_capacity(PipelineStage::ALL.len());
        let mut rendered = Vec::with_capacity(PipelineStage::ALL.len());
        for stage in PipelineStage::ALL {
            let state = initial.stage_state(stage);
            let bar = progress.add(ProgressBar::new(1));
            bar.set_style(style.clone());
            bar.set_message(stage_summary(state, stage));
            bars.push(bar);
            rendered.push(state);
        }
        let overall = progress.add(ProgressBar::new(
            u64::try_from(PIPELINE_STAGE_COUNT).unwrap_or(u64::MAX),
        ));
        overall.set_style(
            ProgressStyle::with_template("{bar:28} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        Self {
            state: Mutex::new(IndicatifState {
                is_hidden: progress.is_hidden(),
                progress,
                bars,
                rendered,
                overall,
                overall_step: None,
                finished: false,
            }),
        }
    }
}

impl Default for IndicatifView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IndicatifView {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            return;
        }
        for bar in state.bars.iter().chain([&state.overall]) {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
        drop(state.progress.clear());
    }
}

impl ProgressView for IndicatifView {
    fn observe(&self, snapshot: &ProgressSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            return;
        }
        state.render(snapshot, false);
    }

    fn finish(&self, snapshot: &ProgressSnapshot) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.finished {
            return;
        }
        state.render(snapshot, true);
        state.finished = true;
        if let Some(line) = outcome_line(snapshot) {
            drop(state.progress.println(&line));
            if state.is_hidden {
                drop(writeln!(io::stderr(), "{line}"));
            }
        }
    }
}
