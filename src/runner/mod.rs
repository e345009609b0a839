//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! handles command execution. The `demo` command runs a simulated analysis
//! job on a worker thread and polls its progress from the calling thread,
//! the same split an interactive front end uses.

mod error;
mod sample;
mod simulate;

pub use error::RunnerError;
pub use sample::{
    datapoints_for, default_plan, derive_needs, deterministic_sections, sample_interview,
    sample_report, sample_signature,
};
pub use simulate::{COMPLETION_MESSAGE, PipelineOutcome, Simulation, run_pipeline};

use crate::cli::{Cli, Commands, DemoArgs, MAX_POLL_INTERVAL_MS};
use crate::hub::ProgressHub;
use crate::output_mode;
use crate::progress::{MAX_SHARD_COUNT, ProgressSnapshot};
use crate::report::ReportId;
use crate::stage::{self, PipelineStage};
use crate::status::{self, ProgressView};
use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Final state of a demo run, as printed by `demo --json`.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Report the run was tracked under.
    pub report_id: ReportId,
    /// Snapshot after the worker finished.
    pub snapshot: ProgressSnapshot,
    /// Full progress log.
    pub log: Vec<String>,
}

/// Execute the parsed [`Cli`] command.
///
/// # Errors
///
/// Returns an error if a merged setting is out of range, output cannot be
/// written, or the simulated pipeline ends in the `error` state.
pub fn run(cli: &Cli) -> Result<()> {
    let command = cli
        .command
        .clone()
        .unwrap_or_else(|| Commands::Demo(DemoArgs::default()));
    match command {
        Commands::Demo(args) => handle_demo(cli, &args),
        Commands::Stages { json } => handle_stages(json),
    }
}

/// Print the stage catalogue as text or JSON.
fn handle_stages(json: bool) -> Result<()> {
    let mut out = io::stdout().lock();
    if json {
        let text = serde_json::to_string_pretty(stage::stages())
            .context("serialize stage catalogue")?;
        writeln!(out, "{text}").context("write stage catalogue")?;
        return Ok(());
    }
    for def in stage::stages() {
        writeln!(
            out,
            "{}. {} - {} ({})",
            def.index, def.title, def.marker, def.estimated_duration
        )
        .context("write stage catalogue")?;
    }
    Ok(())
}

/// Reject merged settings that bypassed CLI validation via config or env.
fn validate_settings(cli: &Cli) -> Result<(), RunnerError> {
    let check = |setting: &'static str, configured: Option<u64>, max: u64| match configured {
        Some(value) if value == 0 || value > max => Err(RunnerError::SettingOutOfRange {
            setting,
            value,
            min: 1,
            max,
        }),
        _ => Ok(()),
    };
    let shards = cli.shards.map(|n| u64::try_from(n).unwrap_or(u64::MAX));
    let max_shards = u64::try_from(MAX_SHARD_COUNT).unwrap_or(u64::MAX);
    check("shards", shards, max_shards)?;
    check("poll_interval_ms", cli.poll_interval_ms, MAX_POLL_INTERVAL_MS)
}

fn handle_demo(cli: &Cli, args: &DemoArgs) -> Result<()> {
    validate_settings(cli)?;
    let interview = sample::sample_interview();
    let report_id = match &args.report_id {
        Some(id) => ReportId::from(id.as_str()),
        None => ReportId::for_interview(&interview, &sample::sample_signature())
            .context("derive report id")?,
    };
    let simulation = Simulation {
        stage_delay: cli.stage_delay(),
        fail_at: args.fail_at.and_then(PipelineStage::from_index),
        interview,
    };
    let hub: ProgressHub = ProgressHub::with_shards(cli.shard_count());
    let view = status::make_view(
        output_mode::resolve(cli.accessible),
        cli.progress.unwrap_or(true),
    );
    info!(report_id = %report_id, shards = cli.shard_count().get(), "starting demo run");

    let outcome = thread::scope(|scope| {
        let worker = scope.spawn(|| simulate::run_pipeline(&hub, &report_id, &simulation));
        watch(&hub, &report_id, view.as_ref(), cli.poll_interval(), &worker);
        worker
            .join()
            .map_err(|_| anyhow!("pipeline worker panicked"))
    })?;

    let snapshot = hub.read_snapshot(&report_id);
    view.finish(&snapshot);
    let summary = RunSummary {
        report_id: report_id.clone(),
        snapshot,
        log: hub.read_log(&report_id),
    };
    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize run summary")?;
        writeln!(io::stdout().lock(), "{text}").context("write run summary")?;
    }

    let result = finish_run(&hub, &summary, outcome, args);
    hub.cleanup(&report_id);
    result
}

/// Feed snapshots to `view` until the report is terminal or the worker
/// has exited.
fn watch<T>(
    hub: &ProgressHub,
    report_id: &ReportId,
    view: &dyn ProgressView,
    interval: Duration,
    worker: &ScopedJoinHandle<'_, T>,
) {
    loop {
        let snapshot = hub.read_snapshot(report_id);
        view.observe(&snapshot);
        if snapshot.is_terminal() || worker.is_finished() {
            debug!(report_id = %report_id, status = %snapshot.status, "stopped polling");
            return;
        }
        thread::sleep(interval);
    }
}

fn finish_run(
    hub: &ProgressHub,
    summary: &RunSummary,
    outcome: PipelineOutcome,
    args: &DemoArgs,
) -> Result<()> {
    let report_id = &summary.report_id;
    if let PipelineOutcome::Failed { stage } = outcome {
        return Err(RunnerError::PipelineFailed {
            report_id: report_id.clone(),
            stage_index: stage.index(),
            message: summary.snapshot.message.clone(),
        }
        .into());
    }
    let Some(path) = &args.emit else {
        return Ok(());
    };
    let report = hub
        .get_report(report_id)
        .ok_or_else(|| RunnerError::MissingReport {
            report_id: report_id.clone(),
        })?;
    let json = report.to_json().context("encode report")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(report_id = %report_id, path = %path.display(), "report written");
    Ok(())
}
