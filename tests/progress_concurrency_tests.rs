//! Concurrent producer/reader tests for the progress hub.

use anyhow::{Result, bail, ensure};
use grantscope_progress::ProgressHub;
use grantscope_progress::progress::{ProgressSnapshot, ProgressStatus, ProgressStore};
use grantscope_progress::report::{ReportId, ReportStore};
use grantscope_progress::stage::{PipelineStage, classify_stage};
use rstest::rstest;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;

const WRITES: usize = 200;

fn explicit_message(n: usize) -> String {
    format!("explicit update {n}")
}

fn inferred_message(n: usize) -> String {
    let stage = PipelineStage::ALL
        .get(n % PipelineStage::ALL.len())
        .copied()
        .unwrap_or(PipelineStage::SummarizingIntake);
    format!("Stage {}: {} ({n})", stage.index(), stage.marker())
}

#[rstest]
#[case::single_lock(1)]
#[case::sharded(16)]
fn readers_see_each_message_with_its_own_stage(#[case] shard_count: usize) -> Result<()> {
    let shards = NonZeroUsize::new(shard_count).unwrap_or(NonZeroUsize::MIN);
    let hub: ProgressHub<String> = ProgressHub::with_shards(shards);
    let id = ReportId::from("RPT-RACE");
    let issued: HashMap<String, Option<PipelineStage>> = (0..WRITES)
        .flat_map(|n| {
            let inferred = inferred_message(n);
            let inferred_stage = classify_stage(&inferred);
            [
                (explicit_message(n), PipelineStage::from_index(n % 7)),
                (inferred, inferred_stage),
            ]
        })
        .chain([(String::new(), None)])
        .collect();

    let observed: Vec<ProgressSnapshot> = thread::scope(|scope| {
        let explicit = scope.spawn(|| {
            let callback = hub.make_callback(id.clone());
            for n in 0..WRITES {
                drop(callback(n % 7, ProgressStatus::Running, &explicit_message(n)));
            }
        });
        let inferred = scope.spawn(|| {
            for n in 0..WRITES {
                drop(hub.record_inferred(&id, &inferred_message(n)));
            }
        });
        let mut seen = Vec::new();
        while !(explicit.is_finished() && inferred.is_finished()) {
            seen.push(hub.read_snapshot(&id));
        }
        seen
    });

    for snapshot in &observed {
        let Some(expected_stage) = issued.get(&snapshot.message) else {
            bail!("reader saw a message nobody wrote: {:?}", snapshot.message);
        };
        ensure!(
            snapshot.current_stage == *expected_stage,
            "message {:?} was paired with stage {:?}, expected {:?}",
            snapshot.message,
            snapshot.current_stage,
            expected_stage
        );
        ensure!(
            !snapshot.is_terminal(),
            "no terminal status was ever written"
        );
    }
    ensure!(hub.read_log(&id).len() == WRITES, "every inferred write is logged");
    Ok(())
}

#[test]
fn reports_do_not_affect_each_other() -> Result<()> {
    let hub: ProgressHub<String> = ProgressHub::new();
    let ids: Vec<ReportId> = (0..8).map(|n| ReportId::new(format!("RPT-{n:04}"))).collect();

    thread::scope(|scope| {
        for (n, id) in ids.iter().enumerate() {
            let shared = &hub;
            scope.spawn(move || {
                for stage in PipelineStage::ALL {
                    let message = format!("Stage {}: {}", stage.index(), stage.marker());
                    drop(shared.record_inferred(id, &message));
                }
                if n.is_multiple_of(2) {
                    drop(shared.record_explicit(id, 6, ProgressStatus::Completed, "done"));
                    shared.persist(id, format!("report {n}"));
                } else {
                    drop(shared.record_explicit(id, 3, ProgressStatus::Error, "failed"));
                }
            });
        }
    });

    for (n, id) in ids.iter().enumerate() {
        let snapshot = hub.read_snapshot(id);
        ensure!(hub.read_log(id).len() == 7, "each report logs its own 7 stages");
        if n.is_multiple_of(2) {
            ensure!(snapshot.status == ProgressStatus::Completed, "{id} should be completed");
            ensure!(
                hub.get_report(id).as_deref() == Some(&format!("report {n}")),
                "{id} should hold its own report"
            );
        } else {
            ensure!(snapshot.status == ProgressStatus::Error, "{id} should have failed");
            ensure!(hub.get_report(id).is_none(), "{id} should have no report");
        }
    }
    Ok(())
}

#[test]
fn cleanup_of_one_report_leaves_others() -> Result<()> {
    let hub = ProgressHub::from_parts(
        Arc::new(ProgressStore::new()),
        Arc::new(ReportStore::<String>::new()),
    );
    let kept = ReportId::from("RPT-KEEP");
    let dropped = ReportId::from("RPT-DROP");
    for id in [&kept, &dropped] {
        drop(hub.record_inferred(id, "Stage 0: Summarizing intake"));
        hub.persist(id, id.to_string());
    }

    hub.cleanup(&dropped);
    hub.cleanup(&dropped);

    ensure!(
        hub.read_snapshot(&dropped) == ProgressSnapshot::default(),
        "dropped snapshot reset"
    );
    ensure!(hub.read_log(&dropped).is_empty(), "dropped log cleared");
    ensure!(hub.get_report(&dropped).is_none(), "dropped report removed");
    ensure!(
        hub.read_snapshot(&kept).current_stage == Some(PipelineStage::SummarizingIntake),
        "kept snapshot untouched"
    );
    ensure!(hub.get_report(&kept).is_some(), "kept report untouched");
    Ok(())
}
