//! Tests for progress snapshots and the progress store.

use super::*;
use crate::report::ReportId;
use rstest::{fixture, rstest};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use time::macros::datetime;
use time::{Date, Duration, Month};

/// Clock that advances by one second on every read.
fn ticking_clock(start: OffsetDateTime) -> Box<Clock> {
    let ticks = AtomicI64::new(0);
    Box::new(move || start + Duration::seconds(ticks.fetch_add(1, Ordering::SeqCst)))
}

#[fixture]
fn store() -> ProgressStore {
    ProgressStore::with_clock(
        DEFAULT_SHARD_COUNT,
        ticking_clock(datetime!(2025-09-08 13:40:00 UTC)),
    )
}

#[fixture]
fn report_id() -> ReportId {
    ReportId::from("RPT-TEST0001")
}

#[rstest]
fn unknown_report_reads_default_state(store: ProgressStore, report_id: ReportId) {
    assert_eq!(store.read_snapshot(&report_id), ProgressSnapshot::default());
    assert!(store.read_log(&report_id).is_empty());
    assert!(!store.contains(&report_id));
    let snapshot = store.read_snapshot(&report_id);
    assert_eq!(snapshot.current_stage, None);
    assert_eq!(snapshot.status, ProgressStatus::Pending);
}

#[rstest]
fn explicit_update_sets_stage_and_status(store: ProgressStore, report_id: ReportId) {
    let outcome = store.record_explicit(
        &report_id,
        2,
        ProgressStatus::Running,
        "Planning analysis (tools)",
    );
    assert!(matches!(outcome, Ok(WriteOutcome::Applied)));

    let snapshot = store.read_snapshot(&report_id);
    assert_eq!(snapshot.current_stage, Some(PipelineStage::PlanningAnalysis));
    assert_eq!(snapshot.status, ProgressStatus::Running);
    assert_eq!(snapshot.message, "Planning analysis (tools)");
    assert_eq!(snapshot.updated_at, Some(datetime!(2025-09-08 13:40:00 UTC)));
    assert!(
        store.read_log(&report_id).is_empty(),
        "explicit updates do not log"
    );
}

#[rstest]
fn explicit_update_rejects_unknown_stage(store: ProgressStore, report_id: ReportId) {
    let outcome = store.record_explicit(&report_id, 7, ProgressStatus::Running, "bogus");
    assert!(matches!(
        outcome,
        Err(ProgressError::StageOutOfRange { index: 7, count: 7 })
    ));
    assert!(!store.contains(&report_id));
}

#[rstest]
fn inferred_update_on_fresh_report_starts_running(store: ProgressStore, report_id: ReportId) {
    let outcome = store.record_inferred(
        &report_id,
        "Normalizing interview into StructuredNeeds for user X",
    );
    assert!(matches!(
        outcome,
        Ok(WriteOutcome::Classified(PipelineStage::NormalizingNeeds))
    ));

    let snapshot = store.read_snapshot(&report_id);
    assert_eq!(snapshot.current_stage, Some(PipelineStage::NormalizingNeeds));
    assert_eq!(snapshot.status, ProgressStatus::Running);
    assert_eq!(
        snapshot.message,
        "Normalizing interview into StructuredNeeds for user X"
    );
}

#[rstest]
fn inferred_update_preserves_existing_status(store: ProgressStore, report_id: ReportId) {
    drop(store.record_explicit(&report_id, 0, ProgressStatus::Running, "start"));
    drop(store.record_inferred(&report_id, "Stage 3: Executing planned metrics"));
    let snapshot = store.read_snapshot(&report_id);
    assert_eq!(snapshot.current_stage, Some(PipelineStage::ExecutingMetrics));
    assert_eq!(snapshot.status, ProgressStatus::Running);
}

#[rstest]
fn classification_miss_keeps_stage_but_updates_message(
    store: ProgressStore,
    report_id: ReportId,
) {
    drop(store.record_explicit(&report_id, 1, ProgressStatus::Running, "first"));
    let before = store.read_snapshot(&report_id);

    let outcome = store.record_inferred(&report_id, "still crunching numbers");
    assert!(matches!(outcome, Ok(WriteOutcome::Unclassified)));

    let after = store.read_snapshot(&report_id);
    assert_eq!(after.current_stage, Some(PipelineStage::NormalizingNeeds));
    assert_eq!(after.message, "still crunching numbers");
    assert!(after.updated_at > before.updated_at);
}

#[rstest]
#[case(ProgressStatus::Completed)]
#[case(ProgressStatus::Error)]
fn terminal_status_locks_inferred_updates(
    store: ProgressStore,
    report_id: ReportId,
    #[case] terminal: ProgressStatus,
) {
    drop(store.record_explicit(&report_id, 4, terminal, "done"));
    let before = store.read_snapshot(&report_id);

    let outcome = store.record_inferred(&report_id, "Stage 0: Summarizing intake");
    assert!(matches!(outcome, Ok(WriteOutcome::TerminalLocked(status)) if status == terminal));

    assert_eq!(store.read_snapshot(&report_id), before);
    let log = store.read_log(&report_id);
    assert_eq!(log.len(), 1);
    assert!(log.iter().all(|line| line.ends_with("Stage 0: Summarizing intake")));
}

#[rstest]
fn explicit_update_may_reopen_terminal_report(store: ProgressStore, report_id: ReportId) {
    drop(store.record_explicit(&report_id, 6, ProgressStatus::Completed, "done"));
    drop(store.record_explicit(&report_id, 2, ProgressStatus::Running, "again"));
    let snapshot = store.read_snapshot(&report_id);
    assert_eq!(snapshot.status, ProgressStatus::Running);
    assert_eq!(snapshot.current_stage, Some(PipelineStage::PlanningAnalysis));
}

#[rstest]
fn log_lines_carry_utc_timestamps_in_order(store: ProgressStore, report_id: ReportId) {
    drop(store.record_inferred(&report_id, "Stage 0: Summarizing intake"));
    drop(store.record_inferred(&report_id, "Stage 1: Normalizing interview into StructuredNeeds"));
    assert_eq!(
        store.read_log(&report_id),
        vec![
            "[2025-09-08T13:40:00Z] Stage 0: Summarizing intake".to_owned(),
            "[2025-09-08T13:40:01Z] Stage 1: Normalizing interview into StructuredNeeds"
                .to_owned(),
        ]
    );
}

#[rstest]
fn clock_offsets_are_normalised_to_utc(report_id: ReportId) {
    let store = ProgressStore::with_clock(
        NonZeroUsize::MIN,
        Box::new(|| datetime!(2025-09-08 15:40:00 +02:00)),
    );
    drop(store.record_inferred(&report_id, "hello"));
    assert_eq!(store.read_log(&report_id), vec!["[2025-09-08T13:40:00Z] hello".to_owned()]);
}

#[rstest]
fn unformattable_timestamp_records_nothing(report_id: ReportId) {
    let Ok(ancient) = Date::from_calendar_date(-1, Month::January, 1) else {
        panic!("negative years are representable");
    };
    let store = ProgressStore::with_clock(
        NonZeroUsize::MIN,
        Box::new(move || ancient.midnight().assume_utc()),
    );
    let outcome = store.record_inferred(&report_id, "Stage 0: Summarizing intake");
    assert!(matches!(outcome, Err(ProgressError::Timestamp(_))));
    assert!(!store.contains(&report_id));
}

#[rstest]
fn cleanup_is_idempotent(store: ProgressStore, report_id: ReportId) {
    drop(store.record_inferred(&report_id, "Stage 0: Summarizing intake"));
    assert!(store.cleanup(&report_id));
    assert_eq!(store.read_snapshot(&report_id), ProgressSnapshot::default());
    assert!(store.read_log(&report_id).is_empty());
    assert!(!store.cleanup(&report_id));
}

#[rstest]
fn single_shard_store_tracks_many_reports() {
    let store = ProgressStore::with_shards(NonZeroUsize::MIN);
    assert_eq!(store.shard_count(), 1);
    for n in 0..10 {
        let id = ReportId::new(format!("RPT-{n}"));
        drop(store.record_explicit(&id, n % 7, ProgressStatus::Running, "tick"));
    }
    for n in 0..10 {
        let id = ReportId::new(format!("RPT-{n}"));
        assert_eq!(store.read_snapshot(&id).step_number(), Some(n % 7 + 1));
    }
}

#[rstest]
fn callback_is_bound_to_its_report(report_id: ReportId) {
    let store = Arc::new(ProgressStore::new());
    let other = ReportId::from("RPT-OTHER");
    let callback = store.make_callback(report_id.clone());
    drop(callback(5, ProgressStatus::Error, "funder lookup failed"));

    let snapshot = store.read_snapshot(&report_id);
    assert_eq!(snapshot.status, ProgressStatus::Error);
    assert_eq!(snapshot.message, "funder lookup failed");
    assert!(!store.contains(&other));
}

#[rstest]
#[case("pending", ProgressStatus::Pending)]
#[case("running", ProgressStatus::Running)]
#[case("Completed", ProgressStatus::Completed)]
#[case(" error ", ProgressStatus::Error)]
fn status_parses_wire_names(#[case] raw: &str, #[case] expected: ProgressStatus) {
    assert!(matches!(raw.parse::<ProgressStatus>(), Ok(status) if status == expected));
}

#[test]
fn unknown_status_is_rejected() {
    assert!(matches!(
        "finished".parse::<ProgressStatus>(),
        Err(ProgressError::UnknownStatus { value }) if value == "finished"
    ));
}

#[test]
fn stage_states_follow_current_stage() {
    let snapshot = ProgressSnapshot {
        current_stage: Some(PipelineStage::PlanningAnalysis),
        status: ProgressStatus::Running,
        ..ProgressSnapshot::default()
    };
    assert_eq!(
        snapshot.stage_state(PipelineStage::SummarizingIntake),
        StageState::Done
    );
    assert_eq!(
        snapshot.stage_state(PipelineStage::PlanningAnalysis),
        StageState::Active(ProgressStatus::Running)
    );
    assert_eq!(
        snapshot.stage_state(PipelineStage::BuildingFigures),
        StageState::Pending
    );
}

#[test]
fn completed_fraction_tracks_step_number() {
    assert!(ProgressSnapshot::default().completed_fraction().abs() < f64::EPSILON);
    let last = ProgressSnapshot {
        current_stage: Some(PipelineStage::BuildingFigures),
        ..ProgressSnapshot::default()
    };
    assert!((last.completed_fraction() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn snapshot_serializes_unset_stage_as_minus_one() {
    let value = serde_json::to_value(ProgressSnapshot::default()).unwrap_or_default();
    assert_eq!(
        value,
        serde_json::json!({
            "current_stage": -1,
            "status": "pending",
            "message": "",
            "updated_at": null,
        })
    );
}

#[test]
fn snapshot_serializes_timestamp_as_rfc3339() {
    let snapshot = ProgressSnapshot {
        current_stage: Some(PipelineStage::ExecutingMetrics),
        status: ProgressStatus::Running,
        message: "Executing planned metrics".to_owned(),
        updated_at: Some(datetime!(2025-09-08 13:40:52 UTC)),
    };
    let value = serde_json::to_value(&snapshot).unwrap_or_default();
    assert_eq!(value["current_stage"], serde_json::json!(3));
    assert_eq!(value["updated_at"], serde_json::json!("2025-09-08T13:40:52Z"));
}
