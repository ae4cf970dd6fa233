//! Integration tests: runs write schema-valid structured logs.
//!
//! Validates:
//! 1. A traced linear run logs run_start, one step line per journal event,
//!    and run_complete with counters, all accepted by the validator.
//! 2. A graph run reports peak RSS and a clean teardown.
//! 3. The same spec reproduces the same digest and counters.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use markovload_core::{GraphConfig, GraphPreset, WorkerConfig};
use markovload_harness::runner::{RunOptions, run_graph, run_linear};
use markovload_harness::structured_log::{LogEmitter, Outcome, validate_log_file, validate_log_line};
use markovload_harness::{LinearSpec, MatrixSpec};
use markovload_heap::AllocatorKind;

fn unique_tmp_path(prefix: &str, suffix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{}-{nanos}{suffix}", std::process::id()))
}

#[test]
fn traced_linear_run_logs_every_event() {
    let path = unique_tmp_path("markovload-linear", ".jsonl");
    let mut log = LogEmitter::to_file(&path, "run-a", "linear").unwrap();
    let config = WorkerConfig::with_ops(500).seed(11).record_trace(true);
    let options = RunOptions::new("run-a", AllocatorKind::System);
    let run = run_linear(config, &options, &mut log).unwrap();
    drop(log);

    let journal = run.journal.as_ref().expect("trace was requested");
    let (lines, errors) = validate_log_file(&path).unwrap();
    assert!(errors.is_empty(), "violations: {errors:?}");
    assert_eq!(lines, journal.len() + 2);

    let content = std::fs::read_to_string(&path).unwrap();
    let entries: Vec<_> = content
        .lines()
        .enumerate()
        .map(|(i, l)| validate_log_line(l, i + 1).unwrap())
        .collect();
    assert_eq!(entries[0].event, "run_start");
    assert_eq!(entries[0].trace_id, "run-a::linear::001");
    assert_eq!(entries[0].seed, Some(11));

    let last = entries.last().unwrap();
    assert_eq!(last.event, "run_complete");
    assert_eq!(last.outcome, Some(Outcome::Pass));
    let counters = last.counters.as_ref().unwrap();
    assert_eq!(counters["steps"], 500);
    assert_eq!(counters["allocs"], run.report.allocs);

    for (entry, event) in entries[1..entries.len() - 1].iter().zip(journal.events()) {
        assert_eq!(entry.event, "step");
        assert_eq!(entry.step, Some(event.step));
        assert_eq!(entry.operation.as_deref(), Some(event.operation));
        assert_eq!(entry.slot, event.slot);
        assert_eq!(entry.size, event.size);
    }
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn graph_run_reports_clean_teardown() {
    let mut log = LogEmitter::discard("run-g", "graph");
    let config = GraphConfig::with_ops(5_000).preset(GraphPreset::GcHeavy);
    let run = run_graph(config, &mut log).unwrap();
    assert!(run.passed());
    assert_eq!(run.report.steps, 5_000);
    assert_eq!(run.heap.stale_accesses, 0);
    let report = run.to_report("run-g");
    assert_eq!(report.workload, "graph");
    assert_eq!(report.boundary, "gc-heap");
    assert_eq!(report.counters["live_after_teardown"], 0);
    if cfg!(any(target_os = "linux", target_os = "macos")) {
        assert!(report.peak_rss_bytes.unwrap() > 0);
    }
}

#[test]
fn spec_driven_runs_are_reproducible() {
    let spec = LinearSpec {
        seed: Some(0xABCD),
        ops: Some(3_000),
        matrix: Some(MatrixSpec::Preset("ver-2".into())),
        budget_bytes: Some(1 << 20),
        trace: Some(true),
        ..LinearSpec::default()
    };
    let run = |kind| {
        let mut log = LogEmitter::discard("r", "linear");
        run_linear(spec.to_config().unwrap(), &RunOptions::new("r", kind), &mut log).unwrap()
    };
    let a = run(AllocatorKind::System);
    let b = run(AllocatorKind::Libc);
    assert_eq!(a.report, b.report);
    assert_eq!(
        a.to_report("r").trace_digest,
        b.to_report("r").trace_digest
    );
    assert!(a.report.bytes_high_water <= 1 << 20);
}
