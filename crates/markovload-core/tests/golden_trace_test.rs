//! Pinned linear trace for seed 0x1, 1000 steps, the `ver-1` matrix and a
//! three-entry small table. Any change to stream derivation, stride
//! selection, batch sizing or the size model shows up here first.

use markovload_core::{
    LinearReport, SizeTables, StepOutcome, TraceEvent, VecAllocator, Worker, WorkerConfig,
};
use markovload_core::trace::SkipReason;

fn golden_config() -> WorkerConfig {
    WorkerConfig::with_ops(1000)
        .seed(0x1)
        .size_tables(SizeTables::default().with_small(vec![8, 16, 32]))
        .record_trace(true)
}

fn run_golden() -> (LinearReport, Vec<TraceEvent>) {
    let mut worker = Worker::new(golden_config(), VecAllocator::new()).unwrap();
    let report = worker.run();
    let journal = worker.take_journal().unwrap();
    (report, journal.events().to_vec())
}

/// Operation of each step, in order, collapsing batch events.
fn step_operations(events: &[TraceEvent]) -> Vec<&'static str> {
    let mut out: Vec<(u64, &'static str)> = Vec::new();
    for e in events {
        if out.last().is_none_or(|&(step, _)| step != e.step) {
            out.push((e.step, e.operation));
        }
    }
    out.into_iter().map(|(_, op)| op).collect()
}

#[test]
fn golden_counters() {
    let (report, _) = run_golden();
    assert_eq!(
        report,
        LinearReport {
            steps: 1000,
            allocs: 7244,
            deallocs: 6669,
            peak_live: 785,
            teardown_frees: 575,
            bytes_high_water: 26_598_416,
            skipped_budget: 0,
            skipped_zero_size: 0,
            alloc_failures: 0,
            invalid_transitions: 0,
            tag_mismatches: 0,
        }
    );
}

#[test]
fn golden_operation_prefix() {
    let (_, events) = run_golden();
    let ops = step_operations(&events);
    assert_eq!(ops.len(), 1000);
    let expected = [
        "dealloc_many", "dealloc_single", "alloc_many", "dealloc_single", "alloc_many",
        "dealloc_single", "alloc_many", "dealloc_single", "alloc_many", "dealloc_single",
        "alloc_many", "dealloc_single", "alloc_many", "alloc_single", "alloc_single",
        "dealloc_many", "alloc_single", "dealloc_many", "alloc_single", "dealloc_many",
        "dealloc_single", "alloc_many", "dealloc_single", "alloc_many", "alloc_single",
        "dealloc_many", "dealloc_single", "alloc_many", "alloc_single", "dealloc_many",
        "dealloc_single", "alloc_many", "alloc_single", "alloc_single", "dealloc_many",
        "dealloc_single", "alloc_many", "alloc_single", "alloc_single", "dealloc_many",
    ];
    assert_eq!(&ops[..expected.len()], &expected);
}

#[test]
fn golden_event_prefix() {
    let (_, events) = run_golden();
    assert_eq!(events.len(), 12_361);
    assert_eq!(events.iter().filter(|e| e.outcome.is_applied()).count(), 12_127);

    // Step 0 is a six-slot DEALLOC_MANY over an empty table, stride 7.
    for (i, e) in events[..6].iter().enumerate() {
        assert_eq!(e.step, 0);
        assert_eq!(e.operation, "dealloc_many");
        assert_eq!(e.slot, Some(i * 7));
        assert_eq!(e.size, None);
        assert_eq!(e.outcome, StepOutcome::Skipped(SkipReason::EmptySlot));
    }
    assert_eq!(
        events[6],
        TraceEvent {
            step: 1,
            operation: "dealloc_single",
            slot: Some(42),
            size: None,
            outcome: StepOutcome::Skipped(SkipReason::EmptySlot),
        }
    );
    // Step 2 is a uniform ALLOC_MANY of 3072-byte blocks, stride 3.
    for (i, e) in events[7..30].iter().enumerate() {
        assert_eq!(e.step, 2);
        assert_eq!(e.operation, "alloc_many");
        assert_eq!(e.slot, Some(i * 3));
        assert_eq!(e.size, Some(3072));
        assert_eq!(e.outcome, StepOutcome::Applied);
    }
}

#[test]
fn golden_single_allocations() {
    let (_, events) = run_golden();
    let singles: Vec<(u64, usize, usize)> = events
        .iter()
        .filter(|e| e.operation == "alloc_single")
        .take(12)
        .map(|e| (e.step, e.slot.unwrap(), e.size.unwrap()))
        .collect();
    assert_eq!(
        singles,
        vec![
            (13, 726, 16),
            (14, 729, 32),
            (16, 732, 8),
            (18, 735, 8),
            (24, 978, 16),
            (28, 17, 8),
            (32, 44, 8),
            (33, 47, 524_288),
            (37, 59, 32),
            (38, 62, 4096),
            (46, 263, 16),
            (50, 338, 1024),
        ]
    );
}

#[test]
fn golden_digest_is_stable_across_runs() {
    let digest = || {
        let mut worker = Worker::new(golden_config(), VecAllocator::new()).unwrap();
        worker.run();
        worker.journal().unwrap().digest()
    };
    assert_eq!(digest(), digest());
}
