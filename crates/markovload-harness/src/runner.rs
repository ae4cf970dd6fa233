//! Linear and graph runs over a concrete boundary, with structured logging.
//!
//! Each run writes `run_start`, then one `step` line per journal event when
//! tracing is on, then `run_complete` (or `run_rejected` when the
//! configuration fails validation before the boundary is touched).

use std::time::{Duration, Instant};

use markovload_core::{
    AllocatorBoundary, ConfigError, GraphConfig, GraphReport, GraphWorker, LinearReport,
    TraceJournal, Worker, WorkerConfig,
};
use markovload_heap::{
    AllocatorKind, CallCounts, CountingAllocator, GcHeap, GcStats, LibcAllocator,
    SystemAllocator, peak_rss_bytes,
};

use crate::error::HarnessError;
use crate::report::{RunReport, call_counters, graph_counters, heap_counters, linear_counters};
use crate::structured_log::{LogEmitter, LogLevel, Outcome};

/// Settings shared by both workloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    pub run_id: String,
    pub allocator: AllocatorKind,
}

impl RunOptions {
    #[must_use]
    pub fn new(run_id: impl Into<String>, allocator: AllocatorKind) -> Self {
        Self {
            run_id: run_id.into(),
            allocator,
        }
    }
}

/// Pick the allocator: explicit flag, then spec file, then
/// `MARKOVLOAD_ALLOCATOR`. Explicit names must be known.
pub fn resolve_allocator(
    flag: Option<&str>,
    spec: Option<&str>,
) -> Result<AllocatorKind, HarnessError> {
    match flag.or(spec) {
        Some(name) => {
            AllocatorKind::parse(name).ok_or_else(|| HarnessError::UnknownAllocator(name.into()))
        }
        None => Ok(AllocatorKind::from_env()),
    }
}

/// Run id derived from the wall clock and process id.
#[must_use]
pub fn default_run_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("run-{}-{nanos:x}", std::process::id())
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Linear
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LinearRun {
    pub allocator: AllocatorKind,
    pub seed: u64,
    pub total_ops: u64,
    pub report: LinearReport,
    pub journal: Option<TraceJournal>,
    /// Boundary call counts, for the counting allocator only.
    pub calls: Option<CallCounts>,
    pub elapsed: Duration,
}

impl LinearRun {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.report.tag_mismatches == 0
    }

    #[must_use]
    pub fn to_report(&self, run_id: &str) -> RunReport {
        RunReport {
            report_version: 1,
            run_id: run_id.to_string(),
            workload: "linear".to_string(),
            boundary: self.allocator.as_str().to_string(),
            seed: self.seed,
            total_ops: self.total_ops,
            generated_utc: crate::structured_log::now_utc(),
            duration_ms: millis(self.elapsed),
            passed: self.passed(),
            counters: linear_counters(&self.report),
            boundary_counters: self.calls.as_ref().map(call_counters),
            trace_events: self.journal.as_ref().map(TraceJournal::len),
            trace_digest: self.journal.as_ref().map(TraceJournal::digest),
            peak_rss_bytes: None,
        }
    }
}

fn drive_linear<A: AllocatorBoundary>(
    config: WorkerConfig,
    allocator: A,
) -> Result<(LinearReport, Option<TraceJournal>), ConfigError> {
    let mut worker = Worker::new(config, allocator)?;
    let report = worker.run();
    Ok((report, worker.take_journal()))
}

/// Run the linear workload against `options.allocator`.
pub fn run_linear(
    config: WorkerConfig,
    options: &RunOptions,
    log: &mut LogEmitter,
) -> Result<LinearRun, HarnessError> {
    let seed = config.seed;
    let total_ops = config.total_ops;
    let start = log
        .entry(LogLevel::Info, "run_start")
        .with_allocator(options.allocator.as_str())
        .with_seed(seed)
        .with_details(serde_json::json!({
            "total_ops": total_ops,
            "slots": config.slots,
            "memory_budget": config.memory_budget,
            "record_trace": config.record_trace,
        }));
    log.emit_entry(start)?;

    let began = Instant::now();
    let mut calls = None;
    let outcome = match options.allocator {
        AllocatorKind::System => drive_linear(config, SystemAllocator::new()),
        AllocatorKind::Libc => drive_linear(config, LibcAllocator::new()),
        AllocatorKind::Counting => {
            let mut counting = CountingAllocator::new(SystemAllocator::new());
            let outcome = drive_linear(config, &mut counting);
            calls = Some(counting.counts());
            outcome
        }
    };
    let (report, journal) = match outcome {
        Ok(done) => done,
        Err(err) => {
            reject(log, options.allocator.as_str(), seed, &err)?;
            return Err(err.into());
        }
    };

    let run = LinearRun {
        allocator: options.allocator,
        seed,
        total_ops,
        report,
        journal,
        calls,
        elapsed: began.elapsed(),
    };
    emit_steps(log, run.journal.as_ref())?;
    let mut done = log
        .entry(level_for(run.passed()), "run_complete")
        .with_allocator(options.allocator.as_str())
        .with_seed(seed)
        .with_outcome(outcome_for(run.passed()))
        .with_counters(linear_counters(&run.report))
        .with_duration_ms(millis(run.elapsed));
    if let Some(calls) = &run.calls {
        done = done.with_details(serde_json::json!({ "boundary": call_counters(calls) }));
    }
    log.emit_entry(done)?;
    log.flush()?;
    Ok(run)
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GraphRun {
    pub seed: u64,
    pub total_ops: u64,
    pub report: GraphReport,
    pub journal: Option<TraceJournal>,
    pub heap: GcStats,
    pub peak_rss_bytes: Option<u64>,
    pub elapsed: Duration,
}

impl GraphRun {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.report.live_after_teardown == 0
    }

    #[must_use]
    pub fn to_report(&self, run_id: &str) -> RunReport {
        RunReport {
            report_version: 1,
            run_id: run_id.to_string(),
            workload: "graph".to_string(),
            boundary: "gc-heap".to_string(),
            seed: self.seed,
            total_ops: self.total_ops,
            generated_utc: crate::structured_log::now_utc(),
            duration_ms: millis(self.elapsed),
            passed: self.passed(),
            counters: graph_counters(&self.report),
            boundary_counters: Some(heap_counters(&self.heap)),
            trace_events: self.journal.as_ref().map(TraceJournal::len),
            trace_digest: self.journal.as_ref().map(TraceJournal::digest),
            peak_rss_bytes: self.peak_rss_bytes,
        }
    }
}

/// Run the graph workload against a fresh [`GcHeap`].
pub fn run_graph(config: GraphConfig, log: &mut LogEmitter) -> Result<GraphRun, HarnessError> {
    let seed = config.seed;
    let total_ops = config.total_ops;
    let start = log
        .entry(LogLevel::Info, "run_start")
        .with_allocator("gc-heap")
        .with_seed(seed)
        .with_details(serde_json::json!({
            "total_ops": total_ops,
            "slots": config.slots,
            "clusters": config.clusters,
            "graph_density": config.graph_density,
            "vertex_density_factor": config.vertex_density_factor,
            "record_trace": config.record_trace,
        }));
    log.emit_entry(start)?;

    let began = Instant::now();
    let mut worker = match GraphWorker::new(config, GcHeap::new()) {
        Ok(worker) => worker,
        Err(err) => {
            reject(log, "gc-heap", seed, &err)?;
            return Err(err.into());
        }
    };
    let report = worker.run();
    let run = GraphRun {
        seed,
        total_ops,
        report,
        journal: worker.take_journal(),
        heap: worker.heap().stats(),
        peak_rss_bytes: peak_rss_bytes(),
        elapsed: began.elapsed(),
    };

    emit_steps(log, run.journal.as_ref())?;
    let mut details = serde_json::json!({ "heap": heap_counters(&run.heap) });
    if let Some(rss) = run.peak_rss_bytes {
        details["peak_rss_bytes"] = rss.into();
    }
    let done = log
        .entry(level_for(run.passed()), "run_complete")
        .with_allocator("gc-heap")
        .with_seed(seed)
        .with_outcome(outcome_for(run.passed()))
        .with_counters(graph_counters(&run.report))
        .with_duration_ms(millis(run.elapsed))
        .with_details(details);
    log.emit_entry(done)?;
    log.flush()?;
    Ok(run)
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

fn emit_steps(log: &mut LogEmitter, journal: Option<&TraceJournal>) -> std::io::Result<()> {
    let Some(journal) = journal else {
        return Ok(());
    };
    for event in journal.events() {
        let entry = log.entry(LogLevel::Debug, "step").with_trace_event(event);
        log.emit_entry(entry)?;
    }
    Ok(())
}

fn reject(
    log: &mut LogEmitter,
    boundary: &str,
    seed: u64,
    err: &ConfigError,
) -> std::io::Result<()> {
    let entry = log
        .entry(LogLevel::Error, "run_rejected")
        .with_allocator(boundary)
        .with_seed(seed)
        .with_outcome(Outcome::Error)
        .with_details(serde_json::json!({ "error": err.to_string() }));
    log.emit_entry(entry)?;
    log.flush()
}

fn level_for(passed: bool) -> LogLevel {
    if passed { LogLevel::Info } else { LogLevel::Error }
}

fn outcome_for(passed: bool) -> Outcome {
    if passed { Outcome::Pass } else { Outcome::Fail }
}
