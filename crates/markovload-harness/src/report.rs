//! Machine-readable run reports and the artifact index that links them to
//! their logs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use markovload_core::{GraphReport, LinearReport};
use markovload_heap::{CallCounts, GcStats};

use crate::structured_log::now_utc;

/// Summary of one workload run, written by `--report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub report_version: u32,
    pub run_id: String,
    pub workload: String,
    /// Allocator kind for linear runs, heap name for graph runs.
    pub boundary: String,
    pub seed: u64,
    pub total_ops: u64,
    pub generated_utc: String,
    pub duration_ms: u64,
    /// `true` when the run ended clean: no tag mismatches for linear runs,
    /// nothing left live after teardown for graph runs.
    pub passed: bool,
    pub counters: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary_counters: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_events: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_rss_bytes: Option<u64>,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[must_use]
pub fn linear_counters(r: &LinearReport) -> serde_json::Value {
    serde_json::json!({
        "steps": r.steps,
        "allocs": r.allocs,
        "deallocs": r.deallocs,
        "peak_live": r.peak_live,
        "teardown_frees": r.teardown_frees,
        "bytes_high_water": r.bytes_high_water,
        "skipped_budget": r.skipped_budget,
        "skipped_zero_size": r.skipped_zero_size,
        "alloc_failures": r.alloc_failures,
        "invalid_transitions": r.invalid_transitions,
        "tag_mismatches": r.tag_mismatches,
    })
}

#[must_use]
pub fn graph_counters(r: &GraphReport) -> serde_json::Value {
    serde_json::json!({
        "steps": r.steps,
        "gc_invocations": r.gc_invocations,
        "live_objects": r.live_objects,
        "setup_vertices": r.setup_vertices,
        "setup_edges": r.setup_edges,
        "vertices_created": r.vertices_created,
        "vertices_removed": r.vertices_removed,
        "edges_created": r.edges_created,
        "edges_removed": r.edges_removed,
        "writes": r.writes,
        "reads": r.reads,
        "skipped": r.skipped,
        "invalid_transitions": r.invalid_transitions,
        "collected": r.collected,
        "live_after_teardown": r.live_after_teardown,
    })
}

#[must_use]
pub fn call_counters(c: &CallCounts) -> serde_json::Value {
    serde_json::json!({
        "initialize": c.initialize,
        "finalize": c.finalize,
        "allocate": c.allocate,
        "deallocate": c.deallocate,
        "failed": c.failed,
        "bytes_requested": c.bytes_requested,
    })
}

#[must_use]
pub fn heap_counters(s: &GcStats) -> serde_json::Value {
    serde_json::json!({
        "created": s.created,
        "released_on_zero": s.released_on_zero,
        "swept": s.swept,
        "collections": s.collections,
        "stale_accesses": s.stale_accesses,
        "peak_live": s.peak_live,
    })
}

// ---------------------------------------------------------------------------
// Artifact index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub path: String,
    pub kind: String,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

/// Index of the files a run produced, with content hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactIndex {
    pub index_version: u32,
    pub run_id: String,
    pub generated_utc: String,
    pub artifacts: Vec<ArtifactEntry>,
}

impl ArtifactIndex {
    #[must_use]
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            index_version: 1,
            run_id: run_id.into(),
            generated_utc: now_utc(),
            artifacts: Vec::new(),
        }
    }

    /// Hash `path` and add it to the index.
    pub fn add_file(&mut self, path: &Path, kind: impl Into<String>) -> std::io::Result<&mut Self> {
        let bytes = std::fs::read(path)?;
        self.artifacts.push(ArtifactEntry {
            path: path.display().to_string(),
            kind: kind.into(),
            sha256: sha256_hex(&bytes),
            size_bytes: u64::try_from(bytes.len()).ok(),
        });
        Ok(self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
