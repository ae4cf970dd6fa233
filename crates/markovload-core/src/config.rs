//! Workload configuration and named matrix presets.
//!
//! Matrices are carried as raw rows and only validated when a worker is
//! constructed, so a bad configuration surfaces as a [`ConfigError`]
//! from the constructor before any boundary call.
//!
//! [`ConfigError`]: crate::error::ConfigError

use crate::scatter::{DEFAULT_ALLOC_BATCH_SIZES, DEFAULT_FREE_BATCH_SIZES, DEFAULT_STRIDE_PRIMES};
use crate::size_model::SizeTables;

/// Default operation budget for both workloads.
pub const DEFAULT_TOTAL_OPS: u64 = 128 * 1024;
/// Default soft cap on bytes held by the linear workload.
pub const DEFAULT_MEMORY_BUDGET: usize = 1 << 30;
/// Default master seed of the linear workload.
pub const DEFAULT_LINEAR_SEED: u64 = 0x1337_96A5_FF21_B3C1;
/// Default master seed of the graph workload.
pub const DEFAULT_GRAPH_SEED: u64 = 0x1337_96A5_FF21_B3C7;
/// Draws at or below this make an ALLOC_MANY batch use one size.
pub const DEFAULT_UNIFORM_BATCH_THRESHOLD: f64 = 0.8;
/// Default graph slot-table size.
pub const DEFAULT_GRAPH_SLOTS: usize = 1024;
pub const DEFAULT_CLUSTERS: usize = 9;
pub const DEFAULT_GRAPH_DENSITY: f64 = 0.7;
pub const DEFAULT_VERTEX_DENSITY_FACTOR: f64 = 0.8;

/// Linear matrix presets. Rows and columns are in the order
/// ALLOC_SINGLE, ALLOC_MANY, DEALLOC_SINGLE, DEALLOC_MANY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearPreset {
    /// Bursty: single allocs chain into bulk frees and back.
    #[default]
    Ver1,
    /// Mixed: every operation reachable from every state.
    Ver2,
}

impl LinearPreset {
    #[must_use]
    pub const fn matrix(self) -> [[f64; 4]; 4] {
        match self {
            Self::Ver1 => [
                [0.15, 0.0, 0.0, 0.85],
                [0.65, 0.0, 0.35, 0.0],
                [0.0, 0.82, 0.0, 0.18],
                [0.07, 0.0, 0.93, 0.0],
            ],
            Self::Ver2 => [
                [0.2, 0.1, 0.6, 0.1],
                [0.4, 0.1, 0.3, 0.2],
                [0.1, 0.4, 0.1, 0.4],
                [0.5, 0.05, 0.4, 0.05],
            ],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ver1 => "ver-1",
            Self::Ver2 => "ver-2",
        }
    }

    /// Accepts `ver-1`, `ver1`, `v1`, `1` (and the same for 2), any case.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "ver1" | "v1" | "1" => Some(Self::Ver1),
            "ver2" | "v2" | "2" => Some(Self::Ver2),
            _ => None,
        }
    }
}

/// Graph matrix presets. Rows and columns are in the order CREATE_VERTEX,
/// REMOVE_VERTEX, CREATE_EDGE, REMOVE_EDGE, WRITE_DATA, READ_DATA,
/// COLLECT_GARBAGE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GraphPreset {
    #[default]
    NormWorkload,
    /// More removals and collector calls.
    GcHeavy,
}

impl GraphPreset {
    #[must_use]
    pub const fn matrix(self) -> [[f64; 7]; 7] {
        const TAIL: [[f64; 7]; 3] = [
            [0.1016, 0.209, 0.13, 0.15, 0.2, 0.209, 0.0004],
            [0.14, 0.199, 0.11, 0.15, 0.2, 0.2, 0.001],
            [0.35, 0.05, 0.35, 0.05, 0.099, 0.1009, 0.0001],
        ];
        match self {
            Self::NormWorkload => [
                [0.404, 0.02, 0.25, 0.02, 0.24, 0.065, 0.001],
                [0.12, 0.447, 0.15, 0.25, 0.02, 0.009, 0.004],
                [0.18, 0.1, 0.38, 0.01, 0.3, 0.029, 0.001],
                [0.17, 0.32, 0.127, 0.28, 0.043, 0.053, 0.007],
                TAIL[0],
                TAIL[1],
                TAIL[2],
            ],
            Self::GcHeavy => [
                [0.404, 0.02, 0.25, 0.02, 0.237, 0.06, 0.009],
                [0.12, 0.445, 0.15, 0.25, 0.02, 0.009, 0.006],
                [0.18, 0.1, 0.38, 0.01, 0.297, 0.029, 0.004],
                [0.17, 0.29, 0.127, 0.25, 0.043, 0.05, 0.07],
                TAIL[0],
                TAIL[1],
                TAIL[2],
            ],
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NormWorkload => "norm-workload",
            Self::GcHeavy => "gc-heavy",
        }
    }

    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "normworkload" | "norm" | "normal" | "default" => Some(Self::NormWorkload),
            "gcheavy" | "gc" | "heavy" => Some(Self::GcHeavy),
            _ => None,
        }
    }
}

/// Linear workload configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub total_ops: u64,
    pub slots: usize,
    pub memory_budget: usize,
    pub matrix: [[f64; 4]; 4],
    pub seed: u64,
    pub uniform_batch_threshold: f64,
    pub size_tables: SizeTables,
    pub stride_primes: Vec<usize>,
    pub alloc_batch_sizes: Vec<usize>,
    pub free_batch_sizes: Vec<usize>,
    pub record_trace: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            total_ops: DEFAULT_TOTAL_OPS,
            slots: DEFAULT_TOTAL_OPS as usize,
            memory_budget: DEFAULT_MEMORY_BUDGET,
            matrix: LinearPreset::Ver1.matrix(),
            seed: DEFAULT_LINEAR_SEED,
            uniform_batch_threshold: DEFAULT_UNIFORM_BATCH_THRESHOLD,
            size_tables: SizeTables::default(),
            stride_primes: DEFAULT_STRIDE_PRIMES.to_vec(),
            alloc_batch_sizes: DEFAULT_ALLOC_BATCH_SIZES.to_vec(),
            free_batch_sizes: DEFAULT_FREE_BATCH_SIZES.to_vec(),
            record_trace: false,
        }
    }
}

impl WorkerConfig {
    /// Default configuration sized for `total_ops` steps, one slot per step.
    #[must_use]
    pub fn with_ops(total_ops: u64) -> Self {
        Self {
            total_ops,
            slots: usize::try_from(total_ops).unwrap_or(usize::MAX),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    #[must_use]
    pub fn memory_budget(mut self, bytes: usize) -> Self {
        self.memory_budget = bytes;
        self
    }

    #[must_use]
    pub fn preset(mut self, preset: LinearPreset) -> Self {
        self.matrix = preset.matrix();
        self
    }

    #[must_use]
    pub fn matrix(mut self, rows: [[f64; 4]; 4]) -> Self {
        self.matrix = rows;
        self
    }

    #[must_use]
    pub fn size_tables(mut self, tables: SizeTables) -> Self {
        self.size_tables = tables;
        self
    }

    #[must_use]
    pub fn record_trace(mut self, on: bool) -> Self {
        self.record_trace = on;
        self
    }
}

/// Graph workload configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    pub total_ops: u64,
    pub slots: usize,
    pub clusters: usize,
    /// Probability that a setup slot stays empty.
    pub graph_density: f64,
    /// Probability that a setup edge slot stays empty.
    pub vertex_density_factor: f64,
    pub matrix: [[f64; 7]; 7],
    pub seed: u64,
    pub record_trace: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            total_ops: DEFAULT_TOTAL_OPS,
            slots: DEFAULT_GRAPH_SLOTS,
            clusters: DEFAULT_CLUSTERS,
            graph_density: DEFAULT_GRAPH_DENSITY,
            vertex_density_factor: DEFAULT_VERTEX_DENSITY_FACTOR,
            matrix: GraphPreset::NormWorkload.matrix(),
            seed: DEFAULT_GRAPH_SEED,
            record_trace: false,
        }
    }
}

impl GraphConfig {
    #[must_use]
    pub fn with_ops(total_ops: u64) -> Self {
        Self {
            total_ops,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn slots(mut self, slots: usize) -> Self {
        self.slots = slots;
        self
    }

    #[must_use]
    pub fn clusters(mut self, clusters: usize) -> Self {
        self.clusters = clusters;
        self
    }

    #[must_use]
    pub fn densities(mut self, graph_density: f64, vertex_density_factor: f64) -> Self {
        self.graph_density = graph_density;
        self.vertex_density_factor = vertex_density_factor;
        self
    }

    #[must_use]
    pub fn preset(mut self, preset: GraphPreset) -> Self {
        self.matrix = preset.matrix();
        self
    }

    #[must_use]
    pub fn matrix(mut self, rows: [[f64; 7]; 7]) -> Self {
        self.matrix = rows;
        self
    }

    #[must_use]
    pub fn record_trace(mut self, on: bool) -> Self {
        self.record_trace = on;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markov::ROW_SUM_TOLERANCE;

    fn rows_sum_to_one<const N: usize>(rows: &[[f64; N]; N]) -> bool {
        rows.iter()
            .all(|r| (r.iter().sum::<f64>() - 1.0).abs() <= ROW_SUM_TOLERANCE)
    }

    #[test]
    fn presets_are_stochastic() {
        assert!(rows_sum_to_one(&LinearPreset::Ver1.matrix()));
        assert!(rows_sum_to_one(&LinearPreset::Ver2.matrix()));
        assert!(rows_sum_to_one(&GraphPreset::NormWorkload.matrix()));
        assert!(rows_sum_to_one(&GraphPreset::GcHeavy.matrix()));
    }

    #[test]
    fn loose_parsing() {
        assert_eq!(LinearPreset::from_str_loose(" VER-2 "), Some(LinearPreset::Ver2));
        assert_eq!(LinearPreset::from_str_loose("v1"), Some(LinearPreset::Ver1));
        assert_eq!(LinearPreset::from_str_loose("ver-3"), None);
        assert_eq!(
            GraphPreset::from_str_loose("gc_heavy"),
            Some(GraphPreset::GcHeavy)
        );
        assert_eq!(
            GraphPreset::from_str_loose("Norm-Workload"),
            Some(GraphPreset::NormWorkload)
        );
        assert_eq!(GraphPreset::from_str_loose("???"), None);
    }

    #[test]
    fn linear_slots_follow_ops() {
        let c = WorkerConfig::with_ops(1000);
        assert_eq!(c.slots, 1000);
        assert_eq!(WorkerConfig::default().slots, 131_072);
    }
}
