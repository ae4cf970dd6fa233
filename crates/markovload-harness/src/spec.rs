//! JSON run specs.
//!
//! A spec file overrides workload defaults; CLI flags are layered on top
//! with [`LinearSpec::overlay`] / [`GraphSpec::overlay`].
//!
//! ```json
//! {
//!   "allocator": "libc",
//!   "linear": { "seed": 1, "ops": 100000, "matrix": "ver-2" },
//!   "graph": { "ops": 50000, "matrix": [[0.1, ...], ...] }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use markovload_core::config::DEFAULT_TOTAL_OPS;
use markovload_core::{
    GraphConfig, GraphPreset, LinearPreset, SizeTables, TransitionMatrix, WorkerConfig,
};

use crate::error::{HarnessError, read_file};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSpec {
    pub allocator: Option<String>,
    pub linear: Option<LinearSpec>,
    pub graph: Option<GraphSpec>,
}

impl RunSpec {
    pub fn from_json(json: &str) -> Result<Self, HarnessError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, HarnessError> {
        Self::from_json(&read_file(path)?)
    }
}

/// A matrix given by preset name or as explicit rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatrixSpec {
    Preset(String),
    Rows(Vec<Vec<f64>>),
}

impl MatrixSpec {
    pub fn linear_rows(&self) -> Result<[[f64; 4]; 4], HarnessError> {
        match self {
            Self::Preset(name) => LinearPreset::from_str_loose(name)
                .map(LinearPreset::matrix)
                .ok_or_else(|| HarnessError::UnknownPreset {
                    workload: "linear",
                    name: name.clone(),
                }),
            Self::Rows(rows) => square(rows),
        }
    }

    pub fn graph_rows(&self) -> Result<[[f64; 7]; 7], HarnessError> {
        match self {
            Self::Preset(name) => GraphPreset::from_str_loose(name)
                .map(GraphPreset::matrix)
                .ok_or_else(|| HarnessError::UnknownPreset {
                    workload: "graph",
                    name: name.clone(),
                }),
            Self::Rows(rows) => square(rows),
        }
    }
}

fn square<const N: usize>(rows: &[Vec<f64>]) -> Result<[[f64; N]; N], HarnessError> {
    let shape_error = || HarnessError::MatrixShape {
        rows: rows.len(),
        columns: rows.iter().map(Vec::len).max().unwrap_or(0),
    };
    if rows.len() != N {
        return Err(shape_error());
    }
    let mut out = [[0.0; N]; N];
    for (dst, src) in out.iter_mut().zip(rows) {
        *dst = <[f64; N]>::try_from(src.as_slice()).map_err(|_| shape_error())?;
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeTablesSpec {
    pub small: Vec<usize>,
    pub medium: Vec<usize>,
    pub big: Vec<usize>,
    /// Replaces the concatenated table when given; `[]` disables it.
    #[serde(default)]
    pub combined: Option<Vec<usize>>,
}

impl SizeTablesSpec {
    #[must_use]
    pub fn to_tables(&self) -> SizeTables {
        let mut tables = SizeTables::new(self.small.clone(), self.medium.clone(), self.big.clone());
        if let Some(combined) = &self.combined {
            tables.combined = combined.clone();
        }
        tables
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinearSpec {
    pub seed: Option<u64>,
    pub ops: Option<u64>,
    pub slots: Option<usize>,
    pub budget_bytes: Option<usize>,
    pub matrix: Option<MatrixSpec>,
    pub uniform_batch_threshold: Option<f64>,
    pub size_tables: Option<SizeTablesSpec>,
    pub stride_primes: Option<Vec<usize>>,
    pub alloc_batch_sizes: Option<Vec<usize>>,
    pub free_batch_sizes: Option<Vec<usize>>,
    pub trace: Option<bool>,
}

impl LinearSpec {
    /// Fields set in `top` win over fields set in `self`.
    #[must_use]
    pub fn overlay(self, top: Self) -> Self {
        Self {
            seed: top.seed.or(self.seed),
            ops: top.ops.or(self.ops),
            slots: top.slots.or(self.slots),
            budget_bytes: top.budget_bytes.or(self.budget_bytes),
            matrix: top.matrix.or(self.matrix),
            uniform_batch_threshold: top.uniform_batch_threshold.or(self.uniform_batch_threshold),
            size_tables: top.size_tables.or(self.size_tables),
            stride_primes: top.stride_primes.or(self.stride_primes),
            alloc_batch_sizes: top.alloc_batch_sizes.or(self.alloc_batch_sizes),
            free_batch_sizes: top.free_batch_sizes.or(self.free_batch_sizes),
            trace: top.trace.or(self.trace),
        }
    }

    /// Build a worker configuration. Unset slots follow `ops`.
    pub fn to_config(&self) -> Result<WorkerConfig, HarnessError> {
        let mut config = WorkerConfig::with_ops(self.ops.unwrap_or(DEFAULT_TOTAL_OPS));
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(slots) = self.slots {
            config.slots = slots;
        }
        if let Some(budget) = self.budget_bytes {
            config.memory_budget = budget;
        }
        if let Some(matrix) = &self.matrix {
            config.matrix = matrix.linear_rows()?;
        }
        if let Some(threshold) = self.uniform_batch_threshold {
            config.uniform_batch_threshold = threshold;
        }
        if let Some(tables) = &self.size_tables {
            config.size_tables = tables.to_tables();
        }
        if let Some(primes) = &self.stride_primes {
            config.stride_primes = primes.clone();
        }
        if let Some(sizes) = &self.alloc_batch_sizes {
            config.alloc_batch_sizes = sizes.clone();
        }
        if let Some(sizes) = &self.free_batch_sizes {
            config.free_batch_sizes = sizes.clone();
        }
        config.record_trace = self.trace.unwrap_or(false);
        Ok(config)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GraphSpec {
    pub seed: Option<u64>,
    pub ops: Option<u64>,
    pub slots: Option<usize>,
    pub clusters: Option<usize>,
    pub graph_density: Option<f64>,
    pub vertex_density: Option<f64>,
    pub matrix: Option<MatrixSpec>,
    pub trace: Option<bool>,
}

impl GraphSpec {
    /// Fields set in `top` win over fields set in `self`.
    #[must_use]
    pub fn overlay(self, top: Self) -> Self {
        Self {
            seed: top.seed.or(self.seed),
            ops: top.ops.or(self.ops),
            slots: top.slots.or(self.slots),
            clusters: top.clusters.or(self.clusters),
            graph_density: top.graph_density.or(self.graph_density),
            vertex_density: top.vertex_density.or(self.vertex_density),
            matrix: top.matrix.or(self.matrix),
            trace: top.trace.or(self.trace),
        }
    }

    pub fn to_config(&self) -> Result<GraphConfig, HarnessError> {
        let mut config = GraphConfig::with_ops(self.ops.unwrap_or(DEFAULT_TOTAL_OPS));
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(slots) = self.slots {
            config.slots = slots;
        }
        if let Some(clusters) = self.clusters {
            config.clusters = clusters;
        }
        if let Some(density) = self.graph_density {
            config.graph_density = density;
        }
        if let Some(density) = self.vertex_density {
            config.vertex_density_factor = density;
        }
        if let Some(matrix) = &self.matrix {
            config.matrix = matrix.graph_rows()?;
        }
        config.record_trace = self.trace.unwrap_or(false);
        Ok(config)
    }
}

/// Matrix file accepted by `check-matrix`: bare rows, a preset name, or
/// an object with a `matrix` key holding either.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum MatrixFile {
    Bare(MatrixSpec),
    Wrapped { matrix: MatrixSpec },
}

/// Result of a successful matrix check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatrixCheck {
    pub workload: &'static str,
    pub states: usize,
}

impl MatrixCheck {
    pub const LINEAR: Self = Self {
        workload: "linear",
        states: 4,
    };
    pub const GRAPH: Self = Self {
        workload: "graph",
        states: 7,
    };
}

/// Validate a transition matrix. Four rows check as a linear matrix,
/// seven as a graph matrix; a preset name checks that preset.
pub fn check_matrix(spec: &MatrixSpec) -> Result<MatrixCheck, HarnessError> {
    match spec {
        MatrixSpec::Preset(name) => {
            if let Some(preset) = LinearPreset::from_str_loose(name) {
                TransitionMatrix::new(preset.matrix(), "linear")?;
                Ok(MatrixCheck::LINEAR)
            } else if let Some(preset) = GraphPreset::from_str_loose(name) {
                TransitionMatrix::new(preset.matrix(), "graph")?;
                Ok(MatrixCheck::GRAPH)
            } else {
                Err(HarnessError::UnknownPreset {
                    workload: "linear or graph",
                    name: name.clone(),
                })
            }
        }
        MatrixSpec::Rows(rows) => match rows.len() {
            4 => {
                TransitionMatrix::new(square::<4>(rows)?, "linear")?;
                Ok(MatrixCheck::LINEAR)
            }
            7 => {
                TransitionMatrix::new(square::<7>(rows)?, "graph")?;
                Ok(MatrixCheck::GRAPH)
            }
            _ => Err(HarnessError::MatrixShape {
                rows: rows.len(),
                columns: rows.iter().map(Vec::len).max().unwrap_or(0),
            }),
        },
    }
}

pub fn check_matrix_file(path: &Path) -> Result<MatrixCheck, HarnessError> {
    let file: MatrixFile = serde_json::from_str(&read_file(path)?)?;
    let spec = match file {
        MatrixFile::Bare(matrix) | MatrixFile::Wrapped { matrix } => matrix,
    };
    check_matrix(&spec)
}
