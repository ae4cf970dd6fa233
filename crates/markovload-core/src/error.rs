//! Fatal configuration errors.
//!
//! Everything here is detected by a constructor before the allocator or
//! collector boundary is touched. Runtime misses (budget exhausted, empty
//! slot, full vertex) are soft outcomes, see [`crate::trace::SkipReason`].

use thiserror::Error;

use crate::size_model::SizeClass;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{workload} transition matrix row {row} sums to {sum}, expected 1.0")]
    InvalidTransitionRow {
        workload: &'static str,
        row: usize,
        sum: f64,
    },
    #[error("{workload} transition matrix entry [{row}][{column}] is {value}, expected a finite non-negative probability")]
    NegativeTransition {
        workload: &'static str,
        row: usize,
        column: usize,
        value: f64,
    },
    #[error("size table for {class:?} is empty")]
    EmptySizeTable { class: SizeClass },
    #[error("{which} batch-size table is empty")]
    EmptyBatchTable { which: &'static str },
    #[error("slot table must hold at least one slot")]
    ZeroSlots,
    #[error("no candidate stride is coprime with table length {len}")]
    NoCoprimeStride { len: usize },
    #[error("{name} must lie in [0, 1], got {value}")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("graph workload needs at least one cluster")]
    ZeroClusters,
    #[error("{slots} slots cannot be split into {clusters} non-empty clusters")]
    ClusterTooSmall { slots: usize, clusters: usize },
}
