//! Transition matrices and the Markov operation chain.
//!
//! Matrices are validated once, at construction: every entry must be a
//! finite non-negative probability and every row must sum to 1 within
//! [`ROW_SUM_TOLERANCE`]. After that, [`MarkovChain::advance`] walks the
//! current row's cumulative sum against one unit draw.

use std::fmt::Debug;

use crate::error::ConfigError;
use crate::rng::RngStream;

/// Allowed deviation of a row sum from 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 1e-5;

/// A finite operation alphabet usable as Markov states.
pub trait MarkovState<const N: usize>: Copy + Eq + Debug {
    /// Workload name used in error messages.
    const WORKLOAD: &'static str;
    /// All states, in row/column order.
    const ALL: [Self; N];

    /// Row/column index of this state.
    fn index(self) -> usize;
}

/// Row-stochastic N x N matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionMatrix<const N: usize> {
    rows: [[f64; N]; N],
}

impl<const N: usize> TransitionMatrix<N> {
    /// Validate `rows` for the workload named `workload`.
    pub fn new(rows: [[f64; N]; N], workload: &'static str) -> Result<Self, ConfigError> {
        for (row_idx, row) in rows.iter().enumerate() {
            for (column, &value) in row.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::NegativeTransition {
                        workload,
                        row: row_idx,
                        column,
                        value,
                    });
                }
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ConfigError::InvalidTransitionRow {
                    workload,
                    row: row_idx,
                    sum,
                });
            }
        }
        Ok(Self { rows })
    }

    #[must_use]
    pub fn row(&self, index: usize) -> &[f64; N] {
        &self.rows[index]
    }

    #[must_use]
    pub fn rows(&self) -> &[[f64; N]; N] {
        &self.rows
    }
}

/// Current state, its matrix, and the "transitions" stream.
#[derive(Debug, Clone)]
pub struct MarkovChain<S: MarkovState<N>, const N: usize> {
    current: S,
    matrix: TransitionMatrix<N>,
    rng: RngStream,
}

impl<S: MarkovState<N>, const N: usize> MarkovChain<S, N> {
    #[must_use]
    pub fn new(initial: S, matrix: TransitionMatrix<N>, rng: RngStream) -> Self {
        Self {
            current: initial,
            matrix,
            rng,
        }
    }

    #[must_use]
    pub fn current(&self) -> S {
        self.current
    }

    /// Move to the next state.
    ///
    /// A draw at or above the row's cumulative sum (a row accepted inside
    /// the tolerance band but summing to less than 1) lands on the row's
    /// last positive column. Returns `None` only for a row with no positive
    /// entry, which validation never admits; the current state is left
    /// unchanged and callers treat the step as a no-op.
    pub fn advance(&mut self) -> Option<S> {
        let r = self.rng.next_unit();
        let row = self.matrix.row(self.current.index());
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (column, &p) in row.iter().enumerate() {
            if p > 0.0 {
                last_positive = Some(column);
            }
            cumulative += p;
            if r < cumulative {
                self.current = S::ALL[column];
                return Some(self.current);
            }
        }
        let column = last_positive?;
        self.current = S::ALL[column];
        Some(self.current)
    }
}
