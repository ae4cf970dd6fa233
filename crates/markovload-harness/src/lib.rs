//! Run driver for markovload workloads.
//!
//! This crate provides:
//! - [`spec`]: JSON run specs that override workload configuration
//! - [`runner`]: linear and graph runs over a chosen boundary
//! - [`structured_log`]: JSONL log entries, emitter and validator
//! - [`report`]: machine-readable run reports and artifact indexes
//!
//! The `markovload` binary is a thin clap layer over these modules.

#![forbid(unsafe_code)]

pub mod error;
pub mod report;
pub mod runner;
pub mod spec;
pub mod structured_log;

pub use error::HarnessError;
pub use report::{ArtifactIndex, RunReport};
pub use runner::{GraphRun, LinearRun, RunOptions};
pub use spec::{GraphSpec, LinearSpec, MatrixSpec, RunSpec};
