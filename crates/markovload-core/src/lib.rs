//! Allocation traffic generators for allocator benchmarking.
//!
//! This crate provides:
//! - [`rng`]: seed-derived SplitMix64 streams, one per concern
//! - [`size_model`]: size-class selection over externally supplied tables
//! - [`scatter`]: full-period coprime-stride cursors over fixed tables
//! - [`markov`]: validated transition matrices and the operation chain
//! - [`worker`]: the linear alloc/dealloc workload
//! - [`graph`]: the object-graph workload for reference-counted collectors
//!
//! The generators never format or print anything. Counters come back as
//! plain report records and the optional [`trace::TraceJournal`].

pub mod boundary;
pub mod config;
pub mod error;
pub mod graph;
pub mod markov;
pub mod rng;
pub mod scatter;
pub mod size_model;
pub mod trace;
pub mod worker;

pub use boundary::{AllocatorBoundary, ManagedHeap, MAX_EDGES, Vertex, VecAllocator};
pub use config::{GraphConfig, GraphPreset, LinearPreset, WorkerConfig};
pub use error::ConfigError;
pub use graph::{GraphOperation, GraphReport, GraphWorker};
pub use markov::{MarkovChain, MarkovState, ROW_SUM_TOLERANCE, TransitionMatrix};
pub use rng::{RngStream, StreamId};
pub use scatter::{BatchSizer, ScatterCursor};
pub use size_model::{SizeClass, SizeModel, SizeTables};
pub use trace::{SkipReason, StepOutcome, TraceEvent, TraceJournal};
pub use worker::{LinearReport, Operation, Worker};
