//! Concrete boundaries for the markovload workloads.
//!
//! - [`SystemAllocator`], [`LibcAllocator`] and [`CountingAllocator`] sit
//!   behind [`markovload_core::AllocatorBoundary`] and touch real memory.
//! - [`GcHeap`] sits behind [`markovload_core::ManagedHeap`]: reference
//!   counting with release-on-zero plus a mark/sweep pass for cycles.
//! - [`peak_rss_bytes`] reports the process high-water mark.

pub mod counting;
pub mod gc;
pub mod kind;
pub mod libc_alloc;
pub mod raw;
pub mod rusage;
pub mod system;

pub use counting::{CallCounts, CountingAllocator};
pub use gc::{GcHeap, GcRef, GcStats, HeapLogLevel, HeapLogRecord};
pub use kind::{ALLOCATOR_ENV, AllocatorKind};
pub use libc_alloc::{LibcAllocator, LibcBlock};
pub use rusage::peak_rss_bytes;
pub use system::{SystemAllocator, SystemBlock};
