//! Linear allocation workload.
//!
//! A [`Worker`] owns a fixed slot table of live blocks and walks a
//! four-state Markov chain over single and batched allocations and frees.
//! Allocation and free each have their own coprime-stride cursor over the
//! slot table, so a slot is revisited by the same cursor only after every
//! other slot has been.
//!
//! The memory budget is a soft cap checked on allocation only. An
//! allocation that would leave the allocated-bytes total above the budget
//! is skipped; nothing is freed pre-emptively to make room.

use crate::boundary::AllocatorBoundary;
use crate::config::WorkerConfig;
use crate::error::ConfigError;
use crate::markov::{MarkovChain, MarkovState, TransitionMatrix};
use crate::rng::{RngStream, StreamId};
use crate::scatter::{BatchSizer, ScatterCursor};
use crate::size_model::SizeModel;
use crate::trace::{SkipReason, StepOutcome, TraceEvent, TraceJournal};

/// Linear workload operations, in matrix row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AllocSingle,
    AllocMany,
    DeallocSingle,
    DeallocMany,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AllocSingle => "alloc_single",
            Self::AllocMany => "alloc_many",
            Self::DeallocSingle => "dealloc_single",
            Self::DeallocMany => "dealloc_many",
        }
    }
}

impl MarkovState<4> for Operation {
    const WORKLOAD: &'static str = "linear";
    const ALL: [Self; 4] = [
        Self::AllocSingle,
        Self::AllocMany,
        Self::DeallocSingle,
        Self::DeallocMany,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Counters exposed to the measurement harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinearReport {
    /// Markov steps taken, including unmatched draws.
    pub steps: u64,
    /// Successful allocations.
    pub allocs: u64,
    /// Frees during the run, including slot evictions by ALLOC_SINGLE.
    pub deallocs: u64,
    /// High-water mark of concurrently live blocks.
    pub peak_live: usize,
    /// Blocks still live at the end of the run, freed by teardown.
    pub teardown_frees: u64,
    /// High-water mark of the allocated-bytes total.
    pub bytes_high_water: usize,
    pub skipped_budget: u64,
    pub skipped_zero_size: u64,
    pub alloc_failures: u64,
    pub invalid_transitions: u64,
    /// Blocks whose size tag read back differently from what was written.
    pub tag_mismatches: u64,
}

#[derive(Debug)]
struct LiveBlock<H> {
    handle: H,
    size: usize,
}

/// Linear workload driver over one allocator boundary.
pub struct Worker<A: AllocatorBoundary> {
    allocator: A,
    chain: MarkovChain<Operation, 4>,
    sizes: RngStream,
    size_model: SizeModel,
    slots: Vec<Option<LiveBlock<A::Handle>>>,
    alloc_cursor: ScatterCursor,
    free_cursor: ScatterCursor,
    alloc_batches: BatchSizer,
    free_batches: BatchSizer,
    total_ops: u64,
    memory_budget: usize,
    uniform_batch_threshold: f64,
    allocated: usize,
    live: usize,
    report: LinearReport,
    journal: Option<TraceJournal>,
    torn_down: bool,
}

impl<A: AllocatorBoundary> Worker<A> {
    /// Validate `config`, then initialize `allocator`.
    ///
    /// On error the allocator has not been called at all.
    pub fn new(config: WorkerConfig, mut allocator: A) -> Result<Self, ConfigError> {
        let matrix = TransitionMatrix::new(config.matrix, Operation::WORKLOAD)?;
        let size_model = SizeModel::new(config.size_tables)?;
        if config.slots == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        let (alloc_cursor, free_cursor) = ScatterCursor::pair(config.slots, &config.stride_primes)?;
        let (alloc_batches, free_batches) = BatchSizer::pair(
            config.alloc_batch_sizes,
            config.free_batch_sizes,
            &config.stride_primes,
        )?;
        let threshold = config.uniform_batch_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidProbability {
                name: "uniform_batch_threshold",
                value: threshold,
            });
        }

        allocator.initialize();
        Ok(Self {
            allocator,
            chain: MarkovChain::new(
                Operation::AllocSingle,
                matrix,
                RngStream::derive(config.seed, StreamId::Transitions),
            ),
            sizes: RngStream::derive(config.seed, StreamId::Sizes),
            size_model,
            slots: (0..config.slots).map(|_| None).collect(),
            alloc_cursor,
            free_cursor,
            alloc_batches,
            free_batches,
            total_ops: config.total_ops,
            memory_budget: config.memory_budget,
            uniform_batch_threshold: threshold,
            allocated: 0,
            live: 0,
            report: LinearReport::default(),
            journal: config.record_trace.then(TraceJournal::new),
            torn_down: false,
        })
    }

    /// Take one Markov step and execute the selected operation.
    ///
    /// Returns `None` when the transition draw matched no column; the step
    /// still counts toward the budget.
    pub fn step(&mut self) -> Option<Operation> {
        let step = self.report.steps;
        self.report.steps += 1;
        let Some(op) = self.chain.advance() else {
            self.report.invalid_transitions += 1;
            self.record(
                step,
                "invalid",
                None,
                None,
                StepOutcome::Skipped(SkipReason::UnmatchedTransition),
            );
            return None;
        };
        match op {
            Operation::AllocSingle => {
                let size = self.size_model.size_for(None, &mut self.sizes);
                self.alloc_single(step, op, size);
            }
            Operation::AllocMany => {
                let count = self.alloc_batches.next_batch();
                let uniform = self.sizes.next_unit() <= self.uniform_batch_threshold;
                if uniform {
                    let size = self.size_model.size_for(None, &mut self.sizes);
                    for _ in 0..count {
                        self.alloc_single(step, op, size);
                    }
                } else {
                    for _ in 0..count {
                        let size = self.size_model.size_for(None, &mut self.sizes);
                        self.alloc_single(step, op, size);
                    }
                }
            }
            Operation::DeallocSingle => {
                self.dealloc_single(step, op);
            }
            Operation::DeallocMany => {
                let count = self.free_batches.next_batch();
                for _ in 0..count {
                    self.dealloc_single(step, op);
                }
            }
        }
        Some(op)
    }

    /// Take up to `n` steps without passing the operation budget.
    pub fn run_steps(&mut self, n: u64) {
        let remaining = self.total_ops.saturating_sub(self.report.steps);
        for _ in 0..n.min(remaining) {
            self.step();
        }
    }

    /// Run the remaining budget, tear down, and return the final counters.
    pub fn run(&mut self) -> LinearReport {
        self.run_steps(u64::MAX);
        self.teardown();
        self.report
    }

    /// Free every live slot and finalize the allocator. Runs once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for index in 0..self.slots.len() {
            if let Some(block) = self.slots[index].take() {
                self.release(block);
                self.report.teardown_frees += 1;
            }
        }
        self.allocator.finalize();
    }

    fn alloc_single(&mut self, step: u64, op: Operation, size: usize) -> StepOutcome {
        let index = self.alloc_cursor.current();
        let outcome = self.try_alloc_at(index, size);
        match outcome {
            StepOutcome::Applied => {}
            StepOutcome::Skipped(SkipReason::BudgetExhausted) => self.report.skipped_budget += 1,
            StepOutcome::Skipped(SkipReason::ZeroSize) => self.report.skipped_zero_size += 1,
            StepOutcome::Skipped(SkipReason::AllocationFailed) => self.report.alloc_failures += 1,
            StepOutcome::Skipped(_) => {}
        }
        self.record(step, op.as_str(), Some(index), Some(size), outcome);
        outcome
    }

    fn try_alloc_at(&mut self, index: usize, size: usize) -> StepOutcome {
        if size == 0 {
            return StepOutcome::Skipped(SkipReason::ZeroSize);
        }
        if self.allocated >= self.memory_budget {
            return StepOutcome::Skipped(SkipReason::BudgetExhausted);
        }
        let occupant = self.slots[index].as_ref().map_or(0, |b| b.size);
        let projected = (self.allocated - occupant).checked_add(size);
        if projected.is_none_or(|total| total > self.memory_budget) {
            return StepOutcome::Skipped(SkipReason::BudgetExhausted);
        }

        if let Some(old) = self.slots[index].take() {
            self.release(old);
            self.report.deallocs += 1;
        }
        let Some(handle) = self.allocator.allocate(size) else {
            return StepOutcome::Skipped(SkipReason::AllocationFailed);
        };
        self.allocator.write_tag(&handle, size, size as u64);
        self.slots[index] = Some(LiveBlock { handle, size });
        self.alloc_cursor.advance();

        self.allocated += size;
        self.live += 1;
        self.report.allocs += 1;
        self.report.peak_live = self.report.peak_live.max(self.live);
        self.report.bytes_high_water = self.report.bytes_high_water.max(self.allocated);
        StepOutcome::Applied
    }

    fn dealloc_single(&mut self, step: u64, op: Operation) -> StepOutcome {
        let index = self.free_cursor.current();
        let (outcome, size) = match self.slots[index].take() {
            Some(block) => {
                let size = block.size;
                self.release(block);
                self.report.deallocs += 1;
                (StepOutcome::Applied, Some(size))
            }
            None => (StepOutcome::Skipped(SkipReason::EmptySlot), None),
        };
        self.free_cursor.advance();
        self.record(step, op.as_str(), Some(index), size, outcome);
        outcome
    }

    /// Self-check the tag, then return the block to the allocator.
    fn release(&mut self, block: LiveBlock<A::Handle>) {
        if self.allocator.read_tag(&block.handle, block.size) != block.size as u64 {
            self.report.tag_mismatches += 1;
        }
        self.allocated -= block.size;
        self.live -= 1;
        self.allocator.deallocate(block.handle);
    }

    fn record(
        &mut self,
        step: u64,
        operation: &'static str,
        slot: Option<usize>,
        size: Option<usize>,
        outcome: StepOutcome,
    ) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(TraceEvent {
                step,
                operation,
                slot,
                size,
                outcome,
            });
        }
    }

    #[must_use]
    pub fn report(&self) -> LinearReport {
        self.report
    }

    #[must_use]
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Current allocated-bytes total.
    #[must_use]
    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    #[must_use]
    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    /// Number of slots currently holding a live block.
    #[must_use]
    pub fn live_slots(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn current_operation(&self) -> Operation {
        self.chain.current()
    }

    #[must_use]
    pub fn journal(&self) -> Option<&TraceJournal> {
        self.journal.as_ref()
    }

    pub fn take_journal(&mut self) -> Option<TraceJournal> {
        self.journal.take()
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl<A: AllocatorBoundary> Drop for Worker<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
