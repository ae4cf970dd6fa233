//! Object-graph workload for reference-counted, collected heaps.
//!
//! A [`GraphWorker`] keeps a fixed slot table of root references. Setup
//! splits the table into clusters and fills each with a random sparse
//! graph whose edges stay inside the cluster. The run then walks a
//! seven-state Markov chain over vertex, edge, payload and collector
//! operations.
//!
//! Dropping a root does not necessarily free the vertex: other vertices
//! may still point at it, and cycles only go away when the collector runs.

use crate::boundary::{MAX_EDGES, ManagedHeap, Vertex};
use crate::config::GraphConfig;
use crate::error::ConfigError;
use crate::markov::{MarkovChain, MarkovState, TransitionMatrix};
use crate::rng::{RngStream, StreamId};
use crate::trace::{SkipReason, StepOutcome, TraceEvent, TraceJournal};

/// Upper bound (inclusive) of values written by WRITE_DATA.
pub const PAYLOAD_WRITE_MAX: u64 = 0xDEAD_BEEF;

/// Graph workload operations, in matrix row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphOperation {
    CreateVertex,
    RemoveVertex,
    CreateEdge,
    RemoveEdge,
    WriteData,
    ReadData,
    CollectGarbage,
}

impl GraphOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateVertex => "create_vertex",
            Self::RemoveVertex => "remove_vertex",
            Self::CreateEdge => "create_edge",
            Self::RemoveEdge => "remove_edge",
            Self::WriteData => "write_data",
            Self::ReadData => "read_data",
            Self::CollectGarbage => "collect_garbage",
        }
    }
}

impl MarkovState<7> for GraphOperation {
    const WORKLOAD: &'static str = "graph";
    const ALL: [Self; 7] = [
        Self::CreateVertex,
        Self::RemoveVertex,
        Self::CreateEdge,
        Self::RemoveEdge,
        Self::WriteData,
        Self::ReadData,
        Self::CollectGarbage,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Counters exposed to the measurement harness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphReport {
    /// Markov steps taken, including unmatched draws.
    pub steps: u64,
    pub gc_invocations: u64,
    /// Heap-reported live objects at the end of the run loop.
    pub live_objects: usize,
    /// Vertices built by setup.
    pub setup_vertices: u64,
    /// Edges built by setup.
    pub setup_edges: u64,
    pub vertices_created: u64,
    pub vertices_removed: u64,
    pub edges_created: u64,
    pub edges_removed: u64,
    pub writes: u64,
    pub reads: u64,
    /// Operations that found nothing to act on.
    pub skipped: u64,
    pub invalid_transitions: u64,
    /// Objects reclaimed by collector calls during the run.
    pub collected: u64,
    /// Heap-reported live objects after every root was dropped and a
    /// final collection ran. Anything non-zero is a leak.
    pub live_after_teardown: usize,
}

/// Graph workload driver over one managed heap.
pub struct GraphWorker<H: ManagedHeap> {
    heap: H,
    chain: MarkovChain<GraphOperation, 7>,
    slots_rng: RngStream,
    graph_rng: RngStream,
    slots: Vec<Option<H::Ref>>,
    total_ops: u64,
    report: GraphReport,
    journal: Option<TraceJournal>,
    torn_down: bool,
}

impl<H: ManagedHeap> GraphWorker<H> {
    /// Validate `config`, initialize `heap`, and build the initial graph.
    ///
    /// On error the heap has not been called at all.
    pub fn new(config: GraphConfig, mut heap: H) -> Result<Self, ConfigError> {
        let matrix = TransitionMatrix::new(config.matrix, GraphOperation::WORKLOAD)?;
        if config.slots == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        if config.clusters == 0 {
            return Err(ConfigError::ZeroClusters);
        }
        if config.slots < config.clusters {
            return Err(ConfigError::ClusterTooSmall {
                slots: config.slots,
                clusters: config.clusters,
            });
        }
        for (name, value) in [
            ("graph_density", config.graph_density),
            ("vertex_density_factor", config.vertex_density_factor),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }

        heap.initialize();
        let mut worker = Self {
            heap,
            chain: MarkovChain::new(
                GraphOperation::CreateVertex,
                matrix,
                RngStream::derive(config.seed, StreamId::Transitions),
            ),
            slots_rng: RngStream::derive(config.seed, StreamId::Slots),
            graph_rng: RngStream::derive(config.seed, StreamId::Graph),
            slots: vec![None; config.slots],
            total_ops: config.total_ops,
            report: GraphReport::default(),
            journal: config.record_trace.then(TraceJournal::new),
            torn_down: false,
        };
        worker.build_graph(
            config.clusters,
            config.graph_density,
            config.vertex_density_factor,
        );
        Ok(worker)
    }

    fn build_graph(&mut self, clusters: usize, graph_density: f64, vertex_density_factor: f64) {
        let per_cluster = self.slots.len() / clusters;
        for cluster in 0..clusters {
            let start = per_cluster * cluster;
            let end = start + per_cluster;
            for index in start..end {
                if self.graph_rng.next_unit() <= graph_density {
                    continue;
                }
                let source = self.vertex_or_create(index);
                for edge in 0..MAX_EDGES {
                    if self.graph_rng.next_unit() <= vertex_density_factor {
                        continue;
                    }
                    let other = start + self.graph_rng.next_index(per_cluster);
                    let target = self.vertex_or_create(other);
                    if self.heap.link_at(source, edge, target) {
                        self.report.setup_edges += 1;
                    }
                }
            }
        }
    }

    fn vertex_or_create(&mut self, index: usize) -> H::Ref {
        if let Some(r) = self.slots[index] {
            return r;
        }
        let r = self.heap.make_shared(Vertex::new());
        self.slots[index] = Some(r);
        self.report.setup_vertices += 1;
        r
    }

    /// Take one Markov step and execute the selected operation.
    pub fn step(&mut self) -> Option<GraphOperation> {
        let step = self.report.steps;
        self.report.steps += 1;
        let Some(op) = self.chain.advance() else {
            self.report.invalid_transitions += 1;
            self.record(
                step,
                "invalid",
                None,
                StepOutcome::Skipped(SkipReason::UnmatchedTransition),
            );
            return None;
        };
        let (slot, outcome) = self.execute(op, None);
        self.record(step, op.as_str(), slot, outcome);
        Some(op)
    }

    /// Execute `op` once outside the Markov chain, with random slot picks.
    pub fn apply(&mut self, op: GraphOperation) -> StepOutcome {
        self.execute(op, None).1
    }

    /// Execute `op` once with `slot` standing in for the random slot pick.
    ///
    /// CREATE_EDGE uses `slot` for both ends.
    pub fn apply_at(&mut self, op: GraphOperation, slot: usize) -> StepOutcome {
        self.execute(op, Some(slot)).1
    }

    /// Add an edge from the vertex rooted at `source` to the one rooted at
    /// `target`.
    pub fn link_slots(&mut self, source: usize, target: usize) -> StepOutcome {
        let outcome = match (self.slots[source], self.slots[target]) {
            (Some(src), Some(tgt)) => self.link(src, tgt),
            _ => StepOutcome::Skipped(SkipReason::EmptySlot),
        };
        if !outcome.is_applied() {
            self.report.skipped += 1;
        }
        outcome
    }

    fn execute(
        &mut self,
        op: GraphOperation,
        fixed: Option<usize>,
    ) -> (Option<usize>, StepOutcome) {
        let (slot, outcome) = match op {
            GraphOperation::CreateVertex => {
                let index = self.pick_index(fixed);
                let outcome = if self.slots[index].is_some() {
                    StepOutcome::Skipped(SkipReason::OccupiedSlot)
                } else {
                    self.slots[index] = Some(self.heap.make_shared(Vertex::new()));
                    self.report.vertices_created += 1;
                    StepOutcome::Applied
                };
                (Some(index), outcome)
            }
            GraphOperation::RemoveVertex => {
                let index = self.pick_index(fixed);
                let outcome = match self.slots[index].take() {
                    Some(r) => {
                        self.heap.release_root(r);
                        self.report.vertices_removed += 1;
                        StepOutcome::Applied
                    }
                    None => StepOutcome::Skipped(SkipReason::EmptySlot),
                };
                (Some(index), outcome)
            }
            GraphOperation::CreateEdge => {
                let target = self.pick_live(fixed);
                let source = self.pick_live(fixed);
                match (source, target) {
                    (Some((index, src)), Some((_, tgt))) => (Some(index), self.link(src, tgt)),
                    _ => (None, StepOutcome::Skipped(SkipReason::NoLiveVertex)),
                }
            }
            GraphOperation::RemoveEdge => match self.pick_live(fixed) {
                Some((index, r)) => {
                    let outcome = if self.heap.unlink_first(r) {
                        self.report.edges_removed += 1;
                        StepOutcome::Applied
                    } else {
                        StepOutcome::Skipped(SkipReason::NoEdge)
                    };
                    (Some(index), outcome)
                }
                None => (None, StepOutcome::Skipped(SkipReason::NoLiveVertex)),
            },
            GraphOperation::WriteData => match self.pick_live(fixed) {
                Some((index, r)) => {
                    let value = self.graph_rng.next_in_range(0, PAYLOAD_WRITE_MAX);
                    let outcome = if self.heap.write_payload(r, value) {
                        self.report.writes += 1;
                        StepOutcome::Applied
                    } else {
                        StepOutcome::Skipped(SkipReason::NoLiveVertex)
                    };
                    (Some(index), outcome)
                }
                None => (None, StepOutcome::Skipped(SkipReason::NoLiveVertex)),
            },
            GraphOperation::ReadData => match self.pick_live(fixed) {
                Some((index, r)) => {
                    let outcome = match self.heap.read_payload(r) {
                        Some(value) => {
                            std::hint::black_box(value);
                            self.report.reads += 1;
                            StepOutcome::Applied
                        }
                        None => StepOutcome::Skipped(SkipReason::NoLiveVertex),
                    };
                    (Some(index), outcome)
                }
                None => (None, StepOutcome::Skipped(SkipReason::NoLiveVertex)),
            },
            GraphOperation::CollectGarbage => {
                self.report.collected += self.heap.collect_garbage() as u64;
                self.report.gc_invocations += 1;
                (None, StepOutcome::Applied)
            }
        };
        if !outcome.is_applied() {
            self.report.skipped += 1;
        }
        (slot, outcome)
    }

    fn link(&mut self, source: H::Ref, target: H::Ref) -> StepOutcome {
        if self.heap.link(source, target) {
            self.report.edges_created += 1;
            StepOutcome::Applied
        } else {
            StepOutcome::Skipped(SkipReason::NoVacantEdge)
        }
    }

    fn pick_index(&mut self, fixed: Option<usize>) -> usize {
        match fixed {
            Some(index) => index % self.slots.len(),
            None => self.slots_rng.next_index(self.slots.len()),
        }
    }

    /// Pick a slot; if it is empty, scan forward (wrapping) for the first
    /// occupied one.
    fn pick_live(&mut self, fixed: Option<usize>) -> Option<(usize, H::Ref)> {
        let start = self.pick_index(fixed);
        let n = self.slots.len();
        (0..n)
            .map(|offset| (start + offset) % n)
            .find_map(|index| self.slots[index].map(|r| (index, r)))
    }

    /// Take up to `n` steps without passing the operation budget.
    pub fn run_steps(&mut self, n: u64) {
        let remaining = self.total_ops.saturating_sub(self.report.steps);
        for _ in 0..n.min(remaining) {
            self.step();
        }
    }

    /// Run the remaining budget, tear down, and return the final counters.
    pub fn run(&mut self) -> GraphReport {
        self.run_steps(u64::MAX);
        self.report.live_objects = self.heap.live_objects();
        self.teardown();
        self.report
    }

    /// Drop every root, collect once, and finalize the heap. Runs once.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for slot in &mut self.slots {
            if let Some(r) = slot.take() {
                self.heap.release_root(r);
            }
        }
        self.heap.collect_garbage();
        self.report.live_after_teardown = self.heap.live_objects();
        self.heap.finalize();
    }

    fn record(
        &mut self,
        step: u64,
        operation: &'static str,
        slot: Option<usize>,
        outcome: StepOutcome,
    ) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(TraceEvent {
                step,
                operation,
                slot,
                size: None,
                outcome,
            });
        }
    }

    #[must_use]
    pub fn report(&self) -> GraphReport {
        self.report
    }

    #[must_use]
    pub fn heap(&self) -> &H {
        &self.heap
    }

    /// Root reference held by `slot`, if any.
    #[must_use]
    pub fn root_at(&self, slot: usize) -> Option<H::Ref> {
        self.slots.get(slot).copied().flatten()
    }

    /// Vertex rooted at `slot`, if any.
    #[must_use]
    pub fn vertex_at(&self, slot: usize) -> Option<&Vertex<H::Ref>> {
        self.root_at(slot).and_then(|r| self.heap.vertex(r))
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn rooted_slots(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    #[must_use]
    pub fn current_operation(&self) -> GraphOperation {
        self.chain.current()
    }

    #[must_use]
    pub fn journal(&self) -> Option<&TraceJournal> {
        self.journal.as_ref()
    }

    pub fn take_journal(&mut self) -> Option<TraceJournal> {
        self.journal.take()
    }
}

impl<H: ManagedHeap> Drop for GraphWorker<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}
