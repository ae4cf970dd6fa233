//! Reference-counted object heap with a tracing cycle collector.
//!
//! Objects live in a generational arena. Each object counts its roots
//! (references held by the workload's slot table) and its incoming edges.
//! When both reach zero the object is released at once, and the release
//! cascades through its outgoing edges. Cycles keep each other's edge
//! counts above zero, so [`GcHeap::collect`] marks everything reachable
//! from a rooted object and sweeps the rest.
//!
//! A reference whose generation no longer matches its arena entry is
//! stale. Stale references are ignored and counted, never dereferenced.

use std::collections::VecDeque;

use markovload_core::boundary::{MAX_EDGES, ManagedHeap, Vertex};

/// Handle into a [`GcHeap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GcRef {
    index: u32,
    generation: u32,
}

impl GcRef {
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

/// Heap lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
}

/// Structured heap lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapLogRecord {
    /// Monotonic decision/event id.
    pub decision_id: u64,
    /// Correlation id for this lifecycle record.
    pub trace_id: String,
    pub level: HeapLogLevel,
    /// Event kind (`make_shared`, `release_on_zero`, `collect`, ...).
    pub event: &'static str,
    /// Object involved in the event.
    pub object: Option<GcRef>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form details for debugging.
    pub details: String,
    /// Snapshot: live objects after the event.
    pub live_objects: usize,
    /// Snapshot: collector passes so far.
    pub collections: u64,
}

/// Running heap statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub created: u64,
    /// Objects freed because their last root and last edge went away.
    pub released_on_zero: u64,
    /// Objects freed by the tracing collector.
    pub swept: u64,
    pub collections: u64,
    pub stale_accesses: u64,
    pub peak_live: usize,
}

#[derive(Debug)]
struct Object {
    vertex: Vertex<GcRef>,
    roots: u32,
    incoming: u32,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    object: Option<Object>,
}

/// Arena-backed managed heap.
#[derive(Debug, Default)]
pub struct GcHeap {
    entries: Vec<Entry>,
    free_list: Vec<u32>,
    live: usize,
    stats: GcStats,
    next_decision_id: u64,
    log_capacity: usize,
    lifecycle_logs: VecDeque<HeapLogRecord>,
}

impl GcHeap {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_decision_id: 1,
            ..Self::default()
        }
    }

    /// Heap that keeps the most recent `capacity` lifecycle records.
    #[must_use]
    pub fn with_lifecycle_log(capacity: usize) -> Self {
        Self {
            log_capacity: capacity,
            lifecycle_logs: VecDeque::with_capacity(capacity.min(4096)),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    pub fn lifecycle_logs(&self) -> impl Iterator<Item = &HeapLogRecord> {
        self.lifecycle_logs.iter()
    }

    pub fn drain_lifecycle_logs(&mut self) -> Vec<HeapLogRecord> {
        self.lifecycle_logs.drain(..).collect()
    }

    /// Roots and incoming-edge count of a live object.
    #[must_use]
    pub fn ref_counts(&self, r: GcRef) -> Option<(u32, u32)> {
        self.object(r).map(|o| (o.roots, o.incoming))
    }

    #[must_use]
    pub fn is_live(&self, r: GcRef) -> bool {
        self.object(r).is_some()
    }

    fn object(&self, r: GcRef) -> Option<&Object> {
        let entry = self.entries.get(r.index as usize)?;
        if entry.generation != r.generation {
            return None;
        }
        entry.object.as_ref()
    }

    fn object_mut(&mut self, r: GcRef) -> Option<&mut Object> {
        let entry = self.entries.get_mut(r.index as usize)?;
        if entry.generation != r.generation {
            return None;
        }
        entry.object.as_mut()
    }

    fn record_lifecycle(
        &mut self,
        level: HeapLogLevel,
        event: &'static str,
        object: Option<GcRef>,
        outcome: &'static str,
        details: impl Into<String>,
    ) {
        if self.log_capacity == 0 {
            return;
        }
        let decision_id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        if self.lifecycle_logs.len() == self.log_capacity {
            self.lifecycle_logs.pop_front();
        }
        self.lifecycle_logs.push_back(HeapLogRecord {
            decision_id,
            trace_id: format!("heap::gc::{event}::{decision_id:016x}"),
            level,
            event,
            object,
            outcome,
            details: details.into(),
            live_objects: self.live,
            collections: self.stats.collections,
        });
    }

    fn stale(&mut self, event: &'static str, r: GcRef) {
        self.stats.stale_accesses += 1;
        self.record_lifecycle(
            HeapLogLevel::Warn,
            event,
            Some(r),
            "stale_handle",
            format!("index={} generation={}", r.index, r.generation),
        );
    }

    /// Remove the object at `index` from the arena and bump its generation.
    fn free_entry(&mut self, index: u32) -> Option<Object> {
        let entry = self.entries.get_mut(index as usize)?;
        let object = entry.object.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free_list.push(index);
        self.live -= 1;
        Some(object)
    }

    /// Drop one incoming edge from each target, releasing any object whose
    /// counts reach zero and cascading through what it pointed at.
    fn release_edges(&mut self, targets: impl IntoIterator<Item = GcRef>) {
        let mut work: Vec<GcRef> = targets.into_iter().collect();
        while let Some(target) = work.pop() {
            let Some(object) = self.object_mut(target) else {
                continue;
            };
            object.incoming = object.incoming.saturating_sub(1);
            if object.roots == 0 && object.incoming == 0 {
                if let Some(mut freed) = self.free_entry(target.index) {
                    work.extend(freed.vertex.take_edges());
                    self.stats.released_on_zero += 1;
                    self.record_lifecycle(
                        HeapLogLevel::Trace,
                        "release_on_zero",
                        Some(target),
                        "freed",
                        "cause=edge",
                    );
                }
            }
        }
    }

    /// Mark from every rooted object, then free everything unmarked.
    pub fn collect(&mut self) -> usize {
        self.stats.collections += 1;
        let mut marked = vec![false; self.entries.len()];
        let mut stack: Vec<u32> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.object.as_ref().is_some_and(|o| o.roots > 0))
            .map(|(i, _)| i as u32)
            .collect();
        while let Some(index) = stack.pop() {
            let i = index as usize;
            if marked[i] {
                continue;
            }
            marked[i] = true;
            if let Some(object) = &self.entries[i].object {
                for edge in object.vertex.edges().iter().flatten() {
                    if self.object(*edge).is_some() && !marked[edge.index as usize] {
                        stack.push(edge.index);
                    }
                }
            }
        }

        let garbage: Vec<u32> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(i, e)| e.object.is_some() && !marked[*i])
            .map(|(i, _)| i as u32)
            .collect();
        // Edges from garbage into survivors must give back their counts;
        // edges between garbage objects vanish with them.
        let mut survivor_edges = Vec::new();
        for &index in &garbage {
            if let Some(mut object) = self.free_entry(index) {
                survivor_edges.extend(
                    object
                        .vertex
                        .take_edges()
                        .filter(|t| marked.get(t.index as usize).copied().unwrap_or(false)),
                );
            }
        }
        for target in survivor_edges {
            if let Some(object) = self.object_mut(target) {
                object.incoming = object.incoming.saturating_sub(1);
            }
        }

        let swept = garbage.len();
        self.stats.swept += swept as u64;
        self.record_lifecycle(
            HeapLogLevel::Debug,
            "collect",
            None,
            "swept",
            format!("swept={swept} arena_len={}", self.entries.len()),
        );
        swept
    }
}

impl ManagedHeap for GcHeap {
    type Ref = GcRef;

    fn name(&self) -> &'static str {
        "gc-heap"
    }

    fn initialize(&mut self) {
        self.record_lifecycle(HeapLogLevel::Info, "initialize", None, "ok", "");
    }

    fn finalize(&mut self) {
        let s = self.stats;
        self.record_lifecycle(
            HeapLogLevel::Info,
            "finalize",
            None,
            "snapshot",
            format!(
                "created={};released_on_zero={};swept={};collections={};stale={};peak_live={}",
                s.created, s.released_on_zero, s.swept, s.collections, s.stale_accesses, s.peak_live
            ),
        );
    }

    fn make_shared(&mut self, vertex: Vertex<GcRef>) -> GcRef {
        let object = Object {
            vertex,
            roots: 1,
            incoming: 0,
        };
        let r = match self.free_list.pop() {
            Some(index) => {
                let entry = &mut self.entries[index as usize];
                entry.object = Some(object);
                GcRef {
                    index,
                    generation: entry.generation,
                }
            }
            None => {
                let index = self.entries.len() as u32;
                self.entries.push(Entry {
                    generation: 0,
                    object: Some(object),
                });
                GcRef {
                    index,
                    generation: 0,
                }
            }
        };
        self.live += 1;
        self.stats.created += 1;
        self.stats.peak_live = self.stats.peak_live.max(self.live);
        self.record_lifecycle(HeapLogLevel::Trace, "make_shared", Some(r), "ok", "");
        r
    }

    fn release_root(&mut self, r: GcRef) {
        let Some(object) = self.object_mut(r) else {
            self.stale("release_root", r);
            return;
        };
        object.roots = object.roots.saturating_sub(1);
        if object.roots > 0 || object.incoming > 0 {
            return;
        }
        if let Some(mut freed) = self.free_entry(r.index) {
            let targets: Vec<GcRef> = freed.vertex.take_edges().collect();
            self.stats.released_on_zero += 1;
            self.record_lifecycle(
                HeapLogLevel::Trace,
                "release_on_zero",
                Some(r),
                "freed",
                "cause=root",
            );
            self.release_edges(targets);
        }
    }

    fn vertex(&self, r: GcRef) -> Option<&Vertex<GcRef>> {
        self.object(r).map(|o| &o.vertex)
    }

    fn link_at(&mut self, source: GcRef, slot: usize, target: GcRef) -> bool {
        if slot >= MAX_EDGES {
            return false;
        }
        if self.object(source).is_none() {
            self.stale("link", source);
            return false;
        }
        let Some(t) = self.object_mut(target) else {
            self.stale("link", target);
            return false;
        };
        t.incoming += 1;
        let replaced = self
            .object_mut(source)
            .and_then(|s| s.vertex.set_edge(slot, target));
        if let Some(old) = replaced {
            self.release_edges([old]);
        }
        true
    }

    fn unlink_first(&mut self, source: GcRef) -> bool {
        let Some(object) = self.object_mut(source) else {
            self.stale("unlink", source);
            return false;
        };
        match object.vertex.take_first_edge() {
            Some(target) => {
                self.release_edges([target]);
                true
            }
            None => false,
        }
    }

    fn write_payload(&mut self, r: GcRef, value: u64) -> bool {
        match self.object_mut(r) {
            Some(object) => {
                object.vertex.set_payload(value);
                true
            }
            None => {
                self.stale("write_payload", r);
                false
            }
        }
    }

    fn collect_garbage(&mut self) -> usize {
        self.collect()
    }

    fn live_objects(&self) -> usize {
        self.live
    }
}
