//! Boundaries between the generators and the code under test.
//!
//! [`AllocatorBoundary`] is the narrow surface the linear workload drives:
//! lifecycle hooks plus allocate/deallocate, and tag access so a live
//! block can carry its own size for self-checking. [`ManagedHeap`] is the
//! surface the graph workload drives: shared vertex construction, edge
//! mutation, payload access, and a collector entry point.
//!
//! Implementations that touch raw memory live outside this crate.
//! [`VecAllocator`] is a safe reference boundary backed by boxed byte
//! slices and logical offsets, used for tests and dry runs.

use std::collections::HashMap;
use std::fmt::Debug;

/// Maximum number of outgoing references held by one vertex.
pub const MAX_EDGES: usize = 32;

/// Initial payload of every new vertex.
pub const VERTEX_PAYLOAD_INIT: u64 = 0x1337_1337_DEAD_BEEF;

/// Allocator entry points consumed by the linear workload.
pub trait AllocatorBoundary {
    /// Owned handle to one live block.
    type Handle;

    /// Short label used in reports and logs.
    fn name(&self) -> &'static str;

    fn initialize(&mut self) {}

    fn finalize(&mut self) {}

    /// Allocate `size` bytes. `None` means the allocator refused.
    fn allocate(&mut self, size: usize) -> Option<Self::Handle>;

    fn deallocate(&mut self, handle: Self::Handle);

    /// Store `tag` in the first `min(8, size)` bytes of the block, little-endian.
    fn write_tag(&mut self, handle: &Self::Handle, size: usize, tag: u64);

    /// Read back what [`write_tag`](Self::write_tag) stored.
    fn read_tag(&self, handle: &Self::Handle, size: usize) -> u64;
}

impl<A: AllocatorBoundary + ?Sized> AllocatorBoundary for &mut A {
    type Handle = A::Handle;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn initialize(&mut self) {
        (**self).initialize();
    }

    fn finalize(&mut self) {
        (**self).finalize();
    }

    fn allocate(&mut self, size: usize) -> Option<Self::Handle> {
        (**self).allocate(size)
    }

    fn deallocate(&mut self, handle: Self::Handle) {
        (**self).deallocate(handle);
    }

    fn write_tag(&mut self, handle: &Self::Handle, size: usize, tag: u64) {
        (**self).write_tag(handle, size, tag);
    }

    fn read_tag(&self, handle: &Self::Handle, size: usize) -> u64 {
        (**self).read_tag(handle, size)
    }
}

/// Number of tag bytes stored in a block of `size` bytes.
#[inline]
#[must_use]
pub const fn tag_width(size: usize) -> usize {
    if size < 8 { size } else { 8 }
}

/// Graph node: a fixed array of outgoing references plus a scalar payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex<R: Copy> {
    edges: [Option<R>; MAX_EDGES],
    payload: u64,
}

impl<R: Copy> Default for Vertex<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Copy> Vertex<R> {
    /// Vertex with no edges and the initial payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            edges: [None; MAX_EDGES],
            payload: VERTEX_PAYLOAD_INIT,
        }
    }

    #[must_use]
    pub fn edges(&self) -> &[Option<R>; MAX_EDGES] {
        &self.edges
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    #[must_use]
    pub fn first_vacant(&self) -> Option<usize> {
        self.edges.iter().position(Option::is_none)
    }

    /// Store `target` at `slot`, returning whatever was there before.
    pub fn set_edge(&mut self, slot: usize, target: R) -> Option<R> {
        self.edges[slot].replace(target)
    }

    /// Remove and return the first occupied edge.
    pub fn take_first_edge(&mut self) -> Option<R> {
        self.edges.iter_mut().find(|e| e.is_some())?.take()
    }

    /// Remove every edge, yielding the targets.
    pub fn take_edges(&mut self) -> impl Iterator<Item = R> + '_ {
        self.edges.iter_mut().filter_map(Option::take)
    }

    #[must_use]
    pub fn payload(&self) -> u64 {
        self.payload
    }

    pub fn set_payload(&mut self, value: u64) {
        self.payload = value;
    }
}

/// Reference-counted, collector-backed heap consumed by the graph workload.
///
/// References handed out by [`make_shared`](Self::make_shared) are roots.
/// Edges are counted references owned by their source vertex. An object is
/// released when its last root and last incoming edge disappear; cycles
/// are left to [`collect_garbage`](Self::collect_garbage).
pub trait ManagedHeap {
    type Ref: Copy + Eq + Debug;

    /// Short label used in reports and logs.
    fn name(&self) -> &'static str;

    fn initialize(&mut self) {}

    fn finalize(&mut self) {}

    /// Move `vertex` onto the heap and return a root reference to it.
    fn make_shared(&mut self, vertex: Vertex<Self::Ref>) -> Self::Ref;

    /// Drop one root reference.
    fn release_root(&mut self, r: Self::Ref);

    /// Borrow a live vertex. `None` for a stale reference.
    fn vertex(&self, r: Self::Ref) -> Option<&Vertex<Self::Ref>>;

    /// Store an edge `source -> target` at edge slot `slot`, replacing (and
    /// releasing) any edge already there.
    fn link_at(&mut self, source: Self::Ref, slot: usize, target: Self::Ref) -> bool;

    /// Store an edge in the first vacant edge slot of `source`.
    /// Returns `false` when every slot is taken.
    fn link(&mut self, source: Self::Ref, target: Self::Ref) -> bool {
        let Some(slot) = self.vertex(source).and_then(Vertex::first_vacant) else {
            return false;
        };
        self.link_at(source, slot, target)
    }

    /// Drop the first outgoing edge of `source`, if any.
    fn unlink_first(&mut self, source: Self::Ref) -> bool;

    fn write_payload(&mut self, r: Self::Ref, value: u64) -> bool;

    fn read_payload(&self, r: Self::Ref) -> Option<u64> {
        self.vertex(r).map(Vertex::payload)
    }

    /// Reclaim unreachable objects; returns how many were freed.
    fn collect_garbage(&mut self) -> usize;

    /// Objects currently tracked by the heap.
    fn live_objects(&self) -> usize;
}

/// Safe offset-addressed allocator.
///
/// Handles are logical offsets, the way a pointer would be, and every
/// block is a boxed byte slice. An optional capacity refuses allocations
/// that would push live bytes past it, which lets tests model
/// out-of-memory without touching the real heap.
#[derive(Debug, Default)]
pub struct VecAllocator {
    blocks: HashMap<usize, Box<[u8]>>,
    next_offset: usize,
    capacity: Option<usize>,
    live_bytes: usize,
    peak_live_bytes: usize,
    initialize_calls: u64,
    finalize_calls: u64,
    allocate_calls: u64,
    deallocate_calls: u64,
    refused: u64,
    unknown_frees: u64,
}

impl VecAllocator {
    const BASE_OFFSET: usize = 0x1000;

    #[must_use]
    pub fn new() -> Self {
        Self {
            next_offset: Self::BASE_OFFSET,
            ..Self::default()
        }
    }

    /// Refuse any allocation that would exceed `bytes` live bytes.
    #[must_use]
    pub fn with_capacity_limit(bytes: usize) -> Self {
        Self {
            capacity: Some(bytes),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn live_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes
    }

    #[must_use]
    pub fn peak_live_bytes(&self) -> usize {
        self.peak_live_bytes
    }

    #[must_use]
    pub fn initialize_calls(&self) -> u64 {
        self.initialize_calls
    }

    #[must_use]
    pub fn finalize_calls(&self) -> u64 {
        self.finalize_calls
    }

    #[must_use]
    pub fn allocate_calls(&self) -> u64 {
        self.allocate_calls
    }

    #[must_use]
    pub fn deallocate_calls(&self) -> u64 {
        self.deallocate_calls
    }

    #[must_use]
    pub fn refused(&self) -> u64 {
        self.refused
    }

    #[must_use]
    pub fn unknown_frees(&self) -> u64 {
        self.unknown_frees
    }

    /// Total boundary calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> u64 {
        self.initialize_calls + self.finalize_calls + self.allocate_calls + self.deallocate_calls
    }
}

impl AllocatorBoundary for VecAllocator {
    type Handle = usize;

    fn name(&self) -> &'static str {
        "vec"
    }

    fn initialize(&mut self) {
        self.initialize_calls += 1;
        if self.next_offset == 0 {
            self.next_offset = Self::BASE_OFFSET;
        }
    }

    fn finalize(&mut self) {
        self.finalize_calls += 1;
    }

    fn allocate(&mut self, size: usize) -> Option<usize> {
        self.allocate_calls += 1;
        let live_after = self.live_bytes.checked_add(size)?;
        if self.capacity.is_some_and(|cap| live_after > cap) {
            self.refused += 1;
            return None;
        }
        // Keep offsets 16-byte aligned and distinct even for empty blocks.
        let stride = size.max(1).checked_next_multiple_of(16)?;
        let offset = self.next_offset.max(Self::BASE_OFFSET);
        self.next_offset = offset.checked_add(stride)?;
        self.blocks.insert(offset, vec![0u8; size].into_boxed_slice());
        self.live_bytes = live_after;
        self.peak_live_bytes = self.peak_live_bytes.max(live_after);
        Some(offset)
    }

    fn deallocate(&mut self, handle: usize) {
        self.deallocate_calls += 1;
        match self.blocks.remove(&handle) {
            Some(block) => self.live_bytes -= block.len(),
            None => self.unknown_frees += 1,
        }
    }

    fn write_tag(&mut self, handle: &usize, size: usize, tag: u64) {
        if let Some(block) = self.blocks.get_mut(handle) {
            let width = tag_width(size.min(block.len()));
            block[..width].copy_from_slice(&tag.to_le_bytes()[..width]);
        }
    }

    fn read_tag(&self, handle: &usize, size: usize) -> u64 {
        let Some(block) = self.blocks.get(handle) else {
            return 0;
        };
        let width = tag_width(size.min(block.len()));
        let mut bytes = [0u8; 8];
        bytes[..width].copy_from_slice(&block[..width]);
        u64::from_le_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_start_above_zero_page() {
        let mut a = VecAllocator::new();
        let h = a.allocate(24).unwrap();
        assert!(h >= 0x1000);
        assert_eq!(h % 16, 0);
        let g = a.allocate(0).unwrap();
        assert_ne!(h, g);
    }

    #[test]
    fn tags_round_trip_through_block_bytes() {
        let mut a = VecAllocator::new();
        let big = a.allocate(4096).unwrap();
        a.write_tag(&big, 4096, 4096);
        assert_eq!(a.read_tag(&big, 4096), 4096);

        let tiny = a.allocate(2).unwrap();
        a.write_tag(&tiny, 2, 0x0102_0304);
        assert_eq!(a.read_tag(&tiny, 2), 0x0304);
    }

    #[test]
    fn capacity_limit_refuses_without_state_change() {
        let mut a = VecAllocator::with_capacity_limit(100);
        let h = a.allocate(64).unwrap();
        assert_eq!(a.allocate(64), None);
        assert_eq!(a.refused(), 1);
        assert_eq!(a.live_bytes(), 64);
        a.deallocate(h);
        assert_eq!(a.live_bytes(), 0);
        assert!(a.allocate(100).is_some());
    }

    #[test]
    fn unknown_free_is_counted_not_fatal() {
        let mut a = VecAllocator::new();
        a.deallocate(0xdead);
        assert_eq!(a.unknown_frees(), 1);
        assert_eq!(a.live_count(), 0);
    }

    #[test]
    fn mutable_reference_forwards_calls() {
        fn exercise<A: AllocatorBoundary>(mut boundary: A) {
            boundary.initialize();
            let h = boundary.allocate(8).unwrap();
            boundary.write_tag(&h, 8, 8);
            assert_eq!(boundary.read_tag(&h, 8), 8);
            boundary.deallocate(h);
            boundary.finalize();
        }
        let mut a = VecAllocator::new();
        exercise(&mut a);
        assert_eq!(a.total_calls(), 4);
        assert_eq!(a.live_count(), 0);
    }

    #[test]
    fn vertex_edges_fill_in_order() {
        let mut v: Vertex<u32> = Vertex::new();
        assert_eq!(v.payload(), VERTEX_PAYLOAD_INIT);
        assert_eq!(v.first_vacant(), Some(0));
        v.set_edge(0, 7);
        v.set_edge(2, 9);
        assert_eq!(v.first_vacant(), Some(1));
        assert_eq!(v.edge_count(), 2);
        assert_eq!(v.take_first_edge(), Some(7));
        assert_eq!(v.take_first_edge(), Some(9));
        assert_eq!(v.take_first_edge(), None);
        for i in 0..MAX_EDGES {
            v.set_edge(i, i as u32);
        }
        assert_eq!(v.first_vacant(), None);
        assert_eq!(v.take_edges().count(), MAX_EDGES);
        assert_eq!(v.edge_count(), 0);
    }
}
