//! Call-counting wrapper around any allocator boundary.

use markovload_core::AllocatorBoundary;

/// Per-entry-point call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub initialize: u64,
    pub finalize: u64,
    pub allocate: u64,
    pub deallocate: u64,
    /// `allocate` calls that returned nothing.
    pub failed: u64,
    /// Sum of sizes passed to successful `allocate` calls.
    pub bytes_requested: u64,
}

impl CallCounts {
    #[must_use]
    pub fn total(&self) -> u64 {
        self.initialize + self.finalize + self.allocate + self.deallocate
    }

    /// Successful allocations not yet returned.
    #[must_use]
    pub fn outstanding(&self) -> u64 {
        (self.allocate - self.failed).saturating_sub(self.deallocate)
    }
}

#[derive(Debug, Default)]
pub struct CountingAllocator<A> {
    inner: A,
    counts: CallCounts,
}

impl<A: AllocatorBoundary> CountingAllocator<A> {
    #[must_use]
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            counts: CallCounts::default(),
        }
    }

    #[must_use]
    pub fn counts(&self) -> CallCounts {
        self.counts
    }

    #[must_use]
    pub fn inner(&self) -> &A {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> A {
        self.inner
    }
}

impl<A: AllocatorBoundary> AllocatorBoundary for CountingAllocator<A> {
    type Handle = A::Handle;

    fn name(&self) -> &'static str {
        "counting"
    }

    fn initialize(&mut self) {
        self.counts.initialize += 1;
        self.inner.initialize();
    }

    fn finalize(&mut self) {
        self.counts.finalize += 1;
        self.inner.finalize();
    }

    fn allocate(&mut self, size: usize) -> Option<A::Handle> {
        self.counts.allocate += 1;
        let handle = self.inner.allocate(size);
        match handle {
            Some(_) => self.counts.bytes_requested += size as u64,
            None => self.counts.failed += 1,
        }
        handle
    }

    fn deallocate(&mut self, handle: A::Handle) {
        self.counts.deallocate += 1;
        self.inner.deallocate(handle);
    }

    fn write_tag(&mut self, handle: &A::Handle, size: usize, tag: u64) {
        self.inner.write_tag(handle, size, tag);
    }

    fn read_tag(&self, handle: &A::Handle, size: usize) -> u64 {
        self.inner.read_tag(handle, size)
    }
}
