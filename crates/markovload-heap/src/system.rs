//! Rust global allocator behind the allocator boundary.

use std::alloc::Layout;
use std::ptr::NonNull;

use markovload_core::AllocatorBoundary;

use crate::raw::{load_tag, store_tag};

/// Minimum alignment of every block.
pub const BLOCK_ALIGN: usize = 16;

/// One block from the global allocator. Freed only through
/// [`SystemAllocator::deallocate`].
#[derive(Debug)]
pub struct SystemBlock {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl SystemBlock {
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

/// Allocates through `std::alloc` with 16-byte alignment.
#[derive(Debug, Default)]
pub struct SystemAllocator {
    live: usize,
}

impl SystemAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks handed out and not yet returned.
    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.live
    }
}

impl AllocatorBoundary for SystemAllocator {
    type Handle = SystemBlock;

    fn name(&self) -> &'static str {
        "system"
    }

    fn allocate(&mut self, size: usize) -> Option<SystemBlock> {
        // Zero-sized layouts are not allowed by `alloc`.
        let layout = Layout::from_size_align(size.max(1), BLOCK_ALIGN).ok()?;
        // SAFETY: `layout` has non-zero size.
        let raw = unsafe { std::alloc::alloc(layout) };
        let ptr = NonNull::new(raw)?;
        self.live += 1;
        Some(SystemBlock { ptr, layout })
    }

    fn deallocate(&mut self, handle: SystemBlock) {
        // SAFETY: the block came from `alloc` with exactly this layout and the
        // handle is consumed, so it cannot be freed twice.
        unsafe { std::alloc::dealloc(handle.ptr.as_ptr(), handle.layout) };
        self.live -= 1;
    }

    fn write_tag(&mut self, handle: &SystemBlock, size: usize, tag: u64) {
        // SAFETY: the block spans `layout.size() >= min(8, size)` bytes when
        // `size` is the requested size.
        unsafe { store_tag(handle.ptr, size.min(handle.layout.size()), tag) };
    }

    fn read_tag(&self, handle: &SystemBlock, size: usize) -> u64 {
        // SAFETY: as in `write_tag`.
        unsafe { load_tag(handle.ptr, size.min(handle.layout.size())) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_aligned_and_tagged() {
        let mut a = SystemAllocator::new();
        let blocks: Vec<SystemBlock> = [1usize, 7, 8, 24, 4096]
            .iter()
            .map(|&size| {
                let b = a.allocate(size).unwrap();
                assert_eq!(b.as_ptr() as usize % BLOCK_ALIGN, 0);
                a.write_tag(&b, size, size as u64);
                assert_eq!(a.read_tag(&b, size), size as u64);
                b
            })
            .collect();
        assert_eq!(a.live_blocks(), 5);
        for b in blocks {
            a.deallocate(b);
        }
        assert_eq!(a.live_blocks(), 0);
    }

    #[test]
    fn zero_size_still_yields_a_block() {
        let mut a = SystemAllocator::new();
        let b = a.allocate(0).unwrap();
        a.write_tag(&b, 0, 99);
        assert_eq!(a.read_tag(&b, 0), 0);
        a.deallocate(b);
    }
}
