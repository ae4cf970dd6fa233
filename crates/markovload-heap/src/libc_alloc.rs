//! C `malloc`/`free` behind the allocator boundary.
//!
//! This is the shim to preload a different allocator under: whatever
//! `malloc` resolves to at link or load time is what gets measured.

use std::ptr::NonNull;

use markovload_core::AllocatorBoundary;

use crate::raw::{load_tag, store_tag};

/// One block from `malloc`, remembering the size it was requested with.
#[derive(Debug)]
pub struct LibcBlock {
    ptr: NonNull<u8>,
    size: usize,
}

impl LibcBlock {
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }
}

#[derive(Debug, Default)]
pub struct LibcAllocator {
    live: usize,
}

impl LibcAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn live_blocks(&self) -> usize {
        self.live
    }
}

impl AllocatorBoundary for LibcAllocator {
    type Handle = LibcBlock;

    fn name(&self) -> &'static str {
        "libc"
    }

    fn allocate(&mut self, size: usize) -> Option<LibcBlock> {
        let size = size.max(1);
        // SAFETY: plain call into the C allocator; a null return is handled.
        let raw = unsafe { libc::malloc(size) };
        let ptr = NonNull::new(raw.cast::<u8>())?;
        self.live += 1;
        Some(LibcBlock { ptr, size })
    }

    fn deallocate(&mut self, handle: LibcBlock) {
        // SAFETY: the pointer came from `malloc` and the handle is consumed.
        unsafe { libc::free(handle.ptr.as_ptr().cast()) };
        self.live -= 1;
    }

    fn write_tag(&mut self, handle: &LibcBlock, size: usize, tag: u64) {
        // SAFETY: `malloc` returned at least `handle.size` usable bytes.
        unsafe { store_tag(handle.ptr, size.min(handle.size), tag) };
    }

    fn read_tag(&self, handle: &LibcBlock, size: usize) -> u64 {
        // SAFETY: as in `write_tag`.
        unsafe { load_tag(handle.ptr, size.min(handle.size)) }
    }
}
