//! Tag access on raw blocks.

use std::ptr::NonNull;

use markovload_core::boundary::tag_width;

/// Store the low `min(8, size)` bytes of `tag` at `ptr`, little-endian.
///
/// # Safety
///
/// `ptr` must be valid for writes of `min(8, size)` bytes.
#[inline]
pub unsafe fn store_tag(ptr: NonNull<u8>, size: usize, tag: u64) {
    let bytes = tag.to_le_bytes();
    // SAFETY: caller guarantees `ptr` covers `tag_width(size)` bytes; the
    // source is a local array that cannot overlap the heap block.
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), tag_width(size)) };
}

/// Load a tag written by [`store_tag`].
///
/// # Safety
///
/// `ptr` must be valid for reads of `min(8, size)` bytes.
#[inline]
#[must_use]
pub unsafe fn load_tag(ptr: NonNull<u8>, size: usize) -> u64 {
    let mut bytes = [0u8; 8];
    // SAFETY: caller guarantees `ptr` covers `tag_width(size)` bytes.
    unsafe { std::ptr::copy_nonoverlapping(ptr.as_ptr(), bytes.as_mut_ptr(), tag_width(size)) };
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_blocks_store_a_truncated_tag() {
        let mut buf = [0xAAu8; 16];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        // SAFETY: `buf` is 16 bytes.
        unsafe {
            store_tag(ptr, 3, 0x1122_3344_5566);
            assert_eq!(load_tag(ptr, 3), 0x44_5566);
        }
        assert_eq!(buf[3], 0xAA);
    }

    #[test]
    fn full_width_round_trip() {
        let mut buf = [0u8; 8];
        let ptr = NonNull::new(buf.as_mut_ptr()).unwrap();
        // SAFETY: `buf` is 8 bytes.
        unsafe {
            store_tag(ptr, 4096, 4096);
            assert_eq!(load_tag(ptr, 4096), 4096);
        }
    }
}
