//! Per-allocation header.
//!
//! Every tagger-owned user block is preceded, in the untagged address
//! space, by one [`ChunkHeader`]. The header is never reachable through a
//! tagged pointer; the only way to it is `untagged_data - HEADER_SIZE`.

use memtag_rs_oracle::action::TAG_GRANULE;

/// Private metadata placed immediately before each data region.
#[repr(C)]
pub struct ChunkHeader {
    /// The size the caller asked for, before granule rounding. This is
    /// what the backend registered and what `realloc` preserves.
    pub requested_size: usize,
    /// Null for ordinary blocks. For over-aligned blocks, the address the
    /// true allocator actually returned: alignment padding means the block
    /// start is not `header - HEADER_SIZE`, and `free` must release this
    /// address instead.
    pub aligned_origin: *mut u8,
}

/// Bytes occupied by the header. Exactly one granule, so a granule-aligned
/// raw block keeps its data region granule-aligned.
pub const HEADER_SIZE: usize = size_of::<ChunkHeader>();

const _: () = assert!(HEADER_SIZE == TAG_GRANULE);
const _: () = assert!(align_of::<ChunkHeader>() <= TAG_GRANULE);

/// Header slot belonging to the (untagged) data address `data`.
///
/// # Safety
///
/// `data` must be the data address of a live tagger-owned block, so that
/// the `HEADER_SIZE` bytes below it are this runtime's header storage.
#[must_use]
pub unsafe fn header_ptr(data: *mut u8) -> *mut ChunkHeader {
    // SAFETY: per the function contract the header lives directly below.
    unsafe { data.sub(HEADER_SIZE) }.cast()
}

/// Initialize the header below `data`.
///
/// # Safety
///
/// Same contract as [`header_ptr`], plus the header bytes must be writable
/// (freshly obtained from the true allocator).
pub unsafe fn write(data: *mut u8, requested_size: usize, aligned_origin: *mut u8) {
    // SAFETY: the slot below `data` is owned header storage.
    unsafe {
        header_ptr(data).write(ChunkHeader {
            requested_size,
            aligned_origin,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_one_granule() {
        assert_eq!(HEADER_SIZE, 16);
    }

    #[test]
    fn header_roundtrips_below_the_data_address() {
        // A word-aligned scratch block standing in for a raw allocation.
        let mut block = [0usize; 8];
        let raw = block.as_mut_ptr().cast::<u8>();
        let data = unsafe { raw.add(HEADER_SIZE) };

        unsafe { write(data, 89, raw) };
        let header = unsafe { &*header_ptr(data) };
        assert_eq!(header.requested_size, 89);
        assert_eq!(header.aligned_origin, raw);
    }
}
