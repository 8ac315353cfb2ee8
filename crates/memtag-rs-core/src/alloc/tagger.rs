//! The allocation tagger.
//!
//! Fronts the true allocator for the whole malloc family. Every block it
//! hands out is registered with the checking backend and carries a private
//! [`ChunkHeader`](crate::alloc::header::ChunkHeader) one granule below the
//! data address. The program only ever sees the tagged address the backend
//! returned; translation back to the raw address happens here and nowhere
//! else.
//!
//! Calls into the true allocator run under the reentrancy guard so the
//! backend never observes the host allocator's own bookkeeping.

use std::ffi::c_int;
use std::ptr;

use memtag_rs_oracle::action::TAG_GRANULE;
use memtag_rs_oracle::diag;
use memtag_rs_oracle::guard::with_checking_disabled;
use memtag_rs_oracle::transport as oracle;
use thiserror::Error;

use crate::alloc::arena;
use crate::alloc::header::{self, HEADER_SIZE};
use crate::alloc::hostlibc;
use crate::string::mem;

/// Failure modes of the aligned-allocation family.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlignedAllocError {
    #[error("alignment {0} is unusable for aligned allocation")]
    InvalidAlignment(usize),
    #[error("host allocator exhausted")]
    OutOfMemory,
}

fn round_up_to_granule(size: usize) -> Option<usize> {
    Some(size.checked_add(TAG_GRANULE - 1)? & !(TAG_GRANULE - 1))
}

/// Allocate `size` bytes and register the block with the backend.
///
/// Before the true allocator resolves, requests are served untagged from
/// the bootstrap arena; accesses through those few early blocks are not
/// validated.
///
/// # Safety
///
/// Same contract as C `malloc`; the returned tagged pointer must only be
/// released through [`free`].
pub unsafe fn malloc(size: usize) -> *mut u8 {
    let Some(host) = hostlibc::try_get() else {
        return arena::bump_alloc(size);
    };

    let Some(raw_size) = round_up_to_granule(size).and_then(|s| s.checked_add(HEADER_SIZE))
    else {
        return ptr::null_mut();
    };

    // SAFETY: plain request to the resolved host allocator, guarded so the
    // backend ignores its internals.
    let raw = with_checking_disabled(|| unsafe { host.malloc(raw_size) });
    if raw.is_null() {
        diag!("malloc({size}): host allocator exhausted");
        return ptr::null_mut();
    }

    // SAFETY: `raw` is valid for `raw_size` bytes, so the header slot and
    // the data region both fit.
    let data = unsafe { raw.add(HEADER_SIZE) };
    unsafe { header::write(data, size, ptr::null_mut()) };

    // The requested size, not the granule-rounded size, is what the
    // backend registers; the rounding slack stays unregistered raw space.
    let tagged = oracle::alloc(data, unsafe { data.add(size) });
    diag!("malloc({size}) = {tagged:p}");
    tagged
}

/// Release a tagged block.
///
/// Null and bootstrap-arena addresses are no-ops. Whether a stale or
/// foreign tag is worth reporting is the backend's decision; a null
/// translation from it ends the operation here.
///
/// # Safety
///
/// `ptr` must be null, arena-issued, or a live pointer returned by this
/// allocator.
pub unsafe fn free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    if arena::contains(ptr) {
        diag!("free({ptr:p}): bootstrap arena block, no-op");
        return;
    }
    let Some(host) = hostlibc::try_get() else {
        // Not arena-issued and no allocator resolved: nothing can be done.
        return;
    };

    let raw = oracle::dealloc(ptr);
    if raw.is_null() {
        diag!("free({ptr:p}): backend rejected the tag");
        return;
    }

    with_checking_disabled(|| {
        // SAFETY: `raw` is the untagged data address of a live block, so
        // its header sits one granule below.
        let block_start = unsafe {
            let hdr = &*header::header_ptr(raw);
            if hdr.aligned_origin.is_null() {
                header::header_ptr(raw).cast::<u8>()
            } else {
                hdr.aligned_origin
            }
        };
        // SAFETY: `block_start` is exactly what the host allocator
        // returned for this block.
        unsafe { host.free(block_start) };
    });
    diag!("free({ptr:p})");
}

/// Allocate a zero-filled array.
///
/// The element-count multiplication wraps at the arithmetic width; no
/// wider overflow check is performed.
///
/// # Safety
///
/// Same contract as C `calloc`.
pub unsafe fn calloc(nmemb: usize, size: usize) -> *mut u8 {
    let total = nmemb.wrapping_mul(size);

    if hostlibc::try_get().is_none() {
        // Bootstrap window. Arena storage is statically zeroed, so a
        // successful claim is already a valid calloc result. Oversized
        // requests fail outright rather than overrun the arena.
        if total >= arena::BOOTSTRAP_CAPACITY {
            return ptr::null_mut();
        }
        return arena::bump_alloc(total);
    }

    // SAFETY: forwarded malloc contract.
    let p = unsafe { malloc(total) };
    if p.is_null() {
        return p;
    }
    // SAFETY: the block was just allocated with `total` usable bytes. The
    // internal memset keeps this off the checked path; the allocation was
    // registered a moment ago and needs no second backend round trip.
    with_checking_disabled(|| unsafe { mem::memset(p, 0, total) });
    p
}

/// Resize a block, preserving the smaller of the old and new contents.
///
/// # Safety
///
/// Same contract as C `realloc`.
pub unsafe fn realloc(ptr: *mut u8, size: usize) -> *mut u8 {
    // SAFETY: forwarded malloc contract.
    let new = unsafe { malloc(size) };
    if new.is_null() {
        return ptr::null_mut();
    }
    if ptr.is_null() {
        return new;
    }

    with_checking_disabled(|| {
        let (old_raw, old_size) = if arena::contains(ptr) {
            // Arena blocks carry no header; cap the copy at the arena tail.
            (ptr, arena::span_to_end(ptr).min(size))
        } else {
            let raw = oracle::untag(ptr);
            // SAFETY: a live tagger block's header sits below its raw
            // data address.
            let requested = unsafe { (*header::header_ptr(raw)).requested_size };
            (raw, requested)
        };
        let new_raw = if arena::contains(new) {
            new
        } else {
            oracle::untag(new)
        };
        // SAFETY: both regions are live; the copy length is bounded by
        // each block's usable size.
        unsafe { mem::memcpy(new_raw, old_raw, old_size.min(size)) };
    });

    // SAFETY: forwarded free contract; arena pointers no-op inside.
    unsafe { free(ptr) };
    new
}

/// Even and a multiple of the pointer width. Deliberately looser than a
/// power-of-two test; kept as the documented contract of this runtime.
fn alignment_is_acceptable(alignment: usize) -> bool {
    alignment != 0 && alignment % 2 == 0 && alignment % size_of::<*mut u8>() == 0
}

/// Shared engine of the aligned-allocation family.
///
/// Over-allocates by `alignment`, picks the first aligned data address at
/// or after the header slot, and records the true block start in the
/// header so [`free`] can find it again.
///
/// # Safety
///
/// Returned pointers follow the [`malloc`] contract.
pub unsafe fn aligned_alloc_core(
    alignment: usize,
    size: usize,
) -> Result<*mut u8, AlignedAllocError> {
    if !alignment_is_acceptable(alignment) {
        return Err(AlignedAllocError::InvalidAlignment(alignment));
    }
    if size == 0 {
        return Ok(ptr::null_mut());
    }

    let Some(host) = hostlibc::try_get() else {
        // Aligned requests this early are not expected; the arena covers
        // what its own natural alignment can honor.
        if alignment <= arena::BOOTSTRAP_ALIGN {
            let p = arena::bump_alloc(size);
            return if p.is_null() {
                Err(AlignedAllocError::OutOfMemory)
            } else {
                Ok(p)
            };
        }
        return Err(AlignedAllocError::OutOfMemory);
    };

    let raw_size = HEADER_SIZE
        .checked_add(size)
        .and_then(|s| s.checked_add(alignment))
        .ok_or(AlignedAllocError::OutOfMemory)?;

    // SAFETY: guarded host allocation, as in `malloc`.
    let raw = with_checking_disabled(|| unsafe { host.malloc(raw_size) });
    if raw.is_null() {
        return Err(AlignedAllocError::OutOfMemory);
    }

    let lowest = raw as usize + HEADER_SIZE;
    let rem = lowest % alignment;
    let data_addr = if rem == 0 { lowest } else { lowest + (alignment - rem) };
    let data = data_addr as *mut u8;

    // SAFETY: `data` and the header slot below it lie inside the
    // `raw_size`-byte block: data_addr <= raw + HEADER_SIZE + alignment - 1
    // and `size` more bytes still fit.
    unsafe { header::write(data, size, raw) };
    let tagged = oracle::alloc(data, unsafe { data.add(size) });
    diag!("memalign({alignment}, {size}) = {tagged:p}");
    Ok(tagged)
}

/// POSIX `posix_memalign` contract over [`aligned_alloc_core`].
///
/// # Safety
///
/// `out` must be valid for one pointer write.
pub unsafe fn posix_memalign(out: *mut *mut u8, alignment: usize, size: usize) -> c_int {
    if out.is_null() {
        return libc::EINVAL;
    }
    // SAFETY: forwarded contract.
    match unsafe { aligned_alloc_core(alignment, size) } {
        Ok(p) => {
            // SAFETY: `out` is valid per the function contract. A zero
            // size succeeds with a null result.
            unsafe { out.write(p) };
            0
        }
        Err(AlignedAllocError::InvalidAlignment(_)) => libc::EINVAL,
        Err(AlignedAllocError::OutOfMemory) => libc::ENOMEM,
    }
}

/// `memalign`: the pointer-or-null face of [`aligned_alloc_core`].
///
/// # Safety
///
/// Same contract as C `memalign`.
pub unsafe fn memalign(alignment: usize, size: usize) -> *mut u8 {
    // SAFETY: forwarded contract.
    unsafe { aligned_alloc_core(alignment, size) }.unwrap_or(ptr::null_mut())
}

/// `aligned_alloc`: additionally requires `size` to be a multiple of
/// `alignment`.
///
/// # Safety
///
/// Same contract as C `aligned_alloc`.
pub unsafe fn aligned_alloc(alignment: usize, size: usize) -> *mut u8 {
    if alignment == 0 || size % alignment != 0 {
        return ptr::null_mut();
    }
    // SAFETY: forwarded contract.
    unsafe { memalign(alignment, size) }
}

fn page_size() -> usize {
    // SAFETY: plain sysconf query.
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret <= 0 { 4096 } else { ret as usize }
}

/// `valloc`: page-aligned allocation.
///
/// # Safety
///
/// Same contract as C `valloc`.
pub unsafe fn valloc(size: usize) -> *mut u8 {
    // SAFETY: forwarded contract.
    unsafe { memalign(page_size(), size) }
}

/// `pvalloc`: page-aligned, with the size itself rounded up to a page
/// multiple.
///
/// # Safety
///
/// Same contract as C `pvalloc`.
pub unsafe fn pvalloc(size: usize) -> *mut u8 {
    let page = page_size();
    let Some(rounded) = size.checked_add(page - 1).map(|s| s & !(page - 1)) else {
        return ptr::null_mut();
    };
    // SAFETY: forwarded contract.
    unsafe { memalign(page, rounded) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granule_rounding() {
        assert_eq!(round_up_to_granule(0), Some(0));
        assert_eq!(round_up_to_granule(1), Some(16));
        assert_eq!(round_up_to_granule(16), Some(16));
        assert_eq!(round_up_to_granule(89), Some(96));
        assert_eq!(round_up_to_granule(usize::MAX), None);
    }

    #[test]
    fn alignment_contract_is_even_and_pointer_multiple() {
        assert!(!alignment_is_acceptable(0));
        assert!(!alignment_is_acceptable(1));
        assert!(!alignment_is_acceptable(3));
        // Even but narrower than a pointer.
        assert!(!alignment_is_acceptable(2));
        assert!(alignment_is_acceptable(8));
        assert!(alignment_is_acceptable(16));
        // Not a power of two, accepted on purpose.
        assert!(alignment_is_acceptable(24));
    }

    #[test]
    fn page_size_is_sane() {
        let page = page_size();
        assert!(page >= 4096);
        assert!(page.is_power_of_two());
    }
}
