//! Checked memory-block operations.

use std::ffi::{c_int, c_void};
use std::ptr;

use memtag_rs_oracle::guard::with_checking_disabled;
use memtag_rs_oracle::transport as oracle;

use crate::string::mem;

/// Checked `memcpy`.
///
/// # Safety
///
/// C `memcpy` contract.
pub unsafe fn memcpy(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    with_checking_disabled(|| {
        let src_ok = oracle::check_load(src.cast(), n);
        let dest_ok = oracle::check_store(dest.cast(), n);
        // SAFETY: extents just validated; regions do not overlap per the
        // caller contract.
        unsafe { mem::memcpy(dest_ok, src_ok, n) };
        dest
    })
}

/// Checked `mempcpy`: like `memcpy` but returns one past the last written
/// byte.
///
/// # Safety
///
/// C `mempcpy` contract.
pub unsafe fn mempcpy(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    // SAFETY: forwarded contract.
    unsafe {
        memcpy(dest, src, n);
        dest.cast::<u8>().add(n).cast()
    }
}

/// Checked `memmove`.
///
/// # Safety
///
/// C `memmove` contract.
pub unsafe fn memmove(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    with_checking_disabled(|| {
        let src_ok = oracle::check_load(src.cast(), n);
        let dest_ok = oracle::check_store(dest.cast(), n);
        // SAFETY: extents just validated; overlap is handled inside.
        unsafe { mem::memmove(dest_ok, src_ok, n) };
        dest
    })
}

/// Checked `memset`.
///
/// # Safety
///
/// C `memset` contract.
pub unsafe fn memset(dest: *mut c_void, value: c_int, n: usize) -> *mut c_void {
    with_checking_disabled(|| {
        let dest_ok = oracle::check_store(dest.cast(), n);
        // SAFETY: extent just validated.
        unsafe { mem::memset(dest_ok, value as u8, n) };
        dest
    })
}

/// Checked `explicit_bzero`.
///
/// # Safety
///
/// C `explicit_bzero` contract.
pub unsafe fn explicit_bzero(dest: *mut c_void, n: usize) {
    with_checking_disabled(|| {
        let dest_ok = oracle::check_store(dest.cast(), n);
        // SAFETY: extent just validated.
        unsafe { mem::memset(dest_ok, 0, n) };
    });
}

/// Checked `memcmp`.
///
/// # Safety
///
/// C `memcmp` contract.
pub unsafe fn memcmp(a: *const c_void, b: *const c_void, n: usize) -> c_int {
    with_checking_disabled(|| {
        let a_ok = oracle::check_load(a.cast(), n);
        let b_ok = oracle::check_load(b.cast(), n);
        // SAFETY: extents just validated.
        unsafe { mem::memcmp(a_ok, b_ok, n) }
    })
}

/// Checked `bcmp`.
///
/// # Safety
///
/// C `bcmp` contract.
pub unsafe fn bcmp(a: *const c_void, b: *const c_void, n: usize) -> c_int {
    with_checking_disabled(|| {
        let a_ok = oracle::check_load(a.cast(), n);
        let b_ok = oracle::check_load(b.cast(), n);
        // SAFETY: extents just validated.
        unsafe { mem::bcmp(a_ok, b_ok, n) }
    })
}

/// Checked `memchr`.
///
/// The validated extent is asymmetric on purpose: a hit at offset `k`
/// validates only `[0, k + 1)`, a miss validates the full `[0, n)`. The
/// scan itself necessarily runs before the check.
///
/// # Safety
///
/// C `memchr` contract.
pub unsafe fn memchr(s: *const c_void, c: c_int, n: usize) -> *mut c_void {
    with_checking_disabled(|| {
        // SAFETY: caller provides `n` readable bytes.
        let found = unsafe { mem::memchr(s.cast(), c as u8, n) };
        match found {
            Some(k) => {
                oracle::check_load(s.cast(), k + 1);
                // SAFETY: offset `k` is inside the scanned region.
                unsafe { s.cast::<u8>().add(k) }.cast_mut().cast()
            }
            None => {
                oracle::check_load(s.cast(), n);
                ptr::null_mut()
            }
        }
    })
}

/// Checked `memrchr`. The full extent is validated before the backward
/// scan.
///
/// # Safety
///
/// C `memrchr` contract.
pub unsafe fn memrchr(s: *const c_void, c: c_int, n: usize) -> *mut c_void {
    with_checking_disabled(|| {
        let s_ok = oracle::check_load(s.cast(), n);
        // SAFETY: extent just validated.
        let found = unsafe { mem::memrchr(s_ok, c as u8, n) };
        match found {
            // SAFETY: offset is inside the scanned region.
            Some(k) => unsafe { s.cast::<u8>().add(k) }.cast_mut().cast(),
            None => ptr::null_mut(),
        }
    })
}

/// Checked `memmem`.
///
/// # Safety
///
/// C `memmem` contract.
pub unsafe fn memmem(
    haystack: *const c_void,
    haystack_len: usize,
    needle: *const c_void,
    needle_len: usize,
) -> *mut c_void {
    with_checking_disabled(|| {
        let hay_ok = oracle::check_load(haystack.cast(), haystack_len);
        let needle_ok = oracle::check_load(needle.cast(), needle_len);
        // SAFETY: both extents just validated.
        let found = unsafe { mem::memmem(hay_ok, haystack_len, needle_ok, needle_len) };
        match found {
            // SAFETY: offset is inside the haystack.
            Some(k) => unsafe { haystack.cast::<u8>().add(k) }.cast_mut().cast(),
            None => ptr::null_mut(),
        }
    })
}
