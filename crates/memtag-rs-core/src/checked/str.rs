//! Checked string operations.
//!
//! String extents are not given by the caller, so each function first runs
//! an internal, non-checked length query over the original pointer and
//! then asks the backend to validate `[0, length + 1)` (terminator
//! included). Bounded variants cap the validated extent at what the
//! operation actually touches.

use std::ffi::{c_char, c_int};
use std::ptr;

use memtag_rs_oracle::guard::with_checking_disabled;
use memtag_rs_oracle::transport as oracle;

use crate::alloc::tagger;
use crate::string::mem;
use crate::string::str as cstr;

/// Checked `strlen`.
///
/// # Safety
///
/// C `strlen` contract.
pub unsafe fn strlen(s: *const c_char) -> usize {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated string.
        let len = unsafe { cstr::strlen(s) };
        oracle::check_load(s.cast(), len + 1);
        len
    })
}

/// Checked `strnlen`: validates the terminator only when it was actually
/// reached inside the bound.
///
/// # Safety
///
/// C `strnlen` contract.
pub unsafe fn strnlen(s: *const c_char, max: usize) -> usize {
    with_checking_disabled(|| {
        // SAFETY: caller provides `max` readable bytes or a terminator.
        let len = unsafe { cstr::strnlen(s, max) };
        oracle::check_load(s.cast(), (len + 1).min(max));
        len
    })
}

/// Checked `strcmp`: exactly one load check per operand, terminator
/// included.
///
/// # Safety
///
/// C `strcmp` contract.
pub unsafe fn strcmp(a: *const c_char, b: *const c_char) -> c_int {
    with_checking_disabled(|| {
        // SAFETY: caller provides terminated strings.
        let (len_a, len_b) = unsafe { (cstr::strlen(a), cstr::strlen(b)) };
        let a_ok = oracle::check_load(a.cast(), len_a + 1);
        let b_ok = oracle::check_load(b.cast(), len_b + 1);
        // SAFETY: extents just validated.
        unsafe { cstr::strcmp(a_ok.cast(), b_ok.cast()) }
    })
}

/// Checked `strncmp`.
///
/// # Safety
///
/// C `strncmp` contract.
pub unsafe fn strncmp(a: *const c_char, b: *const c_char, n: usize) -> c_int {
    with_checking_disabled(|| {
        // SAFETY: caller provides `n` readable bytes or terminators.
        let (len_a, len_b) = unsafe { (cstr::strnlen(a, n), cstr::strnlen(b, n)) };
        let a_ok = oracle::check_load(a.cast(), (len_a + 1).min(n));
        let b_ok = oracle::check_load(b.cast(), (len_b + 1).min(n));
        // SAFETY: extents just validated.
        unsafe { cstr::strncmp(a_ok.cast(), b_ok.cast(), n) }
    })
}

/// Checked `strcasecmp`.
///
/// # Safety
///
/// C `strcasecmp` contract.
pub unsafe fn strcasecmp(a: *const c_char, b: *const c_char) -> c_int {
    with_checking_disabled(|| {
        // SAFETY: caller provides terminated strings.
        let (len_a, len_b) = unsafe { (cstr::strlen(a), cstr::strlen(b)) };
        let a_ok = oracle::check_load(a.cast(), len_a + 1);
        let b_ok = oracle::check_load(b.cast(), len_b + 1);
        // SAFETY: extents just validated.
        unsafe { cstr::strcasecmp(a_ok.cast(), b_ok.cast()) }
    })
}

/// Checked `strncasecmp`.
///
/// # Safety
///
/// C `strncasecmp` contract.
pub unsafe fn strncasecmp(a: *const c_char, b: *const c_char, n: usize) -> c_int {
    with_checking_disabled(|| {
        // SAFETY: caller provides `n` readable bytes or terminators.
        let (len_a, len_b) = unsafe { (cstr::strnlen(a, n), cstr::strnlen(b, n)) };
        let a_ok = oracle::check_load(a.cast(), (len_a + 1).min(n));
        let b_ok = oracle::check_load(b.cast(), (len_b + 1).min(n));
        // SAFETY: extents just validated.
        unsafe { cstr::strncasecmp(a_ok.cast(), b_ok.cast(), n) }
    })
}

/// Checked `strchr`.
///
/// # Safety
///
/// C `strchr` contract.
pub unsafe fn strchr(s: *const c_char, c: c_int) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated string.
        let len = unsafe { cstr::strlen(s) };
        let s_ok = oracle::check_load(s.cast(), len + 1);
        // SAFETY: extent just validated.
        let found = unsafe { cstr::strchr(s_ok.cast(), c) };
        match found {
            // SAFETY: offset lies within the validated string.
            Some(k) => unsafe { s.add(k) }.cast_mut(),
            None => ptr::null_mut(),
        }
    })
}

/// Checked `strrchr`.
///
/// # Safety
///
/// C `strrchr` contract.
pub unsafe fn strrchr(s: *const c_char, c: c_int) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated string.
        let len = unsafe { cstr::strlen(s) };
        let s_ok = oracle::check_load(s.cast(), len + 1);
        // SAFETY: extent just validated.
        let found = unsafe { cstr::strrchr(s_ok.cast(), c) };
        match found {
            // SAFETY: offset lies within the validated string.
            Some(k) => unsafe { s.add(k) }.cast_mut(),
            None => ptr::null_mut(),
        }
    })
}

/// Checked `strstr`.
///
/// # Safety
///
/// C `strstr` contract.
pub unsafe fn strstr(haystack: *const c_char, needle: *const c_char) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides terminated strings.
        let (len_h, len_n) = unsafe { (cstr::strlen(haystack), cstr::strlen(needle)) };
        let hay_ok = oracle::check_load(haystack.cast(), len_h + 1);
        let needle_ok = oracle::check_load(needle.cast(), len_n + 1);
        // SAFETY: extents just validated.
        let found = unsafe { cstr::strstr(hay_ok.cast(), needle_ok.cast()) };
        match found {
            // SAFETY: offset lies within the haystack.
            Some(k) => unsafe { haystack.add(k) }.cast_mut(),
            None => ptr::null_mut(),
        }
    })
}

/// Checked `strcasestr`.
///
/// # Safety
///
/// C `strcasestr` contract.
pub unsafe fn strcasestr(haystack: *const c_char, needle: *const c_char) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides terminated strings.
        let (len_h, len_n) = unsafe { (cstr::strlen(haystack), cstr::strlen(needle)) };
        let hay_ok = oracle::check_load(haystack.cast(), len_h + 1);
        let needle_ok = oracle::check_load(needle.cast(), len_n + 1);
        // SAFETY: extents just validated.
        let found = unsafe { cstr::strcasestr(hay_ok.cast(), needle_ok.cast()) };
        match found {
            // SAFETY: offset lies within the haystack.
            Some(k) => unsafe { haystack.add(k) }.cast_mut(),
            None => ptr::null_mut(),
        }
    })
}

/// Checked `strcpy`.
///
/// # Safety
///
/// C `strcpy` contract.
pub unsafe fn strcpy(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated source.
        let len = unsafe { cstr::strlen(src) };
        let src_ok = oracle::check_load(src.cast(), len + 1);
        let dest_ok = oracle::check_store(dest.cast(), len + 1);
        // SAFETY: extents just validated; terminator travels with the copy.
        unsafe { mem::memcpy(dest_ok, src_ok, len + 1) };
        dest
    })
}

/// Checked `stpcpy`: returns the address of the copied terminator.
///
/// # Safety
///
/// C `stpcpy` contract.
pub unsafe fn stpcpy(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated source.
        let len = unsafe { cstr::strlen(src) };
        let src_ok = oracle::check_load(src.cast(), len + 1);
        let dest_ok = oracle::check_store(dest.cast(), len + 1);
        // SAFETY: extents just validated.
        unsafe {
            mem::memcpy(dest_ok, src_ok, len + 1);
            dest.add(len)
        }
    })
}

/// Checked `strncpy`: the destination extent is the full `n` (the copy
/// null-pads), the source extent only `min(len + 1, n)`, which is all the
/// copy ever reads.
///
/// # Safety
///
/// C `strncpy` contract.
pub unsafe fn strncpy(dest: *mut c_char, src: *const c_char, n: usize) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides `n` readable bytes or a terminator.
        let len = unsafe { cstr::strnlen(src, n) };
        let src_ok = oracle::check_load(src.cast(), (len + 1).min(n));
        let dest_ok = oracle::check_store(dest.cast(), n);
        // SAFETY: extents just validated.
        unsafe { cstr::strncpy(dest_ok.cast(), src_ok.cast(), n) };
        dest
    })
}

/// Checked `strcat`.
///
/// # Safety
///
/// C `strcat` contract.
pub unsafe fn strcat(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides terminated strings.
        let (len_s, len_d) = unsafe { (cstr::strlen(src), cstr::strlen(dest)) };
        let src_ok = oracle::check_load(src.cast(), len_s + 1);
        oracle::check_load(dest.cast(), len_d + 1);
        // SAFETY: the append slot starts at the old terminator.
        let tail_ok = oracle::check_store(unsafe { dest.add(len_d) }.cast(), len_s + 1);
        // SAFETY: extents just validated.
        unsafe { mem::memcpy(tail_ok, src_ok, len_s + 1) };
        dest
    })
}

/// Checked `strdup`: the duplicate comes from the tagging allocator, so it
/// is registered with the backend like any other allocation.
///
/// # Safety
///
/// C `strdup` contract.
pub unsafe fn strdup(s: *const c_char) -> *mut c_char {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated string.
        let len = unsafe { cstr::strlen(s) };
        let s_ok = oracle::check_load(s.cast(), len + 1);
        // SAFETY: fresh allocation of len + 1 bytes.
        let dup = unsafe { tagger::malloc(len + 1) };
        if dup.is_null() {
            return ptr::null_mut();
        }
        // SAFETY: the duplicate was just allocated with room for the
        // terminator.
        unsafe { mem::memcpy(dup, s_ok, len + 1) };
        dup.cast()
    })
}
