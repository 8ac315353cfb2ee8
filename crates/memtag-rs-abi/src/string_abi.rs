//! Interposed `<string.h>` symbols.
//!
//! Thin shells over the checked layer: extent discovery, backend
//! validation, and the internal byte loops all live in
//! `memtag_rs_core::checked`.

use std::ffi::{c_char, c_int, c_void};

use memtag_rs_core::checked;

// ---------------------------------------------------------------------------
// memory blocks
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memcpy(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memcpy(dest, src, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn mempcpy(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::mempcpy(dest, src, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memmove(dest: *mut c_void, src: *const c_void, n: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memmove(dest, src, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memset(dest: *mut c_void, value: c_int, n: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memset(dest, value, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn explicit_bzero(dest: *mut c_void, n: usize) {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::explicit_bzero(dest, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memcmp(a: *const c_void, b: *const c_void, n: usize) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memcmp(a, b, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn bcmp(a: *const c_void, b: *const c_void, n: usize) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::bcmp(a, b, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memchr(s: *const c_void, c: c_int, n: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memchr(s, c, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memrchr(s: *const c_void, c: c_int, n: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memrchr(s, c, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memmem(
    haystack: *const c_void,
    haystack_len: usize,
    needle: *const c_void,
    needle_len: usize,
) -> *mut c_void {
    // SAFETY: forwarded C contract.
    unsafe { checked::mem::memmem(haystack, haystack_len, needle, needle_len) }
}

// ---------------------------------------------------------------------------
// strings
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strlen(s: *const c_char) -> usize {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strlen(s) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strnlen(s: *const c_char, max: usize) -> usize {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strnlen(s, max) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strcmp(a: *const c_char, b: *const c_char) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strcmp(a, b) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strncmp(a: *const c_char, b: *const c_char, n: usize) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strncmp(a, b, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strcasecmp(a: *const c_char, b: *const c_char) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strcasecmp(a, b) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strncasecmp(a: *const c_char, b: *const c_char, n: usize) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strncasecmp(a, b, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strchr(s: *const c_char, c: c_int) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strchr(s, c) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strrchr(s: *const c_char, c: c_int) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strrchr(s, c) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strstr(haystack: *const c_char, needle: *const c_char) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strstr(haystack, needle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strcasestr(haystack: *const c_char, needle: *const c_char) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strcasestr(haystack, needle) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strcpy(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strcpy(dest, src) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn stpcpy(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::stpcpy(dest, src) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strncpy(dest: *mut c_char, src: *const c_char, n: usize) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strncpy(dest, src, n) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strcat(dest: *mut c_char, src: *const c_char) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strcat(dest, src) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn strdup(s: *const c_char) -> *mut c_char {
    // SAFETY: forwarded C contract.
    unsafe { checked::str::strdup(s) }
}
