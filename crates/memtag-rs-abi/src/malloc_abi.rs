//! Interposed allocator symbols.
//!
//! Each entry point delegates to the allocation tagger in
//! `memtag-rs-core`, which owns header placement, granule rounding,
//! backend registration, and the bootstrap window. The pointers returned
//! here are tagged; the raw addresses never leave the core crate.

use std::ffi::{c_int, c_void};

use memtag_rs_core::alloc::tagger;
use memtag_rs_oracle::diag;

// ---------------------------------------------------------------------------
// malloc / free
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn malloc(size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::malloc(size) };
    diag!("malloc({size}) = {p:p}");
    p.cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    diag!("free({ptr:p})");
    // SAFETY: forwarded C contract.
    unsafe { tagger::free(ptr.cast()) }
}

// ---------------------------------------------------------------------------
// calloc / realloc
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn calloc(nmemb: usize, size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::calloc(nmemb, size) };
    diag!("calloc({nmemb}, {size}) = {p:p}");
    p.cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::realloc(ptr.cast(), size) };
    diag!("realloc({ptr:p}, {size}) = {p:p}");
    p.cast()
}

// ---------------------------------------------------------------------------
// aligned family
// ---------------------------------------------------------------------------

#[unsafe(no_mangle)]
pub unsafe extern "C" fn posix_memalign(
    memptr: *mut *mut c_void,
    alignment: usize,
    size: usize,
) -> c_int {
    // SAFETY: forwarded C contract; the out-pointer cast preserves width.
    let ret = unsafe { tagger::posix_memalign(memptr.cast(), alignment, size) };
    diag!("posix_memalign({alignment}, {size}) = {ret}");
    ret
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn memalign(alignment: usize, size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::memalign(alignment, size) };
    diag!("memalign({alignment}, {size}) = {p:p}");
    p.cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn aligned_alloc(alignment: usize, size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::aligned_alloc(alignment, size) };
    diag!("aligned_alloc({alignment}, {size}) = {p:p}");
    p.cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn valloc(size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::valloc(size) };
    diag!("valloc({size}) = {p:p}");
    p.cast()
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn pvalloc(size: usize) -> *mut c_void {
    // SAFETY: forwarded C contract.
    let p = unsafe { tagger::pvalloc(size) };
    diag!("pvalloc({size}) = {p:p}");
    p.cast()
}
