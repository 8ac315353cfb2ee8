//! True-allocator capability.
//!
//! Interposition means the public `malloc`/`free` symbols are this
//! runtime's; the genuine allocator underneath is reached through function
//! pointers resolved once with `dlsym(RTLD_NEXT, ...)`. The resolved set is
//! the single capability the tagger consumes; nothing else in the runtime
//! talks to the host library directly.
//!
//! Resolution is guarded by an explicit two-state transition
//! (uninitialized -> resolving -> ready). The dynamic loader allocates
//! while resolving, which re-enters the tagger; during the `resolving`
//! window [`try_get`] answers `None` and those requests fall through to the
//! bootstrap arena.

use std::ffi::c_void;
use std::mem::transmute;
use std::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use memtag_rs_oracle::diag;
use thiserror::Error;

type MallocFn = unsafe extern "C" fn(usize) -> *mut c_void;
type FreeFn = unsafe extern "C" fn(*mut c_void);

/// The resolved entry points of the true allocator.
pub struct HostLibc {
    malloc: MallocFn,
    free: FreeFn,
}

impl HostLibc {
    /// Allocate `size` bytes from the true allocator.
    ///
    /// # Safety
    ///
    /// Must be called with backend checking disabled; the true allocator's
    /// own bookkeeping must stay invisible to the backend.
    pub unsafe fn malloc(&self, size: usize) -> *mut u8 {
        // SAFETY: direct call to the resolved host allocator entry point.
        unsafe { (self.malloc)(size) }.cast()
    }

    /// Return a raw block to the true allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must be a block start previously returned by [`Self::malloc`],
    /// and checking must be disabled as for [`Self::malloc`].
    pub unsafe fn free(&self, ptr: *mut u8) {
        // SAFETY: direct call to the resolved host deallocator entry point.
        unsafe { (self.free)(ptr.cast()) }
    }
}

/// A required host symbol did not resolve.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("host symbol `{0}` did not resolve")]
    MissingSymbol(&'static str),
}

const UNINIT: u8 = 0;
const RESOLVING: u8 = 1;
const READY: u8 = 2;

static STATE: AtomicU8 = AtomicU8::new(UNINIT);
static HOST: AtomicPtr<HostLibc> = AtomicPtr::new(std::ptr::null_mut());

fn resolve() -> Result<HostLibc, ResolveError> {
    // SAFETY: dlsym with RTLD_NEXT finds the definition after this object
    // in link order, i.e. the host library's allocator.
    let malloc_sym = unsafe { libc::dlsym(libc::RTLD_NEXT, c"malloc".as_ptr()) };
    if malloc_sym.is_null() {
        return Err(ResolveError::MissingSymbol("malloc"));
    }
    // SAFETY: as above.
    let free_sym = unsafe { libc::dlsym(libc::RTLD_NEXT, c"free".as_ptr()) };
    if free_sym.is_null() {
        return Err(ResolveError::MissingSymbol("free"));
    }

    // SAFETY: the resolved addresses are the host allocator entry points
    // and match the declared C signatures.
    Ok(HostLibc {
        malloc: unsafe { transmute::<*mut c_void, MallocFn>(malloc_sym) },
        free: unsafe { transmute::<*mut c_void, FreeFn>(free_sym) },
    })
}

/// There is no safe continuation without a genuine allocator to delegate
/// to, so a failed resolution ends the process.
fn fatal(err: ResolveError) -> ! {
    eprintln!("[memtag] fatal: {err}");
    std::process::abort()
}

/// The resolved host capability, or `None` while resolution is in flight
/// (callers must fall back to the bootstrap arena).
pub fn try_get() -> Option<&'static HostLibc> {
    match STATE.load(Ordering::Acquire) {
        READY => {
            let ptr = HOST.load(Ordering::Acquire);
            // SAFETY: READY is only published after HOST holds a leaked,
            // never-freed HostLibc.
            Some(unsafe { &*ptr })
        }
        RESOLVING => None,
        _ => {
            if STATE
                .compare_exchange(UNINIT, RESOLVING, Ordering::SeqCst, Ordering::Relaxed)
                .is_err()
            {
                return if STATE.load(Ordering::Acquire) == READY {
                    let ptr = HOST.load(Ordering::Acquire);
                    // SAFETY: as above.
                    Some(unsafe { &*ptr })
                } else {
                    None
                };
            }

            let host = match resolve() {
                Ok(host) => host,
                Err(err) => fatal(err),
            };
            // The Box below allocates through whatever allocator is live;
            // in preload mode that re-enters the tagger, which sees
            // RESOLVING and serves it from the arena.
            let ptr = Box::into_raw(Box::new(host));
            HOST.store(ptr, Ordering::Release);
            STATE.store(READY, Ordering::Release);
            diag!("host allocator resolved");
            // SAFETY: freshly leaked, never freed.
            Some(unsafe { &*ptr })
        }
    }
}

/// Force resolution now. Called from the startup hook so the first
/// intercepted allocation after `main` finds the capability ready.
pub fn init() {
    let _ = try_get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_reaches_ready() {
        init();
        assert!(try_get().is_some());
        assert_eq!(STATE.load(Ordering::Acquire), READY);
    }

    #[test]
    fn resolved_allocator_round_trips() {
        let host = try_get().expect("host allocator");
        memtag_rs_oracle::guard::with_checking_disabled(|| {
            // SAFETY: guarded allocate/free pair against the host allocator.
            unsafe {
                let p = host.malloc(64);
                assert!(!p.is_null());
                p.write_bytes(0xAB, 64);
                host.free(p);
            }
        });
    }
}
