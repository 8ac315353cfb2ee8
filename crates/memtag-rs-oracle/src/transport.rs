//! The single synchronous call into the checking backend.
//!
//! Everything the runtime asks of the backend goes through [`call`]. The
//! concrete binding is decided once, on first use:
//!
//! - under the emulation engine, the reserved call number is intercepted and
//!   answered, so the [`EmulatedBackend`] is used for the life of the process;
//! - on a bare host nothing answers the call number (the kernel rejects it),
//!   and the [`InertBackend`] takes over: identity translation, a local
//!   mirror for the checking flag, no enforcement. This keeps the runtime a
//!   transparent pass-through when no engine is present.
//!
//! Tests may inject their own [`Backend`] through
//! [`set_backend_for_tests`]; the injected slot is consulted only after the
//! mode flag says so, keeping the hot path a single atomic load.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::action::{Action, CheckState, ORACLE_CALL_NR};

/// One synchronous request to a checking backend.
///
/// Implementations must not allocate through the interposed allocator: the
/// transport is called from inside `malloc` itself.
pub trait Backend: Sync {
    fn call(&self, action: Action, operand0: usize, operand1: usize) -> usize;
}

/// The real transport: one foreign call on the reserved number, answered by
/// the emulation engine underneath the process.
pub struct EmulatedBackend;

impl Backend for EmulatedBackend {
    fn call(&self, action: Action, operand0: usize, operand1: usize) -> usize {
        // SAFETY: the reserved call number never reaches the kernel when the
        // engine is present; operands are plain integers on the engine side.
        let ret = unsafe { libc::syscall(ORACLE_CALL_NR, action as usize, operand0, operand1) };
        ret as usize
    }
}

/// Fallback binding used when no engine answers the reserved call number.
///
/// Translation is the identity, checks always pass, and the checking flag is
/// mirrored locally so swap semantics still hold.
pub struct InertBackend;

static INERT_STATE: AtomicUsize = AtomicUsize::new(CheckState::Enabled as usize);

impl Backend for InertBackend {
    fn call(&self, action: Action, operand0: usize, _operand1: usize) -> usize {
        match action {
            Action::Alloc
            | Action::Dealloc
            | Action::Untag
            | Action::CheckLoad
            | Action::CheckStore => operand0,
            Action::SwapState => INERT_STATE.swap(operand0, Ordering::AcqRel),
            Action::Debug => 0,
        }
    }
}

const MODE_UNPROBED: u8 = 0;
const MODE_EMULATED: u8 = 1;
const MODE_INERT: u8 = 2;
const MODE_INJECTED: u8 = 3;

static MODE: AtomicU8 = AtomicU8::new(MODE_UNPROBED);
static EMULATED: EmulatedBackend = EmulatedBackend;
static INERT: InertBackend = InertBackend;
static INJECTED: RwLock<Option<&'static dyn Backend>> = RwLock::new(None);

/// Decide which backend answers, by issuing one probing `SwapState(Enabled)`.
///
/// An engine answers with the previous state (never negative); an unhandled
/// call number comes back from the kernel as a negative error. The probe
/// leaves the checking flag enabled, which is the process default, and is
/// idempotent under concurrent first use.
fn probe() -> u8 {
    // SAFETY: same contract as EmulatedBackend::call; an unhosted call is
    // rejected by the kernel without side effects.
    let ret = unsafe {
        libc::syscall(
            ORACLE_CALL_NR,
            Action::SwapState as usize,
            CheckState::Enabled as usize,
            0usize,
        )
    };
    let mode = if ret < 0 { MODE_INERT } else { MODE_EMULATED };
    let _ = MODE.compare_exchange(MODE_UNPROBED, mode, Ordering::AcqRel, Ordering::Acquire);
    MODE.load(Ordering::Acquire)
}

/// Issue one request to whichever backend is bound.
pub fn call(action: Action, operand0: usize, operand1: usize) -> usize {
    let mode = match MODE.load(Ordering::Acquire) {
        MODE_UNPROBED => probe(),
        m => m,
    };
    match mode {
        MODE_EMULATED => EMULATED.call(action, operand0, operand1),
        MODE_INJECTED => match *INJECTED.read() {
            Some(backend) => backend.call(action, operand0, operand1),
            None => INERT.call(action, operand0, operand1),
        },
        _ => INERT.call(action, operand0, operand1),
    }
}

// ---------------------------------------------------------------------------
// Typed request wrappers
// ---------------------------------------------------------------------------

/// Register `[start, end)` as one live allocation; returns the tagged
/// address that stands for it from now on.
pub fn alloc(start: *mut u8, end: *mut u8) -> *mut u8 {
    call(Action::Alloc, start as usize, end as usize) as *mut u8
}

/// Invalidate `tagged`; returns the raw address for the true deallocator,
/// or null if the backend rejected the tag.
pub fn dealloc(tagged: *mut u8) -> *mut u8 {
    call(Action::Dealloc, tagged as usize, 0) as *mut u8
}

/// Translate `tagged` to its raw address without invalidating it.
pub fn untag(tagged: *mut u8) -> *mut u8 {
    call(Action::Untag, tagged as usize, 0) as *mut u8
}

/// Validate a read of `len` bytes at `ptr`; the returned address, not the
/// original, must be used for the read that follows.
pub fn check_load(ptr: *const u8, len: usize) -> *const u8 {
    call(Action::CheckLoad, ptr as usize, len) as *const u8
}

/// Validate a write of `len` bytes at `ptr`; the returned address, not the
/// original, must be used for the write that follows.
pub fn check_store(ptr: *mut u8, len: usize) -> *mut u8 {
    call(Action::CheckStore, ptr as usize, len) as *mut u8
}

/// Set the backend checking flag, returning what it was.
pub fn swap_state(state: CheckState) -> CheckState {
    CheckState::from_raw(call(Action::SwapState, state as usize, 0))
}

/// Ask the backend to enter its interactive break state.
pub fn debug_break() {
    call(Action::Debug, 0, 0);
}

// ---------------------------------------------------------------------------
// Test injection
// ---------------------------------------------------------------------------

/// Bind an injected backend for the rest of the process (until cleared).
///
/// Tests use this to observe the exact request stream.
pub fn set_backend_for_tests(backend: &'static dyn Backend) {
    *INJECTED.write() = Some(backend);
    MODE.store(MODE_INJECTED, Ordering::Release);
}

/// Drop the injected backend and fall back to probing on next use.
pub fn clear_backend_for_tests() {
    *INJECTED.write() = None;
    MODE.store(MODE_UNPROBED, Ordering::Release);
}

/// Serializes every test that touches the process-global backend binding
/// or the inert mirror flag, across this crate's test modules.
#[cfg(test)]
pub(crate) static TEST_SERIAL: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    use super::TEST_SERIAL as TEST_LOCK;

    #[test]
    fn inert_backend_translates_identically() {
        let _serial = TEST_LOCK.lock().unwrap();
        clear_backend_for_tests();

        let p = 0x1000 as *mut u8;
        assert_eq!(alloc(p, 0x1050 as *mut u8), p);
        assert_eq!(untag(p), p);
        assert_eq!(dealloc(p), p);
        assert_eq!(check_load(p as *const u8, 16), p as *const u8);
        assert_eq!(check_store(p, 16), p);
    }

    #[test]
    fn inert_swap_returns_previous_state() {
        let _serial = TEST_LOCK.lock().unwrap();
        clear_backend_for_tests();

        // Normalize, then observe both transitions.
        swap_state(CheckState::Enabled);
        assert_eq!(swap_state(CheckState::Disabled), CheckState::Enabled);
        assert_eq!(swap_state(CheckState::Enabled), CheckState::Disabled);
        assert_eq!(swap_state(CheckState::Enabled), CheckState::Enabled);
    }

    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl Backend for CountingBackend {
        fn call(&self, _action: Action, operand0: usize, _operand1: usize) -> usize {
            self.calls.fetch_add(1, Ordering::Relaxed);
            operand0
        }
    }

    #[test]
    fn injected_backend_sees_every_request() {
        let _serial = TEST_LOCK.lock().unwrap();

        let backend: &'static CountingBackend = Box::leak(Box::new(CountingBackend {
            calls: AtomicUsize::new(0),
        }));
        set_backend_for_tests(backend);

        let p = 0x2000 as *mut u8;
        alloc(p, 0x2010 as *mut u8);
        check_load(p as *const u8, 4);
        debug_break();
        assert_eq!(backend.calls.load(Ordering::Relaxed), 3);

        clear_backend_for_tests();
    }
}
