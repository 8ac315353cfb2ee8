//! Process startup interposition.
//!
//! The runtime must be initialized before the host program's first
//! intercepted call and before its own startup logic. Interposing
//! `__libc_start_main` achieves both: the dynamic loader binds it to this
//! definition, which initializes the runtime and then delegates to the
//! host's real startup entry.

use std::ffi::{c_char, c_int, c_void};

use memtag_rs_core::alloc::hostlibc;
use memtag_rs_oracle::diag;

type MainFn = unsafe extern "C" fn(c_int, *mut *mut c_char, *mut *mut c_char) -> c_int;
type HookFn = unsafe extern "C" fn();
type StartMainFn = unsafe extern "C" fn(
    Option<MainFn>,
    c_int,
    *mut *mut c_char,
    Option<HookFn>,
    Option<HookFn>,
    Option<HookFn>,
    *mut c_void,
) -> c_int;

/// Initialize the runtime: resolve the true-allocator capability and read
/// the diagnostics toggle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __memtag_rust_init() {
    hostlibc::init();
    let _ = memtag_rs_oracle::config::diagnostics_enabled();
    diag!("runtime initialised");
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn __libc_start_main(
    main: Option<MainFn>,
    argc: c_int,
    ubp_av: *mut *mut c_char,
    init: Option<HookFn>,
    fini: Option<HookFn>,
    rtld_fini: Option<HookFn>,
    stack_end: *mut c_void,
) -> c_int {
    // SAFETY: RTLD_NEXT skips this definition and finds the host libc's.
    let sym = unsafe { libc::dlsym(libc::RTLD_NEXT, c"__libc_start_main".as_ptr()) };
    if sym.is_null() {
        // Without the real startup entry the process cannot run at all.
        std::process::abort();
    }
    // SAFETY: the host symbol carries exactly this ABI.
    let host_start: StartMainFn = unsafe { std::mem::transmute(sym) };

    // SAFETY: single-threaded here; nothing has run yet.
    unsafe { __memtag_rust_init() };

    // SAFETY: forwards the untouched startup arguments to the host entry.
    unsafe { host_start(main, argc, ubp_av, init, fini, rtld_fini, stack_end) }
}
