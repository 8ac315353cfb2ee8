//! Process-wide diagnostics toggle.
//!
//! Read once from `MEMTAG_RUST_DEBUG` on first use. The flag gates the
//! [`diag!`](crate::diag) trace output only; tagging behavior is identical
//! with it on or off.
//!
//! The read uses a manual atomic state machine instead of `OnceLock`:
//! reading the environment allocates, allocation re-enters this module from
//! inside the interposed `malloc`, and `OnceLock`'s same-thread reentrant
//! initialization deadlocks. The intermediate `READING` state doubles as the
//! reentry answer (diagnostics are simply off while the flag is being read).

use std::cell::Cell;
use std::sync::atomic::{AtomicU8, Ordering};

const UNREAD: u8 = 0;
const READING: u8 = 1;
const ON: u8 = 2;
const OFF: u8 = 3;

static DEBUG_STATE: AtomicU8 = AtomicU8::new(UNREAD);

/// True when `MEMTAG_RUST_DEBUG` asked for diagnostic output.
#[must_use]
pub fn diagnostics_enabled() -> bool {
    match DEBUG_STATE.load(Ordering::Acquire) {
        ON => true,
        OFF | READING => false,
        _ => {
            if DEBUG_STATE
                .compare_exchange(UNREAD, READING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return DEBUG_STATE.load(Ordering::Acquire) == ON;
            }
            let on = std::env::var("MEMTAG_RUST_DEBUG")
                .map(|v| parse_toggle(&v))
                .unwrap_or(false);
            DEBUG_STATE.store(if on { ON } else { OFF }, Ordering::Release);
            on
        }
    }
}

/// Parse the toggle value (case-insensitive).
#[must_use]
pub fn parse_toggle(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

thread_local! {
    static IN_DIAG: Cell<bool> = const { Cell::new(false) };
}

/// Implementation detail of [`diag!`](crate::diag).
///
/// Formatting and writing may allocate, which re-enters the interposed
/// allocator; the thread-local latch drops any diagnostic that would be
/// emitted from inside another one.
#[doc(hidden)]
pub fn emit(args: std::fmt::Arguments<'_>) {
    if !diagnostics_enabled() {
        return;
    }
    IN_DIAG.with(|latch| {
        if latch.get() {
            return;
        }
        latch.set(true);
        eprintln!("[memtag] {args}");
        latch.set(false);
    });
}

/// Trace one runtime event to stderr when `MEMTAG_RUST_DEBUG` is set.
#[macro_export]
macro_rules! diag {
    ($($arg:tt)*) => {
        $crate::config::emit(core::format_args!($($arg)*))
    };
}
