//! Scoped suppression of backend checking.
//!
//! The runtime's own work must be invisible to the backend: calls into the
//! true allocator, header reads, and the byte loops of the internal
//! reimplementations all touch untagged memory that the backend has no
//! business judging. Code wraps those windows in a [`ScopedDisable`] guard,
//! which swaps the backend flag to disabled and restores the *previous*
//! state when dropped, so every exit path (normal return, early `?`, panic
//! unwind) restores correctly.
//!
//! Nesting is tracked per thread: only the outermost guard talks to the
//! backend, inner guards are free.

use std::cell::Cell;

use crate::action::CheckState;
use crate::transport;

thread_local! {
    static DISABLE_DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// While alive, backend checking is off for this thread's window.
pub struct ScopedDisable {
    previous: Option<CheckState>,
}

impl ScopedDisable {
    #[must_use]
    pub fn new() -> Self {
        let outermost = DISABLE_DEPTH.with(|depth| {
            let d = depth.get();
            depth.set(d + 1);
            d == 0
        });
        let previous = outermost.then(|| transport::swap_state(CheckState::Disabled));
        Self { previous }
    }
}

impl Default for ScopedDisable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScopedDisable {
    fn drop(&mut self) {
        DISABLE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
        if let Some(previous) = self.previous {
            transport::swap_state(previous);
        }
    }
}

/// Run `body` with backend checking disabled, restoring the prior state
/// afterwards no matter how `body` exits.
pub fn with_checking_disabled<R>(body: impl FnOnce() -> R) -> R {
    let _guard = ScopedDisable::new();
    body()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TEST_SERIAL as TEST_LOCK;
    use crate::transport::{clear_backend_for_tests, swap_state};

    fn current_state() -> CheckState {
        // Swap to read the flag, then put back what was there.
        let state = swap_state(CheckState::Enabled);
        if state == CheckState::Disabled {
            swap_state(CheckState::Disabled);
        }
        state
    }

    #[test]
    fn guard_restores_on_return() {
        let _serial = TEST_LOCK.lock().unwrap();
        clear_backend_for_tests();
        swap_state(CheckState::Enabled);

        with_checking_disabled(|| {
            assert_eq!(current_state(), CheckState::Disabled);
        });
        assert_eq!(current_state(), CheckState::Enabled);
    }

    #[test]
    fn guard_restores_on_panic() {
        let _serial = TEST_LOCK.lock().unwrap();
        clear_backend_for_tests();
        swap_state(CheckState::Enabled);

        let result = std::panic::catch_unwind(|| {
            with_checking_disabled(|| panic!("backend must not stay disabled"));
        });
        assert!(result.is_err());
        assert_eq!(current_state(), CheckState::Enabled);
    }

    #[test]
    fn nested_guards_restore_outer_state() {
        let _serial = TEST_LOCK.lock().unwrap();
        clear_backend_for_tests();
        swap_state(CheckState::Enabled);

        with_checking_disabled(|| {
            with_checking_disabled(|| {
                assert_eq!(current_state(), CheckState::Disabled);
            });
            // Inner guard must not have re-enabled checking early.
            assert_eq!(current_state(), CheckState::Disabled);
        });
        assert_eq!(current_state(), CheckState::Enabled);
    }
}
