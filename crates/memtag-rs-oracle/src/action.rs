//! Wire protocol shared with the checking backend.
//!
//! The backend reserves one syscall-style call number; requests are
//! `(action, operand0, operand1)` and the response is a single pointer-width
//! value. The numeric action values are part of the wire contract and must
//! not be reordered.

/// Reserved call number the backend intercepts.
pub const ORACLE_CALL_NR: libc::c_long = 0x1337;

/// Tag granule in bytes. The backend stores one tag per granule, so every
/// raw allocation is sized in multiples of this.
pub const TAG_GRANULE: usize = 16;

/// Request kinds understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Action {
    /// `(start, end)` registers a half-open byte range as one live
    /// allocation; returns the tagged address for it.
    Alloc = 0,
    /// `(tagged)` invalidates the tag; returns the raw address to hand to
    /// the true deallocator.
    Dealloc = 1,
    /// Signals the backend to enter an interactive break state.
    Debug = 2,
    /// `(new_state)` sets the global checking flag; returns the previous
    /// state.
    SwapState = 3,
    /// `(tagged)` translates to the raw address without invalidating.
    Untag = 4,
    /// `(ptr, len)` validates a read of `[ptr, ptr + len)`; returns the
    /// address to use for the actual read.
    CheckLoad = 5,
    /// `(ptr, len)` validates a write of `[ptr, ptr + len)`; returns the
    /// address to use for the actual write.
    CheckStore = 6,
}

/// Backend checking state, as carried by [`Action::SwapState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum CheckState {
    Enabled = 0,
    Disabled = 1,
}

impl CheckState {
    /// Decodes a state value returned by the backend. Anything nonzero is
    /// treated as disabled.
    #[must_use]
    pub fn from_raw(raw: usize) -> Self {
        if raw == 0 {
            Self::Enabled
        } else {
            Self::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_are_stable() {
        assert_eq!(Action::Alloc as usize, 0);
        assert_eq!(Action::Dealloc as usize, 1);
        assert_eq!(Action::Debug as usize, 2);
        assert_eq!(Action::SwapState as usize, 3);
        assert_eq!(Action::Untag as usize, 4);
        assert_eq!(Action::CheckLoad as usize, 5);
        assert_eq!(Action::CheckStore as usize, 6);
    }

    #[test]
    fn state_values_are_stable() {
        assert_eq!(CheckState::Enabled as usize, 0);
        assert_eq!(CheckState::Disabled as usize, 1);
    }

    #[test]
    fn state_decodes_from_raw() {
        assert_eq!(CheckState::from_raw(0), CheckState::Enabled);
        assert_eq!(CheckState::from_raw(1), CheckState::Disabled);
        assert_eq!(CheckState::from_raw(7), CheckState::Disabled);
    }
}
