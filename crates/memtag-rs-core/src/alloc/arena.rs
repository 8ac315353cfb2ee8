//! Bootstrap allocation arena.
//!
//! Symbol resolution for the true allocator itself allocates (the dynamic
//! loader's lazy resolution takes the heap), so the very first allocation
//! requests arrive before a true allocator exists to serve them. This arena
//! answers that window from a fixed static region with a monotonically
//! increasing offset.
//!
//! Addresses handed out here are never individually reclaimed: `free` on an
//! in-range address is a no-op, and once the true allocator is resolved the
//! arena serves no further requests. Blocks issued during the window stay
//! valid for the life of the process. They are untagged; accesses through
//! them are not validated.

use std::cell::UnsafeCell;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Total bytes available during the bootstrap window.
pub const BOOTSTRAP_CAPACITY: usize = 4096;

/// Natural alignment of every arena block.
pub const BOOTSTRAP_ALIGN: usize = 16;

#[repr(C, align(16))]
struct ArenaStorage(UnsafeCell<[u8; BOOTSTRAP_CAPACITY]>);

// SAFETY: the storage is only ever handed out in disjoint chunks claimed
// through the atomic offset; the bytes themselves are owned by whoever
// received the chunk.
unsafe impl Sync for ArenaStorage {}

static STORAGE: ArenaStorage = ArenaStorage(UnsafeCell::new([0; BOOTSTRAP_CAPACITY]));
static OFFSET: AtomicUsize = AtomicUsize::new(0);

fn base_addr() -> usize {
    STORAGE.0.get() as usize
}

/// Claim `size` bytes (rounded up to [`BOOTSTRAP_ALIGN`]) from the arena.
///
/// Returns null once the claim would exceed capacity; an oversized request
/// is never forwarded anywhere else and consumes nothing.
pub fn bump_alloc(size: usize) -> *mut u8 {
    let Some(rounded) = size
        .checked_add(BOOTSTRAP_ALIGN - 1)
        .map(|s| s & !(BOOTSTRAP_ALIGN - 1))
    else {
        return ptr::null_mut();
    };

    let claim = OFFSET.fetch_update(Ordering::AcqRel, Ordering::Acquire, |offset| {
        let next = offset.checked_add(rounded)?;
        (next <= BOOTSTRAP_CAPACITY).then_some(next)
    });

    match claim {
        Ok(offset) => (base_addr() + offset) as *mut u8,
        Err(_) => ptr::null_mut(),
    }
}

/// Whether `ptr` falls inside the arena's address range.
///
/// The range test is boundary-inclusive: a zero-size block handed out at
/// the very end of the arena still answers true.
pub fn contains(ptr: *const u8) -> bool {
    let addr = ptr as usize;
    addr >= base_addr() && addr <= base_addr() + BOOTSTRAP_CAPACITY
}

/// Bytes between `ptr` and the end of the arena.
///
/// Arena blocks carry no size header, so this is the only upper bound
/// available when one of them is grown through `realloc`.
pub fn span_to_end(ptr: *const u8) -> usize {
    let addr = ptr as usize;
    (base_addr() + BOOTSTRAP_CAPACITY).saturating_sub(addr)
}
