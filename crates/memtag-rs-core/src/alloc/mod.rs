//! Allocation bookkeeping: bootstrap arena, true-allocator capability, and
//! the tagger that fronts both.

pub mod arena;
pub mod header;
pub mod hostlibc;
pub mod tagger;
