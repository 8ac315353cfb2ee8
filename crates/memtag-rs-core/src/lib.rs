//! # memtag-rs-core
//!
//! The allocator and library-call layer of the tagging runtime.
//!
//! Three layers, bottom up:
//! - [`alloc`] — the bootstrap arena, the resolved true-allocator
//!   capability, and the allocation tagger that places a private header
//!   before every user block and registers each allocation with the
//!   checking backend.
//! - [`string`] — internal byte-wise reimplementations of the memory and
//!   string primitives. These never call the interposed public names, so
//!   the runtime's own work cannot recurse into itself.
//! - [`checked`] — the access-checked entry points: compute the exact byte
//!   extent a call touches, have the backend validate it, then finish with
//!   an internal primitive.
//!
//! The `extern "C"` symbol surface over this crate lives in
//! `memtag-rs-abi`.

pub mod alloc;
pub mod checked;
pub mod string;
