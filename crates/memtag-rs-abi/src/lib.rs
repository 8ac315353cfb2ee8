// All extern "C" exports accept raw pointers from C callers; validity is
// the backend's runtime concern, so per-function safety docs would repeat
// the same sentence everywhere.
#![allow(clippy::missing_safety_doc)]
//! # memtag-rs-abi
//!
//! The interposed symbol surface of the tagging runtime. Built as a
//! `cdylib` and loaded ahead of libc by the platform's preload mechanism,
//! it replaces the standard allocator and the bulk memory/string functions
//! with entry points that route through `memtag-rs-core`.
//!
//! ```text
//! host program -> interposed symbol (this crate) -> core tagger / checked op
//!              -> backend validation -> internal primitive or true allocator
//! ```
//!
//! Every export here is a thin delegation; policy lives in the core crate.
//!
//! The modules are compiled out under `cfg(test)`: the exported symbols
//! (`malloc`, `memcpy`, ...) would otherwise shadow the test binary's own
//! allocator and recurse through it.

#[cfg(not(test))]
pub mod malloc_abi;
#[cfg(not(test))]
pub mod startup_abi;
#[cfg(not(test))]
pub mod string_abi;
#[cfg(not(test))]
pub mod wchar_abi;
