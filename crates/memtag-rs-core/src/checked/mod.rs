//! Access-checked entry points.
//!
//! One shape throughout: open a checking-disabled window (the runtime's own
//! loads and stores are not the backend's business), discover the exact
//! byte extents the call will touch, have the backend validate loads before
//! the stores they feed, then finish with an internal primitive using the
//! addresses the backend returned. Result pointers handed back to the
//! caller are always derived from the caller's original (tagged) argument.

pub mod mem;
pub mod str;
pub mod wide;
