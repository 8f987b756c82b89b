//! Duplicate detection
//!
//! Content-addressed index over the library plus the per-candidate
//! verdict that decides whether a transfer happens at all.

mod index;

pub use index::*;
