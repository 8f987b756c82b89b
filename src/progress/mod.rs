//! Progress reporting module
//!
//! Real-time progress visualization for import runs with per-outcome
//! counters, ETA calculation, and throughput display.

mod reporter;

pub use reporter::*;
