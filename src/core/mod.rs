//! Core import engine
//!
//! The run orchestrator, the per-candidate worker pipeline, and the
//! outcome accounting that turns a run into a summary.

mod engine;
mod outcome;
mod worker;

pub use engine::*;
pub use outcome::*;
pub use worker::*;
