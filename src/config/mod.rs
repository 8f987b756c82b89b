//! Configuration module for MediaIngest
//!
//! Provides CLI argument parsing and the runtime import job
//! derived from it.

mod settings;

pub use settings::*;
