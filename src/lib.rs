//! # MediaIngest - Parallel Media Import Pipeline
//!
//! MediaIngest moves photos, raw captures, videos and their sidecars from
//! a source directory (a memory card, a phone dump, a watch folder) into
//! a content-addressed originals library. Built in Rust for safe
//! concurrency and predictable filesystem behavior.
//!
//! ## Features
//!
//! - **Parallel Import**: A bounded worker pool processes candidates
//!   end-to-end, one file per worker at a time
//! - **Content Classification**: Files are identified by magic bytes,
//!   never by extension alone
//! - **Content-Addressed Dedup**: XXHash3, BLAKE3 or SHA-256 fingerprints
//!   keep byte-identical files from being imported twice
//! - **Atomic Publishing**: Bytes land in a temporary file and appear in
//!   the library only through a rename, fully verified
//! - **Copy or Move**: Sources survive a copy run; a move run removes
//!   them only after a verified publish
//! - **Format Conversion**: Optional external-tool converters rewrite
//!   formats like HEIC during transfer
//! - **Indexer Handoff**: Every published file is announced exactly once
//!   to a pluggable indexer
//!
//! ## Quick Start
//!
//! ```no_run
//! use mediaingest::config::ImportJob;
//! use mediaingest::core::Importer;
//! use std::path::PathBuf;
//!
//! let job = ImportJob {
//!     source: PathBuf::from("/media/card/DCIM"),
//!     originals: PathBuf::from("/photos/originals"),
//!     ..Default::default()
//! };
//!
//! let summary = Importer::new(job).start().unwrap();
//! summary.print_summary();
//! ```
//!
//! ## Advanced Usage
//!
//! ```no_run
//! use mediaingest::config::{FingerprintAlgorithm, ImportJob, TransferMode};
//! use mediaingest::core::Importer;
//! use mediaingest::progress::ProgressReporter;
//! use std::path::PathBuf;
//!
//! let job = ImportJob {
//!     source: PathBuf::from("/media/card/DCIM"),
//!     originals: PathBuf::from("/photos/originals"),
//!     mode: TransferMode::Move,
//!     workers: 8,
//!     fingerprint: FingerprintAlgorithm::Blake3,
//!     ..Default::default()
//! };
//!
//! let importer = Importer::new(job).with_progress(ProgressReporter::new());
//! let cancel = importer.cancellation_flag();
//!
//! // Hand `cancel` to a signal handler, then run
//! let summary = importer.start().unwrap();
//! summary.print_summary();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod config;
pub mod convert;
pub mod core;
pub mod dupes;
pub mod error;
pub mod fs;
pub mod hash;
pub mod indexer;
pub mod progress;

// Re-export commonly used types
pub use config::{FingerprintAlgorithm, ImportJob, TransferMode};
pub use core::{Importer, Outcome, RunSummary};
pub use error::{IngestError, Result};
pub use progress::ProgressReporter;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use mediaingest::prelude::*;
    //! ```

    pub use crate::classify::{Classifier, Destination, MediaKind};
    pub use crate::config::{FingerprintAlgorithm, ImportJob, TransferMode};
    pub use crate::convert::{Converter, ConverterSet};
    pub use crate::core::{Importer, Outcome, RunSummary, SkipReason};
    pub use crate::dupes::{DupeIndex, Verdict};
    pub use crate::error::{IngestError, Result};
    pub use crate::fs::{Candidate, Scanner, ScanPolicy};
    pub use crate::hash::{fingerprint_file, Fingerprint};
    pub use crate::indexer::{IndexEntry, Indexer, LogIndexer};
    pub use crate::progress::ProgressReporter;
}
