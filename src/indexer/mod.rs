//! Indexer handoff
//!
//! After a file is durably published, it is announced to the indexer
//! exactly once. The announcement is never retried; a failed handoff
//! leaves the file on disk and is reported as pending instead.

use crate::classify::MediaKind;
use crate::error::Result;
use crate::hash::Fingerprint;
use std::path::PathBuf;
use std::time::SystemTime;
use tracing::info;

/// Everything the indexer needs to know about one published file
#[derive(Debug, Clone)]
pub struct IndexEntry {
    /// Absolute path inside the library
    pub dest: PathBuf,
    /// Library-relative path
    pub relative_path: PathBuf,
    /// Detected media kind
    pub kind: MediaKind,
    /// Fingerprint of the stored content
    pub fingerprint: Fingerprint,
    /// Stored size in bytes
    pub size: u64,
    /// Path the file was imported from
    pub source: PathBuf,
    /// Source modification time
    pub modified: SystemTime,
}

/// Receives each published file exactly once
pub trait Indexer: Send + Sync {
    /// Announce one published file. Called at most once per file.
    fn index(&self, entry: &IndexEntry) -> Result<()>;
}

/// Indexer that only logs the announcement
pub struct LogIndexer;

impl Indexer for LogIndexer {
    fn index(&self, entry: &IndexEntry) -> Result<()> {
        info!(
            "Indexed {} ({}, {} bytes)",
            entry.relative_path.display(),
            entry.kind,
            entry.size
        );
        Ok(())
    }
}
