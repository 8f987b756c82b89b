//! Source tree discovery
//!
//! Walks the source directory and produces import candidates, applying the
//! exclusion policy as it goes. A library root nested inside the source is
//! never descended into. Unreadable branches and symlink cycles are
//! recorded as skips, not errors; discovery alone never aborts a run.

use crate::error::{IngestError, IoResultExt, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::debug;
use walkdir::WalkDir;

/// One discovered source file awaiting classification and transfer
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Absolute path of the source file
    pub path: PathBuf,
    /// Path relative to the scanned root
    pub relative_path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Modification time
    pub modified: SystemTime,
}

impl Candidate {
    /// Build a candidate from a file path under the scan root
    pub fn from_path(path: &Path, root: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path).with_path(path)?;
        let modified = metadata.modified().with_path(path)?;
        let relative_path = path
            .strip_prefix(root)
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|_| PathBuf::from(path.file_name().unwrap_or_default()));

        Ok(Self {
            path: path.to_path_buf(),
            relative_path,
            size: metadata.len(),
            modified,
        })
    }
}

/// Why discovery set a file aside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanSkipCause {
    /// Symlink cycle detected on this branch
    Cycle,
    /// Entry or its metadata could not be read
    Unreadable,
}

impl std::fmt::Display for ScanSkipCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cycle => write!(f, "symlink cycle"),
            Self::Unreadable => write!(f, "unreadable"),
        }
    }
}

/// A path discovery could not turn into a candidate
#[derive(Debug, Clone)]
pub struct SkippedEntry {
    /// The offending path
    pub path: PathBuf,
    /// Why it was set aside
    pub cause: ScanSkipCause,
}

/// Exclusion policy for one scan
#[derive(Debug, Clone, Default)]
pub struct ScanPolicy {
    /// Follow symbolic links
    pub follow_symlinks: bool,
    /// Include hidden files and directories
    pub include_hidden: bool,
    /// Glob patterns to exclude
    pub exclude_patterns: Vec<String>,
    /// Subtree that is never descended into (the library root, if nested)
    pub skip_root: Option<PathBuf>,
}

/// Result of scanning a source tree
#[derive(Debug)]
pub struct ScanReport {
    /// Scanned root
    pub root: PathBuf,
    /// Files eligible for import
    pub candidates: Vec<Candidate>,
    /// Total candidate payload in bytes
    pub total_size: u64,
    /// Entries set aside with a reportable cause
    pub skipped: Vec<SkippedEntry>,
    /// Entries dropped by the exclusion policy
    pub pruned: u64,
    /// Time taken to scan
    pub scan_duration: Duration,
}

/// Source tree scanner
pub struct Scanner {
    policy: ScanPolicy,
    exclude: Option<GlobSet>,
}

impl Scanner {
    /// Create a scanner, compiling the exclusion globs
    pub fn new(policy: ScanPolicy) -> Result<Self> {
        let exclude = if policy.exclude_patterns.is_empty() {
            None
        } else {
            let mut builder = GlobSetBuilder::new();
            for pattern in &policy.exclude_patterns {
                let glob = Glob::new(pattern).map_err(|e| {
                    IngestError::config(format!("invalid exclude pattern '{}': {}", pattern, e))
                })?;
                builder.add(glob);
            }
            let set = builder
                .build()
                .map_err(|e| IngestError::config(format!("cannot build exclude set: {}", e)))?;
            Some(set)
        };

        Ok(Self { policy, exclude })
    }

    /// Walk the source tree and collect candidates
    pub fn scan(&self, root: &Path) -> Result<ScanReport> {
        let start = Instant::now();

        let skip_root = self
            .policy
            .skip_root
            .as_ref()
            .and_then(|p| p.canonicalize().ok());

        let pruned = Cell::new(0u64);
        let mut candidates = Vec::new();
        let mut skipped = Vec::new();
        let mut total_size = 0u64;

        let walker = WalkDir::new(root)
            .follow_links(self.policy.follow_symlinks)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if self.is_excluded(entry.path(), root, entry.file_type().is_dir(), skip_root.as_deref()) {
                    pruned.set(pruned.get() + 1);
                    return false;
                }
                true
            });

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if !entry.file_type().is_file() {
                        continue;
                    }
                    match Candidate::from_path(entry.path(), root) {
                        Ok(candidate) => {
                            total_size += candidate.size;
                            candidates.push(candidate);
                        }
                        Err(e) => {
                            debug!("Cannot stat {}: {}", entry.path().display(), e);
                            skipped.push(SkippedEntry {
                                path: entry.path().to_path_buf(),
                                cause: ScanSkipCause::Unreadable,
                            });
                        }
                    }
                }
                Err(err) => {
                    let cause = if err.loop_ancestor().is_some() {
                        ScanSkipCause::Cycle
                    } else {
                        ScanSkipCause::Unreadable
                    };
                    let path = err
                        .path()
                        .map(|p| p.to_path_buf())
                        .unwrap_or_else(|| root.to_path_buf());
                    debug!("Scan skip at {}: {}", path.display(), err);
                    skipped.push(SkippedEntry { path, cause });
                }
            }
        }

        Ok(ScanReport {
            root: root.to_path_buf(),
            candidates,
            total_size,
            skipped,
            pruned: pruned.get(),
            scan_duration: start.elapsed(),
        })
    }

    fn is_excluded(&self, path: &Path, root: &Path, is_dir: bool, skip_root: Option<&Path>) -> bool {
        if !self.policy.include_hidden && is_hidden(path) {
            return true;
        }

        if is_dir {
            if let Some(skip) = skip_root {
                if path.canonicalize().map(|p| p == skip).unwrap_or(false) {
                    return true;
                }
            }
        }

        if let Some(exclude) = &self.exclude {
            let relative = path.strip_prefix(root).unwrap_or(path);
            if exclude.is_match(relative) {
                return true;
            }
        }

        false
    }
}

/// Check if a path is hidden (starts with a dot)
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
