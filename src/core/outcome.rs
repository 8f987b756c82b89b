//! Run reporting
//!
//! Every candidate ends in exactly one outcome. Workers record outcomes
//! concurrently; the sink never drops one, and the final summary is
//! derived once the run settles.

use crate::classify::MediaKind;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Why a candidate was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Identical content is already in the library
    Duplicate,
    /// Content is not a supported media format
    Unsupported,
    /// Sidecar file and the run does not import sidecars
    Sidecar,
    /// The run was cancelled before this candidate was processed
    Cancelled,
    /// Discovery hit a symlink cycle at this path
    Cycle,
    /// The file or its metadata could not be read during discovery
    Unreadable,
    /// Content could not be examined for classification
    Unclassifiable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Duplicate => "duplicate",
            Self::Unsupported => "unsupported",
            Self::Sidecar => "sidecar",
            Self::Cancelled => "cancelled",
            Self::Cycle => "symlink cycle",
            Self::Unreadable => "unreadable",
            Self::Unclassifiable => "unclassifiable",
        };
        write!(f, "{}", s)
    }
}

/// Terminal result for one candidate
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Published into the library and announced to the indexer
    Imported {
        /// Source path
        path: PathBuf,
        /// Library-relative path it was stored under
        relative: PathBuf,
        /// Detected media kind
        kind: MediaKind,
        /// Stored bytes
        bytes: u64,
        /// Whether a converter produced the stored payload
        converted: bool,
    },
    /// Deliberately not transferred
    Skipped {
        /// Source path
        path: PathBuf,
        /// Why it was skipped
        reason: SkipReason,
    },
    /// Transfer was attempted and failed; nothing was published
    Failed {
        /// Source path
        path: PathBuf,
        /// What went wrong
        error: String,
    },
    /// Published into the library but the indexer rejected the handoff.
    /// The file is safe on disk and can be indexed later.
    IndexPending {
        /// Source path
        path: PathBuf,
        /// Library-relative path it was stored under
        relative: PathBuf,
        /// Detected media kind
        kind: MediaKind,
        /// Stored bytes
        bytes: u64,
        /// Indexer error
        message: String,
    },
}

impl Outcome {
    /// Source path this outcome is about
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Imported { path, .. }
            | Self::Skipped { path, .. }
            | Self::Failed { path, .. }
            | Self::IndexPending { path, .. } => path,
        }
    }
}

/// Thread-safe outcome accumulator for one run
#[derive(Debug, Default)]
pub struct OutcomeSink {
    imported: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    index_pending: AtomicU64,
    bytes_imported: AtomicU64,
    outcomes: Mutex<Vec<Outcome>>,
}

impl OutcomeSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outcome. Safe to call from any worker.
    pub fn record(&self, outcome: Outcome) {
        match &outcome {
            Outcome::Imported { bytes, .. } => {
                self.imported.fetch_add(1, Ordering::Relaxed);
                self.bytes_imported.fetch_add(*bytes, Ordering::Relaxed);
            }
            Outcome::Skipped { .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::Failed { .. } => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::IndexPending { bytes, .. } => {
                self.index_pending.fetch_add(1, Ordering::Relaxed);
                self.bytes_imported.fetch_add(*bytes, Ordering::Relaxed);
            }
        }

        // A poisoned lock still holds the list; recover it rather than
        // lose the outcome
        let mut outcomes = match self.outcomes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        outcomes.push(outcome);
    }

    /// Number of outcomes recorded so far
    pub fn len(&self) -> usize {
        match self.outcomes.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all recorded outcomes
    pub fn outcomes(&self) -> Vec<Outcome> {
        match self.outcomes.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Derive the final summary
    pub fn summary(&self, elapsed: Duration) -> RunSummary {
        let failures = self
            .outcomes()
            .into_iter()
            .filter_map(|o| match o {
                Outcome::Failed { path, error } => Some((path, error)),
                _ => None,
            })
            .collect();

        RunSummary {
            imported: self.imported.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            index_pending: self.index_pending.load(Ordering::Relaxed),
            bytes_imported: self.bytes_imported.load(Ordering::Relaxed),
            elapsed,
            failures,
        }
    }
}

/// Final counts for a completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Files imported and indexed
    pub imported: u64,
    /// Files deliberately not transferred
    pub skipped: u64,
    /// Files whose transfer failed
    pub failed: u64,
    /// Files imported but not indexed
    pub index_pending: u64,
    /// Total bytes published
    pub bytes_imported: u64,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Per-file failure details
    pub failures: Vec<(PathBuf, String)>,
}

impl RunSummary {
    /// Total candidates accounted for
    pub fn total(&self) -> u64 {
        self.imported + self.skipped + self.failed + self.index_pending
    }

    /// Whether every candidate either imported or was skipped on purpose
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }

    /// Print summary to console
    pub fn print_summary(&self) {
        println!("\n=== Import Summary ===");
        println!("Imported:    {} files ({})",
            self.imported,
            humansize::format_size(self.bytes_imported, humansize::BINARY));
        println!("Skipped:     {}", self.skipped);
        println!("Failed:      {}", self.failed);
        if self.index_pending > 0 {
            println!("Not indexed: {}", self.index_pending);
        }
        println!("Duration:    {:.2?}", self.elapsed);

        if !self.failures.is_empty() {
            println!("\nFailures:");
            for (path, error) in &self.failures {
                println!("  {} - {}", path.display(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn imported(name: &str, bytes: u64) -> Outcome {
        Outcome::Imported {
            path: PathBuf::from(name),
            relative: PathBuf::from(name),
            kind: MediaKind::Photo,
            bytes,
            converted: false,
        }
    }

    #[test]
    fn test_summary_counts_per_kind() {
        let sink = OutcomeSink::new();

        sink.record(imported("a.jpg", 10));
        sink.record(imported("b.jpg", 20));
        sink.record(Outcome::Skipped {
            path: PathBuf::from("c.jpg"),
            reason: SkipReason::Duplicate,
        });
        sink.record(Outcome::Failed {
            path: PathBuf::from("d.jpg"),
            error: "disk full".to_string(),
        });
        sink.record(Outcome::IndexPending {
            path: PathBuf::from("e.jpg"),
            relative: PathBuf::from("2023/11/e.jpg"),
            kind: MediaKind::Photo,
            bytes: 5,
            message: "indexer offline".to_string(),
        });

        let summary = sink.summary(Duration::from_secs(1));
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.index_pending, 1);
        assert_eq!(summary.bytes_imported, 35);
        assert_eq!(summary.total(), 5);
        assert!(!summary.is_clean());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].1, "disk full");
    }

    #[test]
    fn test_concurrent_recording_drops_nothing() {
        let sink = Arc::new(OutcomeSink::new());
        let threads = 8;
        let per_thread = 200;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        sink.record(imported(&format!("{}-{}.jpg", t, i), 1));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.len(), threads * per_thread);
        let summary = sink.summary(Duration::from_millis(1));
        assert_eq!(summary.imported, (threads * per_thread) as u64);
        assert_eq!(summary.bytes_imported, (threads * per_thread) as u64);
    }

    #[test]
    fn test_clean_run() {
        let sink = OutcomeSink::new();
        sink.record(imported("a.jpg", 5));

        let summary = sink.summary(Duration::from_millis(10));
        assert!(summary.is_clean());
        assert!(summary.failures.is_empty());
    }
}
