//! Import engine
//!
//! Orchestrates one run end to end: validate paths, discover candidates,
//! fan the work out to a bounded pool, settle every outcome into a
//! summary. Per-file failures never abort the run; only pre-run path and
//! space validation is fatal.

use crate::classify::Classifier;
use crate::config::{ImportJob, TransferMode};
use crate::convert::ConverterSet;
use crate::core::worker::process_candidate;
use crate::core::{Outcome, OutcomeSink, RunSummary, SkipReason};
use crate::dupes::DupeIndex;
use crate::error::{IoResultExt, Result};
use crate::fs::{
    check_space, ensure_writable, prune_empty_dirs, resolve_source, Candidate, ScanPolicy,
    ScanSkipCause, Scanner, TransferOptions, Transferrer,
};
use crate::indexer::{Indexer, LogIndexer};
use crate::progress::ProgressReporter;
use crossbeam::channel::bounded;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Per-run dependency context, constructed once by the engine and passed
/// by reference to every worker
#[derive(Clone, Copy)]
pub struct Services<'run> {
    /// Job configuration, read-only for the whole run
    pub job: &'run ImportJob,
    /// Resolved library root
    pub originals: &'run Path,
    /// Content classifier
    pub classifier: &'run Classifier,
    /// Shared fingerprint index
    pub dupes: &'run DupeIndex,
    /// Transfer engine
    pub transferrer: &'run Transferrer,
    /// Registered format converters
    pub converters: &'run ConverterSet,
    /// Indexer that receives each published file
    pub indexer: &'run dyn Indexer,
    /// Run-scoped cancellation flag
    pub cancelled: &'run AtomicBool,
}

/// Media import engine
pub struct Importer {
    job: ImportJob,
    indexer: Box<dyn Indexer>,
    converters: ConverterSet,
    progress: Option<ProgressReporter>,
    cancelled: Arc<AtomicBool>,
}

impl Importer {
    /// Create an importer for one job
    pub fn new(job: ImportJob) -> Self {
        let converters = if job.convert {
            ConverterSet::with_defaults()
        } else {
            ConverterSet::empty()
        };

        Self {
            job,
            indexer: Box::new(LogIndexer),
            converters,
            progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replace the indexer receiving published files
    pub fn with_indexer(mut self, indexer: Box<dyn Indexer>) -> Self {
        self.indexer = indexer;
        self
    }

    /// Replace the converter set
    pub fn with_converters(mut self, converters: ConverterSet) -> Self {
        self.converters = converters;
        self
    }

    /// Set progress reporter
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Get cancellation flag for external control
    pub fn cancellation_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Run the import and settle every candidate into an outcome.
    ///
    /// Returns a summary even when the run is cancelled; an `Err` means
    /// pre-run validation failed and nothing was touched.
    pub fn start(&self) -> Result<RunSummary> {
        let start_time = Instant::now();

        // Pre-run validation, the only fatal failures
        let source = resolve_source(&self.job.source, &self.job.originals)?;
        ensure_writable(&self.job.originals)?;
        let originals = self
            .job
            .originals
            .canonicalize()
            .with_path(&self.job.originals)?;

        let verb = match self.job.mode {
            TransferMode::Copy => "copying",
            TransferMode::Move => "moving",
        };
        info!(
            "{} media files from {} to {}",
            verb,
            source.display(),
            originals.display()
        );

        if let Some(progress) = &self.progress {
            progress.set_status("Scanning source...");
        }

        let scanner = Scanner::new(ScanPolicy {
            follow_symlinks: self.job.follow_symlinks,
            include_hidden: self.job.include_hidden,
            exclude_patterns: self.job.exclude_patterns.clone(),
            skip_root: Some(originals.clone()),
        })?;
        let report = scanner.scan(&source)?;

        check_space(&originals, report.total_size)?;

        let sink = OutcomeSink::new();

        // Entries discovery had to set aside still get an outcome each
        for skipped in &report.skipped {
            let reason = match skipped.cause {
                ScanSkipCause::Cycle => SkipReason::Cycle,
                ScanSkipCause::Unreadable => SkipReason::Unreadable,
            };
            sink.record(Outcome::Skipped {
                path: skipped.path.clone(),
                reason,
            });
        }

        if report.candidates.is_empty() {
            info!("found no media files to import");
            if let Some(progress) = &self.progress {
                progress.finish_success("nothing to import");
            }
            return Ok(sink.summary(start_time.elapsed()));
        }

        info!(
            "found {} media files ({}) in {:.2?}",
            report.candidates.len(),
            humansize::format_size(report.total_size, humansize::BINARY),
            report.scan_duration
        );

        if let Some(progress) = &self.progress {
            progress.set_total_files(report.candidates.len() as u64);
            progress.set_total_bytes(report.total_size);
            progress.set_status("Loading library index...");
        }

        let dupes = DupeIndex::load_or_rebuild(&originals, self.job.fingerprint);

        let transferrer = Transferrer::new(
            TransferOptions {
                mmap_threshold: self.job.mmap_threshold,
                ..Default::default()
            },
            self.job.mode,
            Arc::clone(&self.cancelled),
        );
        let classifier = Classifier::new();

        let services = Services {
            job: &self.job,
            originals: &originals,
            classifier: &classifier,
            dupes: &dupes,
            transferrer: &transferrer,
            converters: &self.converters,
            indexer: self.indexer.as_ref(),
            cancelled: &self.cancelled,
        };

        let workers = self.job.effective_workers();
        info!("dispatching {} workers", workers);

        let (tx, rx) = bounded::<Candidate>(workers * 2);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let rx = rx.clone();
                let services = &services;
                let sink = &sink;
                let progress = &self.progress;

                scope.spawn(move || loop {
                    match rx.recv_timeout(Duration::from_millis(100)) {
                        Ok(candidate) => {
                            if let Some(p) = progress {
                                p.set_current_file(&candidate.relative_path.to_string_lossy());
                            }

                            let outcome = process_candidate(services, &candidate);

                            if let Some(p) = progress {
                                match &outcome {
                                    Outcome::Imported { bytes, .. } => p.record_imported(*bytes),
                                    Outcome::IndexPending { bytes, .. } => p.record_imported(*bytes),
                                    Outcome::Skipped { .. } => p.record_skipped(),
                                    Outcome::Failed { .. } => p.record_failed(),
                                }
                            }

                            sink.record(outcome);
                        }
                        Err(crossbeam::channel::RecvTimeoutError::Timeout) => continue,
                        Err(crossbeam::channel::RecvTimeoutError::Disconnected) => break,
                    }
                });
            }

            // Dispatch stops on cancellation; undelivered candidates are
            // still accounted for
            for candidate in report.candidates {
                if self.is_cancelled() {
                    sink.record(Outcome::Skipped {
                        path: candidate.path,
                        reason: SkipReason::Cancelled,
                    });
                    continue;
                }
                if tx.send(candidate).is_err() {
                    break;
                }
            }
            drop(tx);
        });

        if let Err(e) = dupes.save() {
            warn!("Cannot save library index: {}", e);
        }

        if self.job.mode == TransferMode::Move
            && self.job.prune_empty_dirs
            && !self.is_cancelled()
        {
            let removed = prune_empty_dirs(&source);
            if removed > 0 {
                info!("removed {} empty source directories", removed);
            }
        }

        let elapsed = start_time.elapsed();

        if let Some(progress) = &self.progress {
            if self.is_cancelled() {
                progress.finish_error("import cancelled");
            } else {
                progress.finish_success("import complete");
            }
        }

        info!("import completed in {:.2?}", elapsed);

        Ok(sink.summary(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{IngestError, Result as IngestResult};
    use crate::indexer::IndexEntry;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use walkdir::WalkDir;

    // Valid JPEG magic with distinct tails for distinct fingerprints
    fn jpeg(tail: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00];
        bytes.extend_from_slice(tail);
        bytes
    }

    fn job(source: &Path, library: &Path) -> ImportJob {
        ImportJob {
            source: source.to_path_buf(),
            originals: library.to_path_buf(),
            workers: 2,
            ..Default::default()
        }
    }

    fn media_files(root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                !e.file_name()
                    .to_str()
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect()
    }

    struct RefusingIndexer;

    impl Indexer for RefusingIndexer {
        fn index(&self, entry: &IndexEntry) -> IngestResult<()> {
            Err(IngestError::handoff(&entry.dest, "indexer offline"))
        }
    }

    /// Requests cancellation as soon as the first file has been handed off
    struct CancellingIndexer {
        cancel: Arc<AtomicBool>,
    }

    impl Indexer for CancellingIndexer {
        fn index(&self, _entry: &IndexEntry) -> IngestResult<()> {
            self.cancel.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_worked_example() {
        let staging = TempDir::new().unwrap();
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        // b.jpg is already in the library from an earlier run
        std::fs::write(staging.path().join("b.jpg"), jpeg(b"bravo")).unwrap();
        Importer::new(job(staging.path(), library.path()))
            .start()
            .unwrap();

        std::fs::write(source.path().join("a.jpg"), jpeg(b"alpha")).unwrap();
        std::fs::write(source.path().join("b.jpg"), jpeg(b"bravo")).unwrap();
        // Raw extension, photo content; content wins
        std::fs::write(source.path().join("c.raw"), jpeg(b"charlie")).unwrap();

        let summary = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();

        assert_eq!(summary.imported, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert!(summary.is_clean());
        assert_eq!(media_files(library.path()).len(), 3);
    }

    #[test]
    fn test_rerun_imports_nothing() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        std::fs::write(source.path().join("a.jpg"), jpeg(b"one")).unwrap();
        std::fs::write(source.path().join("b.jpg"), jpeg(b"two")).unwrap();

        let first = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();
        assert_eq!(first.imported, 2);

        let second = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped, 2);
        assert_eq!(media_files(library.path()).len(), 2);
    }

    #[test]
    fn test_source_duplicates_collapse_to_one_file() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            std::fs::write(source.path().join(name), jpeg(b"same bytes")).unwrap();
        }

        let summary = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(media_files(library.path()).len(), 1);
    }

    #[test]
    fn test_unsupported_and_sidecars_are_skipped() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        std::fs::write(source.path().join("photo.jpg"), jpeg(b"real")).unwrap();
        // MP3 magic behind a photo extension
        std::fs::write(source.path().join("song.jpg"), [0x49, 0x44, 0x33, 0x04, 0x00]).unwrap();
        std::fs::write(source.path().join("photo.xmp"), b"<x:xmpmeta/>").unwrap();

        let summary = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(media_files(library.path()).len(), 1);
    }

    #[test]
    fn test_single_failure_does_not_abort_run() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        std::fs::write(source.path().join("good1.jpg"), jpeg(b"first")).unwrap();
        std::fs::write(source.path().join("good2.jpg"), jpeg(b"second")).unwrap();

        // The poisoned file dates to 2020; a plain file at library/2020
        // makes its destination directory impossible to create
        let poison = source.path().join("poison.jpg");
        std::fs::write(&poison, jpeg(b"third")).unwrap();
        filetime::set_file_mtime(&poison, filetime::FileTime::from_unix_time(1_577_836_800, 0))
            .unwrap();
        std::fs::write(library.path().join("2020"), b"in the way").unwrap();

        let summary = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.imported, 2);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, poison);
    }

    #[test]
    fn test_cancel_before_start_touches_nothing() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        for i in 0..5 {
            std::fs::write(source.path().join(format!("{}.jpg", i)), jpeg(&[i])).unwrap();
        }

        let importer = Importer::new(job(source.path(), library.path()));
        importer.cancel();
        let summary = importer.start().unwrap();

        assert_eq!(summary.imported, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.total(), 5);
        assert!(media_files(library.path()).is_empty());

        // No in-flight temporaries either
        let leftovers: Vec<_> = WalkDir::new(library.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with(".ingest-"))
                    .unwrap_or(false)
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_cancel_mid_run_settles_every_candidate() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        for i in 0..40u8 {
            std::fs::write(source.path().join(format!("{:02}.jpg", i)), jpeg(&[i])).unwrap();
        }

        let importer = Importer::new(job(source.path(), library.path()));
        let cancel = importer.cancellation_flag();
        let summary = importer
            .with_indexer(Box::new(CancellingIndexer { cancel }))
            .start()
            .unwrap();

        // Every dispatched candidate settles into exactly one outcome
        assert_eq!(summary.total(), 40);
        assert!(summary.imported >= 1);
        assert_eq!(summary.imported + summary.skipped, 40);
        assert_eq!(summary.failed, 0);

        // Whatever was published before the cancellation is fully intact
        let published = media_files(library.path());
        assert_eq!(published.len(), summary.imported as usize);
        for file in &published {
            let content = std::fs::read(file).unwrap();
            assert_eq!(content.len(), jpeg(&[0]).len());
            assert_eq!(&content[..2], &[0xFF, 0xD8]);
        }

        // No in-flight temporaries survive the cancellation
        let leftovers: Vec<_> = WalkDir::new(library.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .map(|n| n.starts_with(".ingest-"))
                    .unwrap_or(false)
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_source_inside_library_is_rejected() {
        let library = TempDir::new().unwrap();
        let source = library.path().join("incoming");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("a.jpg"), jpeg(b"trapped")).unwrap();

        let err = Importer::new(job(&source, library.path()))
            .start()
            .unwrap_err();

        assert!(matches!(err, IngestError::ConflictingPaths { .. }));
        assert!(err.is_fatal());
        // Nothing was imported or indexed
        assert_eq!(media_files(library.path()).len(), 1);
    }

    #[test]
    fn test_missing_source_is_rejected() {
        let library = TempDir::new().unwrap();

        let err = Importer::new(job(Path::new("/no/such/directory"), library.path()))
            .start()
            .unwrap_err();

        assert!(matches!(err, IngestError::InvalidPath(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_move_mode_drains_the_source() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        let deep = source.path().join("card/DCIM");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("a.jpg"), jpeg(b"first")).unwrap();
        std::fs::write(source.path().join("b.jpg"), jpeg(b"second")).unwrap();

        let mut move_job = job(source.path(), library.path());
        move_job.mode = TransferMode::Move;

        let summary = Importer::new(move_job).start().unwrap();

        assert_eq!(summary.imported, 2);
        assert_eq!(media_files(library.path()).len(), 2);
        assert!(media_files(source.path()).is_empty());
        // Emptied directories are pruned, the source root stays
        assert!(!source.path().join("card").exists());
        assert!(source.path().exists());
    }

    #[test]
    fn test_overwrite_reimports_known_content() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        std::fs::write(source.path().join("a.jpg"), jpeg(b"payload")).unwrap();

        let first = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();
        assert_eq!(first.imported, 1);

        let mut replace_job = job(source.path(), library.path());
        replace_job.overwrite = true;
        let second = Importer::new(replace_job).start().unwrap();

        assert_eq!(second.imported, 1);
        assert_eq!(second.skipped, 0);
        // Still exactly one stored file
        assert_eq!(media_files(library.path()).len(), 1);
    }

    #[test]
    fn test_failed_handoff_keeps_files_and_counts_pending() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        std::fs::write(source.path().join("a.jpg"), jpeg(b"one")).unwrap();
        std::fs::write(source.path().join("b.jpg"), jpeg(b"two")).unwrap();

        let summary = Importer::new(job(source.path(), library.path()))
            .with_indexer(Box::new(RefusingIndexer))
            .start()
            .unwrap();

        assert_eq!(summary.imported, 0);
        assert_eq!(summary.index_pending, 2);
        assert_eq!(summary.failed, 0);
        assert_eq!(media_files(library.path()).len(), 2);
    }

    #[test]
    fn test_empty_source_reports_zero_counts() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        let summary = Importer::new(job(source.path(), library.path()))
            .start()
            .unwrap();

        assert_eq!(summary.total(), 0);
        assert!(summary.is_clean());
    }

    #[test]
    fn test_excluded_patterns_never_become_candidates() {
        let source = TempDir::new().unwrap();
        let library = TempDir::new().unwrap();

        std::fs::write(source.path().join("keep.jpg"), jpeg(b"keep")).unwrap();
        std::fs::write(source.path().join("drop.tmp.jpg"), jpeg(b"drop")).unwrap();

        let mut filtered = job(source.path(), library.path());
        filtered.exclude_patterns = vec!["*.tmp.jpg".to_string()];

        let summary = Importer::new(filtered).start().unwrap();

        assert_eq!(summary.imported, 1);
        assert_eq!(summary.total(), 1);
        assert_eq!(media_files(library.path()).len(), 1);
    }
}
