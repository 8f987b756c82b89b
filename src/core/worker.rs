//! Per-candidate pipeline
//!
//! One worker takes a candidate end-to-end: classify, consult the
//! duplicate guard, transfer, hand off to the indexer, report. Stages run
//! strictly in this order and cancellation is honored between them, never
//! inside a write.

use crate::classify::{Destination, MediaKind};
use crate::core::engine::Services;
use crate::core::{Outcome, SkipReason};
use crate::dupes::Verdict;
use crate::error::IngestError;
use crate::fs::{Candidate, TransferOutcome};
use crate::hash::fingerprint_file;
use crate::indexer::IndexEntry;
use std::sync::atomic::Ordering;
use tracing::{debug, warn};

/// Run one candidate through the import pipeline
pub fn process_candidate(services: &Services<'_>, candidate: &Candidate) -> Outcome {
    if services.cancelled.load(Ordering::SeqCst) {
        return Outcome::Skipped {
            path: candidate.path.clone(),
            reason: SkipReason::Cancelled,
        };
    }

    let kind = match services.classifier.classify(&candidate.path) {
        Ok(kind) => kind,
        Err(e) => {
            debug!("Cannot classify {}: {}", candidate.path.display(), e);
            return Outcome::Skipped {
                path: candidate.path.clone(),
                reason: SkipReason::Unclassifiable,
            };
        }
    };

    if kind == MediaKind::Unsupported {
        debug!("Skipping {}: unsupported content", candidate.path.display());
        return Outcome::Skipped {
            path: candidate.path.clone(),
            reason: SkipReason::Unsupported,
        };
    }

    if kind == MediaKind::Sidecar && !services.job.import_sidecars {
        return Outcome::Skipped {
            path: candidate.path.clone(),
            reason: SkipReason::Sidecar,
        };
    }

    let fingerprint = match fingerprint_file(&candidate.path, services.job.fingerprint) {
        Ok(fp) => fp,
        Err(e) => {
            return Outcome::Failed {
                path: candidate.path.clone(),
                error: e.to_string(),
            };
        }
    };

    let converter = if services.job.convert {
        services.converters.find(kind, &candidate.path)
    } else {
        None
    };

    let mut destination =
        Destination::new(kind, candidate.modified, &candidate.path, fingerprint);
    if let Some(c) = converter {
        destination = destination.with_extension(c.output_extension());
    }

    let mut replace = false;
    match services.dupes.decide(&destination, services.job.overwrite) {
        Verdict::Proceed => {}
        Verdict::SkipExisting => {
            debug!("Skipping {}: already in library", candidate.path.display());
            return Outcome::Skipped {
                path: candidate.path.clone(),
                reason: SkipReason::Duplicate,
            };
        }
        Verdict::OverwriteExisting { existing } => {
            destination.relative_path = existing;
            replace = true;
        }
        Verdict::RenameWithSuffix => {
            destination = destination.disambiguated(candidate.modified, &candidate.path);
            if let Some(c) = converter {
                destination = destination.with_extension(c.output_extension());
            }
        }
    }

    if services.cancelled.load(Ordering::SeqCst) {
        return Outcome::Skipped {
            path: candidate.path.clone(),
            reason: SkipReason::Cancelled,
        };
    }

    let transferred = match services.transferrer.execute(
        candidate,
        &destination,
        services.originals,
        replace,
        converter,
    ) {
        Ok(TransferOutcome::Published(t)) => t,
        Ok(TransferOutcome::AlreadyPresent) => {
            services
                .dupes
                .register(&destination.fingerprint, &destination.relative_path);
            return Outcome::Skipped {
                path: candidate.path.clone(),
                reason: SkipReason::Duplicate,
            };
        }
        Err(IngestError::Cancelled) => {
            return Outcome::Skipped {
                path: candidate.path.clone(),
                reason: SkipReason::Cancelled,
            };
        }
        Err(e) => {
            warn!("Transfer of {} failed: {}", candidate.path.display(), e);
            return Outcome::Failed {
                path: candidate.path.clone(),
                error: e.to_string(),
            };
        }
    };

    // The content is durable; only now may other workers see it
    services
        .dupes
        .register(&destination.fingerprint, &transferred.relative);
    if !transferred.fingerprint.matches(&destination.fingerprint) {
        services
            .dupes
            .register(&transferred.fingerprint, &transferred.relative);
    }

    let entry = IndexEntry {
        dest: transferred.dest.clone(),
        relative_path: transferred.relative.clone(),
        kind,
        fingerprint: transferred.fingerprint.clone(),
        size: transferred.bytes,
        source: candidate.path.clone(),
        modified: candidate.modified,
    };

    // One announcement per file, never retried
    match services.indexer.index(&entry) {
        Ok(()) => Outcome::Imported {
            path: candidate.path.clone(),
            relative: transferred.relative,
            kind,
            bytes: transferred.bytes,
            converted: transferred.converted,
        },
        Err(e) => {
            warn!(
                "{} imported but not indexed: {}",
                transferred.relative.display(),
                e
            );
            Outcome::IndexPending {
                path: candidate.path.clone(),
                relative: transferred.relative,
                kind,
                bytes: transferred.bytes,
                message: e.to_string(),
            }
        }
    }
}
