//! Pre-run path validation
//!
//! Every check here runs before any file is touched. A failure aborts the
//! whole run; nothing below this layer is allowed to fail fatally.

use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolve and validate the source directory against the library root.
///
/// The returned path is absolute and canonical. Importing the library into
/// itself is rejected, whether the source equals the library root or lies
/// anywhere inside it.
pub fn resolve_source(source: &Path, originals: &Path) -> Result<PathBuf> {
    let absolute = if source.is_absolute() {
        source.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| IngestError::InvalidPath(format!("cannot resolve working directory: {}", e)))?
            .join(source)
    };

    if !absolute.exists() {
        return Err(IngestError::InvalidPath(format!(
            "{} does not exist",
            absolute.display()
        )));
    }
    if !absolute.is_dir() {
        return Err(IngestError::InvalidPath(format!(
            "{} is not a directory",
            absolute.display()
        )));
    }

    let resolved = absolute.canonicalize().map_err(|e| {
        IngestError::InvalidPath(format!("cannot resolve {}: {}", absolute.display(), e))
    })?;

    if let Ok(library) = originals.canonicalize() {
        if resolved == library || resolved.starts_with(&library) {
            return Err(IngestError::ConflictingPaths {
                import_path: resolved,
                originals: library,
            });
        }
    }

    Ok(resolved)
}

/// Check that the library root exists, is a directory, and accepts writes.
pub fn ensure_writable(originals: &Path) -> Result<()> {
    if !originals.exists() {
        return Err(IngestError::InvalidPath(format!(
            "library path {} does not exist",
            originals.display()
        )));
    }
    if !originals.is_dir() {
        return Err(IngestError::InvalidPath(format!(
            "library path {} is not a directory",
            originals.display()
        )));
    }

    // A probe file is the only reliable writability test across filesystems
    match tempfile::Builder::new()
        .prefix(".ingest-probe-")
        .tempfile_in(originals)
    {
        Ok(probe) => {
            drop(probe);
            Ok(())
        }
        Err(_) => Err(IngestError::ReadOnlyDestination(originals.to_path_buf())),
    }
}

/// Available space on the filesystem holding `path`, when resolvable.
pub fn available_space(path: &Path) -> Option<u64> {
    use sysinfo::Disks;

    let disks = Disks::new_with_refreshed_list();

    let path_str = path.to_string_lossy();
    let mut best_match = None;
    let mut best_len = 0;

    for disk in disks.iter() {
        let mount = disk.mount_point().to_string_lossy();
        if path_str.starts_with(mount.as_ref()) && mount.len() > best_len {
            best_match = Some(disk.available_space());
            best_len = mount.len();
        }
    }

    best_match
}

/// Check that the library filesystem can hold the scanned payload.
///
/// Skipped silently when the filesystem cannot be matched to a disk.
pub fn check_space(originals: &Path, required: u64) -> Result<()> {
    match available_space(originals) {
        Some(available) if available < required => Err(IngestError::InsufficientSpace {
            path: originals.to_path_buf(),
            required,
            available,
        }),
        Some(_) => Ok(()),
        None => {
            debug!(
                "Cannot determine free space for {}, skipping preflight",
                originals.display()
            );
            Ok(())
        }
    }
}
