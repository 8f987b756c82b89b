//! Transfer engine
//!
//! Moves one candidate's payload into the library. Bytes land in a
//! temporary file beside the final path and become visible only through an
//! atomic rename, after the content has been verified against the
//! fingerprint computed at classification time. A reader of the library
//! never observes a partially written file.

use crate::classify::Destination;
use crate::config::{FingerprintAlgorithm, TransferMode};
use crate::convert::Converter;
use crate::error::{IngestError, IoResultExt, Result};
use crate::fs::Candidate;
use crate::hash::{fingerprint_file, Fingerprint, StreamingFingerprinter};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Prefix marking in-flight temporary files
const TEMP_PREFIX: &str = ".ingest-";

/// Options for transfer operations
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Buffer size for streamed copies
    pub buffer_size: usize,
    /// File size above which memory mapping is used
    pub mmap_threshold: u64,
    /// Stamp the source mtime onto the published file
    pub preserve_mtime: bool,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            buffer_size: 1024 * 1024, // 1MB
            mmap_threshold: 64 * 1024 * 1024,
            preserve_mtime: true,
        }
    }
}

/// A successfully published transfer
#[derive(Debug, Clone)]
pub struct Transferred {
    /// Absolute published path
    pub dest: PathBuf,
    /// Library-relative published path
    pub relative: PathBuf,
    /// Payload size in bytes
    pub bytes: u64,
    /// Fingerprint of the published payload
    pub fingerprint: Fingerprint,
    /// Whether a converter produced the payload
    pub converted: bool,
    /// Whether an existing library file was replaced
    pub replaced: bool,
}

/// Terminal state of one transfer attempt
#[derive(Debug)]
pub enum TransferOutcome {
    /// Payload is durably published at its destination
    Published(Transferred),
    /// Identical content appeared at the destination first
    AlreadyPresent,
}

enum Publish {
    Done,
    Duplicate,
}

/// Executes single-file transfers with atomic publishing
pub struct Transferrer {
    options: TransferOptions,
    mode: TransferMode,
    cancelled: Arc<AtomicBool>,
}

impl Transferrer {
    /// Create a transferrer for one run
    pub fn new(options: TransferOptions, mode: TransferMode, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            options,
            mode,
            cancelled,
        }
    }

    /// Copy or convert one candidate into the library.
    ///
    /// With `replace` set the destination may be overwritten; otherwise an
    /// occupied destination is compared by content and either treated as
    /// already present or reported as an error.
    pub fn execute(
        &self,
        candidate: &Candidate,
        destination: &Destination,
        originals: &Path,
        replace: bool,
        converter: Option<&dyn Converter>,
    ) -> Result<TransferOutcome> {
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(IngestError::Cancelled);
        }

        let final_path = destination.absolute(originals);
        let parent = final_path
            .parent()
            .ok_or_else(|| {
                IngestError::InvalidPath(format!("{} has no parent", final_path.display()))
            })?
            .to_path_buf();
        std::fs::create_dir_all(&parent).with_path(&parent)?;

        let suffix = destination
            .relative_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default();
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&parent)
            .with_path(&parent)?;

        let (bytes, published_fp, converted) = match converter {
            Some(converter) => {
                converter.convert(&candidate.path, temp.path())?;
                let fp = fingerprint_file(temp.path(), destination.fingerprint.algorithm)?;
                if fp.size == 0 {
                    return Err(IngestError::conversion(
                        &candidate.path,
                        converter.name(),
                        "converter produced an empty file",
                    ));
                }
                (fp.size, fp, true)
            }
            None => {
                let (bytes, fp) =
                    self.copy_and_hash(candidate, &mut temp, destination.fingerprint.algorithm)?;
                // The source must still contain the bytes fingerprinted at
                // classification time; anything else changed under us
                if !fp.matches(&destination.fingerprint) {
                    return Err(IngestError::verification(
                        &candidate.path,
                        destination.fingerprint.digest.clone(),
                        fp.digest,
                    ));
                }
                (bytes, fp, false)
            }
        };

        match self.publish(temp, &final_path, replace, &published_fp)? {
            Publish::Done => {}
            Publish::Duplicate => return Ok(TransferOutcome::AlreadyPresent),
        }

        let on_disk = std::fs::metadata(&final_path).with_path(&final_path)?.len();
        if on_disk != bytes {
            let _ = std::fs::remove_file(&final_path);
            return Err(IngestError::verification(
                &final_path,
                format!("{} bytes", bytes),
                format!("{} bytes", on_disk),
            ));
        }

        if self.options.preserve_mtime {
            let _ = filetime::set_file_mtime(
                &final_path,
                filetime::FileTime::from_system_time(candidate.modified),
            );
        }

        if self.mode == TransferMode::Move {
            if let Err(e) = std::fs::remove_file(&candidate.path) {
                warn!(
                    "Imported {} but cannot remove source: {}",
                    candidate.path.display(),
                    e
                );
            }
        }

        debug!(
            "Published {} -> {} ({} bytes)",
            candidate.path.display(),
            final_path.display(),
            bytes
        );

        Ok(TransferOutcome::Published(Transferred {
            dest: final_path,
            relative: destination.relative_path.clone(),
            bytes,
            fingerprint: published_fp,
            converted,
            replaced: replace,
        }))
    }

    /// Atomic rename into the final name
    fn publish(
        &self,
        temp: NamedTempFile,
        final_path: &Path,
        replace: bool,
        published_fp: &Fingerprint,
    ) -> Result<Publish> {
        if replace {
            temp.persist(final_path)
                .map_err(|e| IngestError::io(final_path, e.error))?;
            return Ok(Publish::Done);
        }

        match temp.persist_noclobber(final_path) {
            Ok(_) => Ok(Publish::Done),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {
                // Another worker may have published identical content first
                match fingerprint_file(final_path, published_fp.algorithm) {
                    Ok(existing) if existing.matches(published_fp) => Ok(Publish::Duplicate),
                    _ => Err(IngestError::io(final_path, e.error)),
                }
            }
            Err(e) => Err(IngestError::io(final_path, e.error)),
        }
    }

    /// Stream the source into the temp file, hashing as it goes
    fn copy_and_hash(
        &self,
        candidate: &Candidate,
        temp: &mut NamedTempFile,
        algorithm: FingerprintAlgorithm,
    ) -> Result<(u64, Fingerprint)> {
        let size = std::fs::metadata(&candidate.path)
            .with_path(&candidate.path)?
            .len();

        if size >= self.options.mmap_threshold {
            match self.copy_mmap(candidate, temp, size, algorithm) {
                Ok(result) => return Ok(result),
                Err(e) => {
                    debug!(
                        "Memory-mapped copy of {} failed ({}), falling back to buffered",
                        candidate.path.display(),
                        e
                    );
                    temp.as_file().set_len(0).with_path(temp.path())?;
                }
            }
        }

        self.copy_buffered(candidate, temp, algorithm)
    }

    /// Buffered copy with streaming hash and cancellation checks
    fn copy_buffered(
        &self,
        candidate: &Candidate,
        temp: &mut NamedTempFile,
        algorithm: FingerprintAlgorithm,
    ) -> Result<(u64, Fingerprint)> {
        let mut reader = File::open(&candidate.path).with_path(&candidate.path)?;
        let temp_path = temp.path().to_path_buf();
        let mut writer = BufWriter::with_capacity(self.options.buffer_size, temp.as_file_mut());
        let mut hasher = StreamingFingerprinter::new(algorithm);
        let mut buffer = vec![0u8; self.options.buffer_size];
        let mut bytes_copied = 0u64;

        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(IngestError::Cancelled);
            }

            let bytes_read = reader
                .read(&mut buffer)
                .map_err(|e| IngestError::io(&candidate.path, e))?;

            if bytes_read == 0 {
                break;
            }

            hasher.process(&buffer[..bytes_read]);
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| IngestError::io(&temp_path, e))?;

            bytes_copied += bytes_read as u64;
        }

        writer.flush().map_err(|e| IngestError::io(&temp_path, e))?;
        drop(writer);

        Ok((bytes_copied, hasher.finalize()))
    }

    /// Memory-mapped copy for large files
    fn copy_mmap(
        &self,
        candidate: &Candidate,
        temp: &mut NamedTempFile,
        size: u64,
        algorithm: FingerprintAlgorithm,
    ) -> Result<(u64, Fingerprint)> {
        use memmap2::{Mmap, MmapMut};

        let src_file = File::open(&candidate.path).with_path(&candidate.path)?;
        temp.as_file().set_len(size).with_path(temp.path())?;

        let src_mmap =
            unsafe { Mmap::map(&src_file) }.map_err(|e| IngestError::io(&candidate.path, e))?;
        let mut dst_mmap =
            unsafe { MmapMut::map_mut(temp.as_file()) }.map_err(|e| IngestError::io(temp.path(), e))?;

        dst_mmap.copy_from_slice(&src_mmap);
        dst_mmap
            .flush()
            .map_err(|e| IngestError::io(temp.path(), e))?;

        let mut hasher = StreamingFingerprinter::new(algorithm);
        hasher.process(&src_mmap);

        Ok((size, hasher.finalize()))
    }
}

/// Remove directories left empty under `root`, bottom-up.
///
/// The root itself is never removed. Returns the number of directories
/// deleted; failures along the way are skipped, not reported.
pub fn prune_empty_dirs(root: &Path) -> usize {
    let mut removed = 0;

    for entry in WalkDir::new(root).contents_first(true) {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = std::fs::read_dir(entry.path())
            .map(|mut i| i.next().is_none())
            .unwrap_or(false);
        if is_empty && std::fs::remove_dir(entry.path()).is_ok() {
            removed += 1;
        }
    }

    removed
}
