//! Library fingerprint index
//!
//! Tracks which content is already stored so a run never imports the same
//! bytes twice. The index is persisted as a manifest in the library root
//! and rebuilt by hashing the tree when the manifest is missing or stale.
//! Lookups are concurrent; a fingerprint is registered only after its file
//! is durably published.

use crate::classify::Destination;
use crate::config::FingerprintAlgorithm;
use crate::error::{IngestError, Result};
use crate::hash::{fingerprint_file, Fingerprint};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Manifest file kept in the library root
pub const MANIFEST_NAME: &str = ".mediaingest-index.json";

/// A file the library already holds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Library-relative path of the stored file
    pub relative_path: PathBuf,
    /// Stored size in bytes
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LibraryManifest {
    algorithm: FingerprintAlgorithm,
    updated: DateTime<Utc>,
    entries: HashMap<String, IndexedFile>,
}

/// What to do with a candidate whose destination is decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing in the way, transfer to the canonical path
    Proceed,
    /// Identical content is already stored, skip the transfer
    SkipExisting,
    /// Identical content is already stored and the run replaces it
    OverwriteExisting {
        /// Library-relative path of the file to replace
        existing: PathBuf,
    },
    /// The canonical path holds different content, store under a
    /// disambiguated name
    RenameWithSuffix,
}

/// Shared fingerprint index for one run
pub struct DupeIndex {
    originals: PathBuf,
    algorithm: FingerprintAlgorithm,
    entries: DashMap<String, IndexedFile>,
}

impl DupeIndex {
    /// An index that knows of no stored content
    pub fn empty(originals: &Path, algorithm: FingerprintAlgorithm) -> Self {
        Self {
            originals: originals.to_path_buf(),
            algorithm,
            entries: DashMap::new(),
        }
    }

    /// Load the manifest, or rebuild the index by hashing the library.
    ///
    /// Never fails the run: a missing, unreadable, or mismatched manifest
    /// falls back to a rebuild, and an unreadable library file is logged
    /// and left out.
    pub fn load_or_rebuild(originals: &Path, algorithm: FingerprintAlgorithm) -> Self {
        let manifest_path = originals.join(MANIFEST_NAME);

        if manifest_path.exists() {
            match Self::load(originals, &manifest_path, algorithm) {
                Ok(index) => return index,
                Err(e) => {
                    warn!(
                        "Cannot use index manifest {}: {}, rebuilding",
                        manifest_path.display(),
                        e
                    );
                }
            }
        }

        Self::rebuild(originals, algorithm)
    }

    fn load(
        originals: &Path,
        manifest_path: &Path,
        algorithm: FingerprintAlgorithm,
    ) -> Result<Self> {
        let json = std::fs::read_to_string(manifest_path)
            .map_err(|e| IngestError::Manifest(e.to_string()))?;
        let manifest: LibraryManifest = serde_json::from_str(&json)?;

        if manifest.algorithm != algorithm {
            return Err(IngestError::Manifest(format!(
                "manifest uses {}, run uses {}",
                manifest.algorithm.name(),
                algorithm.name()
            )));
        }

        let entries = DashMap::new();
        let mut stale = 0usize;
        for (digest, file) in manifest.entries {
            if originals.join(&file.relative_path).is_file() {
                entries.insert(digest, file);
            } else {
                stale += 1;
            }
        }
        if stale > 0 {
            debug!("Dropped {} stale index entries", stale);
        }

        info!("Loaded library index with {} entries", entries.len());
        Ok(Self {
            originals: originals.to_path_buf(),
            algorithm,
            entries,
        })
    }

    /// Hash every stored file to recover the index
    fn rebuild(originals: &Path, algorithm: FingerprintAlgorithm) -> Self {
        let files: Vec<(PathBuf, PathBuf)> = WalkDir::new(originals)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                !e.file_name()
                    .to_str()
                    .map(|n| n.starts_with('.'))
                    .unwrap_or(false)
            })
            .filter_map(|e| {
                e.path()
                    .strip_prefix(originals)
                    .ok()
                    .map(|rel| (e.path().to_path_buf(), rel.to_path_buf()))
            })
            .collect();

        let entries = DashMap::new();

        if !files.is_empty() {
            info!("Rebuilding library index over {} files", files.len());
            files.par_iter().for_each(|(path, relative)| {
                match fingerprint_file(path, algorithm) {
                    Ok(fp) => {
                        entries.insert(
                            fp.digest,
                            IndexedFile {
                                relative_path: relative.clone(),
                                size: fp.size,
                            },
                        );
                    }
                    Err(e) => {
                        warn!("Cannot index {}: {}", path.display(), e);
                    }
                }
            });
        }

        Self {
            originals: originals.to_path_buf(),
            algorithm,
            entries,
        }
    }

    /// Whether identical content is already stored
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.contains_key(&fingerprint.digest)
    }

    /// The stored file holding this content, if any
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<IndexedFile> {
        self.entries
            .get(&fingerprint.digest)
            .map(|entry| entry.value().clone())
    }

    /// Record newly stored content. Call only after the file is durably
    /// published; lookups see the entry immediately.
    pub fn register(&self, fingerprint: &Fingerprint, relative_path: &Path) {
        self.entries.insert(
            fingerprint.digest.clone(),
            IndexedFile {
                relative_path: relative_path.to_path_buf(),
                size: fingerprint.size,
            },
        );
    }

    /// Decide what a transfer of this destination should do
    pub fn decide(&self, destination: &Destination, overwrite: bool) -> Verdict {
        if let Some(existing) = self.lookup(&destination.fingerprint) {
            if overwrite {
                return Verdict::OverwriteExisting {
                    existing: existing.relative_path,
                };
            }
            return Verdict::SkipExisting;
        }

        // The index can lag the tree; check the canonical path itself
        let target = destination.absolute(&self.originals);
        if target.exists() {
            return match fingerprint_file(&target, self.algorithm) {
                Ok(fp) if fp.matches(&destination.fingerprint) => {
                    self.register(&fp, &destination.relative_path);
                    if overwrite {
                        Verdict::OverwriteExisting {
                            existing: destination.relative_path.clone(),
                        }
                    } else {
                        Verdict::SkipExisting
                    }
                }
                Ok(_) => Verdict::RenameWithSuffix,
                Err(e) => {
                    warn!(
                        "Cannot fingerprint existing {}: {}",
                        target.display(),
                        e
                    );
                    Verdict::RenameWithSuffix
                }
            };
        }

        Verdict::Proceed
    }

    /// Persist the manifest into the library root
    pub fn save(&self) -> Result<()> {
        let manifest = LibraryManifest {
            algorithm: self.algorithm,
            updated: Utc::now(),
            entries: self
                .entries
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        };

        let json = serde_json::to_string_pretty(&manifest)?;
        let manifest_path = self.originals.join(MANIFEST_NAME);
        let temp = tempfile::NamedTempFile::new_in(&self.originals)
            .map_err(|e| IngestError::Manifest(e.to_string()))?;
        std::fs::write(temp.path(), json).map_err(|e| IngestError::Manifest(e.to_string()))?;
        temp.persist(&manifest_path)
            .map_err(|e| IngestError::Manifest(e.to_string()))?;

        debug!(
            "Saved library index with {} entries to {}",
            self.entries.len(),
            manifest_path.display()
        );
        Ok(())
    }

    /// Number of indexed files
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
