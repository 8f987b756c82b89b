//! Canonical library layout
//!
//! Computes the destination-relative path a candidate is stored under.
//! Paths are derived from the file's timestamp plus a fingerprint prefix,
//! so byte-identical content always resolves to the same name.

use crate::classify::MediaKind;
use crate::hash::Fingerprint;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Hex digits of the fingerprint embedded in the canonical filename
const NAME_FP_LEN: usize = 8;

/// Hex digits used when the canonical name is already taken
const ALT_FP_LEN: usize = 16;

/// Where a candidate lands inside the library
#[derive(Debug, Clone)]
pub struct Destination {
    /// Path relative to the library root
    pub relative_path: PathBuf,
    /// Fingerprint of the content that will be stored there
    pub fingerprint: Fingerprint,
    /// Media kind the path was derived for
    pub kind: MediaKind,
}

impl Destination {
    /// Compute the canonical destination for a candidate
    pub fn new(
        kind: MediaKind,
        modified: SystemTime,
        source: &Path,
        fingerprint: Fingerprint,
    ) -> Self {
        let relative_path =
            canonical_relative(kind, modified, source, &fingerprint, NAME_FP_LEN);
        Self {
            relative_path,
            fingerprint,
            kind,
        }
    }

    /// Absolute path under the given library root
    pub fn absolute(&self, originals: &Path) -> PathBuf {
        originals.join(&self.relative_path)
    }

    /// Alternative destination with a longer fingerprint suffix
    pub fn disambiguated(&self, modified: SystemTime, source: &Path) -> Self {
        let relative_path =
            canonical_relative(self.kind, modified, source, &self.fingerprint, ALT_FP_LEN);
        Self {
            relative_path,
            fingerprint: self.fingerprint.clone(),
            kind: self.kind,
        }
    }

    /// Same destination with a different file extension.
    ///
    /// Used when a converter rewrites the payload into another format.
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            relative_path: self.relative_path.with_extension(extension),
            fingerprint: self.fingerprint.clone(),
            kind: self.kind,
        }
    }
}

/// Canonical destination-relative path for one file
fn canonical_relative(
    kind: MediaKind,
    modified: SystemTime,
    source: &Path,
    fingerprint: &Fingerprint,
    fp_len: usize,
) -> PathBuf {
    let dt: DateTime<Utc> = modified.into();
    let fp_part = &fingerprint.digest[..fp_len.min(fingerprint.digest.len())];
    let name = format!(
        "{}_{}.{}",
        dt.format("%Y%m%d_%H%M%S"),
        fp_part,
        canonical_extension(source, kind)
    );

    let mut path = PathBuf::new();
    if kind == MediaKind::Sidecar {
        path.push("sidecar");
    }
    path.push(dt.format("%Y").to_string());
    path.push(dt.format("%m").to_string());
    path.push(name);
    path
}

/// Normalized lowercase extension for the stored file
pub fn canonical_extension(source: &Path, kind: MediaKind) -> String {
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("jpeg") => "jpg".to_string(),
        Some("tiff") => "tif".to_string(),
        Some("mpeg") => "mpg".to_string(),
        Some(e) if !e.is_empty() => e.to_string(),
        _ => kind.default_extension().to_string(),
    }
}
