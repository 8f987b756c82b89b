//! Content-based media detection
//!
//! Sniffs leading bytes to identify the real file type, falling back to
//! the extension table only when the content is inconclusive. A file whose
//! content identifies as a known non-media type is never imported, no
//! matter what its name claims.

use crate::classify::MediaKind;
use crate::error::{IngestError, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Leading bytes read for content sniffing
const SNIFF_LEN: usize = 8192;

/// Raw formats reported with a vendor MIME type
const RAW_MIMES: &[&str] = &[
    "image/x-canon-cr2",
    "image/x-canon-cr3",
    "image/x-canon-crw",
    "image/x-nikon-nef",
    "image/x-sony-arw",
    "image/x-olympus-orf",
    "image/x-panasonic-rw2",
    "image/x-fujifilm-raf",
    "image/x-adobe-dng",
];

/// Camera raw extensions (TIFF-based raws sniff as plain TIFF)
const RAW_EXTENSIONS: &[&str] = &[
    "cr2", "cr3", "crw", "nef", "nrw", "arw", "srf", "sr2", "orf", "rw2", "raf", "pef", "ptx",
    "rwl", "dcs", "x3f", "mef", "iiq", "cap", "3fr", "fff", "dcr", "k25", "kdc", "dng", "raw",
];

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff", "webp", "heic", "heif", "avif", "jxl",
    "psd",
];

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "webm", "wmv", "flv", "mpg", "mpeg", "3gp", "mts", "m2ts",
    "hevc",
];

const SIDECAR_EXTENSIONS: &[&str] = &["xmp", "yml", "yaml", "json", "aae", "thm"];

/// Assigns a media kind to candidate files
#[derive(Debug, Clone, Default)]
pub struct Classifier;

impl Classifier {
    /// Create a new classifier
    pub fn new() -> Self {
        Self
    }

    /// Classify a file by content, with extension fallback
    pub fn classify(&self, path: &Path) -> Result<MediaKind> {
        let mut file = File::open(path)
            .map_err(|e| IngestError::classification(path, format!("cannot open: {}", e)))?;

        let mut buffer = vec![0u8; SNIFF_LEN];
        let mut filled = 0;
        while filled < buffer.len() {
            let n = file
                .read(&mut buffer[filled..])
                .map_err(|e| IngestError::classification(path, format!("cannot read: {}", e)))?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buffer.truncate(filled);

        if buffer.is_empty() {
            return Err(IngestError::classification(path, "empty file"));
        }

        if let Some(kind) = Self::sniff(&buffer, path) {
            debug!("Classified {} as {} by content", path.display(), kind);
            return Ok(kind);
        }

        let kind = Self::by_extension(path);
        debug!("Classified {} as {} by extension", path.display(), kind);
        Ok(kind)
    }

    /// Identify content via magic bytes
    fn sniff(buffer: &[u8], path: &Path) -> Option<MediaKind> {
        let detected = infer::get(buffer)?;

        match detected.matcher_type() {
            infer::MatcherType::Image => {
                if RAW_MIMES.contains(&detected.mime_type()) {
                    Some(MediaKind::Raw)
                } else if detected.mime_type() == "image/tiff" && Self::has_raw_extension(path) {
                    // NEF/ARW/DNG are TIFF containers; the extension names the subtype
                    Some(MediaKind::Raw)
                } else {
                    Some(MediaKind::Photo)
                }
            }
            infer::MatcherType::Video => Some(MediaKind::Video),
            _ => Some(MediaKind::Unsupported),
        }
    }

    /// Extension fallback for content the sniffer does not recognize
    fn by_extension(path: &Path) -> MediaKind {
        let ext = match path.extension().and_then(|e| e.to_str()) {
            Some(e) => e.to_lowercase(),
            None => return MediaKind::Unsupported,
        };

        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Photo
        } else if RAW_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Raw
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Video
        } else if SIDECAR_EXTENSIONS.contains(&ext.as_str()) {
            MediaKind::Sidecar
        } else {
            MediaKind::Unsupported
        }
    }

    fn has_raw_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| RAW_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false)
    }
}
