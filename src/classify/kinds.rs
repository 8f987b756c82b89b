//! Media kind taxonomy
//!
//! The categories the library distinguishes when deciding how a file
//! is stored and indexed.

use serde::{Deserialize, Serialize};

/// Media category assigned to a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Rendered photo formats (JPEG, PNG, HEIC, ...)
    Photo,
    /// Camera raw formats (NEF, CR2, DNG, ...)
    Raw,
    /// Video formats (MP4, MOV, MKV, ...)
    Video,
    /// Metadata sidecar files (XMP, AAE, ...)
    Sidecar,
    /// Content the library does not store
    Unsupported,
}

impl MediaKind {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Raw => "raw",
            Self::Video => "video",
            Self::Sidecar => "sidecar",
            Self::Unsupported => "unsupported",
        }
    }

    /// Check whether this kind is primary media content
    pub fn is_media(&self) -> bool {
        matches!(self, Self::Photo | Self::Raw | Self::Video)
    }

    /// Default extension when the source filename has none
    pub fn default_extension(&self) -> &'static str {
        match self {
            Self::Photo => "jpg",
            Self::Raw => "raw",
            Self::Video => "mp4",
            Self::Sidecar => "dat",
            Self::Unsupported => "bin",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
