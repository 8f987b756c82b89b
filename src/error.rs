//! Error types for MediaIngest
//!
//! This module defines all error types used throughout the import pipeline,
//! separating fatal pre-run validation failures from per-file errors that
//! are recorded in the run summary without aborting the run.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for MediaIngest operations
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        /// Path the operation was acting on
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Source or library path is missing, unreadable, or not a directory
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Source path equals or lies inside the destination library
    #[error("Source '{import_path}' conflicts with library path '{originals}'")]
    ConflictingPaths {
        /// Resolved source directory of the run
        import_path: PathBuf,
        /// Library root it conflicts with
        originals: PathBuf,
    },

    /// Destination library cannot be written to
    #[error("Library path is not writable: {0}")]
    ReadOnlyDestination(PathBuf),

    /// Not enough free space for the scanned payload
    #[error("Insufficient disk space at '{path}': need {required} bytes, have {available} bytes")]
    InsufficientSpace {
        /// Library root the payload was headed for
        path: PathBuf,
        /// Scanned payload in bytes
        required: u64,
        /// Free space on the library filesystem in bytes
        available: u64,
    },

    /// Invalid job configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// File content could not be classified
    #[error("Cannot classify '{path}': {message}")]
    Classification {
        /// Candidate that could not be classified
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Published file does not match its source
    #[error("Verification failed for '{path}': expected {expected}, got {actual}")]
    Verification {
        /// File that failed verification
        path: PathBuf,
        /// Expected size or fingerprint
        expected: String,
        /// Observed size or fingerprint
        actual: String,
    },

    /// External converter failed
    #[error("Conversion of '{path}' via {tool} failed: {message}")]
    Conversion {
        /// Candidate being converted
        path: PathBuf,
        /// Converter that failed
        tool: String,
        /// What went wrong
        message: String,
    },

    /// Indexer rejected a transferred file
    #[error("Indexing handoff failed for '{path}': {message}")]
    Handoff {
        /// Published file the indexer rejected
        path: PathBuf,
        /// Indexer error
        message: String,
    },

    /// Library manifest could not be read or written
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Run stopped by the cancellation token
    #[error("Import cancelled")]
    Cancelled,
}

impl IngestError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a classification error
    pub fn classification(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Classification {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a verification error
    pub fn verification(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Verification {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a conversion error
    pub fn conversion(
        path: impl Into<PathBuf>,
        tool: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Conversion {
            path: path.into(),
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create an indexing handoff error
    pub fn handoff(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Handoff {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if this error aborts the whole run rather than one file
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidPath(_)
                | Self::ConflictingPaths { .. }
                | Self::ReadOnlyDestination(_)
                | Self::InsufficientSpace { .. }
                | Self::Config(_)
        )
    }

    /// Check if this error is a permission issue
    pub fn is_permission_error(&self) -> bool {
        match self {
            Self::ReadOnlyDestination(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::ConflictingPaths {
                import_path: path, ..
            }
            | Self::ReadOnlyDestination(path)
            | Self::InsufficientSpace { path, .. }
            | Self::Classification { path, .. }
            | Self::Verification { path, .. }
            | Self::Conversion { path, .. }
            | Self::Handoff { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for MediaIngest operations
pub type Result<T> = std::result::Result<T, IngestError>;

impl From<std::io::Error> for IngestError {
    fn from(err: std::io::Error) -> Self {
        IngestError::Io {
            path: std::path::PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::Manifest(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| IngestError::io(path, e))
    }
}
