//! Configuration settings for MediaIngest
//!
//! Defines all CLI arguments, policy enums, and the runtime import job
//! derived from them.

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// MediaIngest - Parallel media import pipeline
#[derive(Parser, Debug, Clone)]
#[command(name = "mediaingest")]
#[command(author = "MediaIngest Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Copies, converts and indexes media files into a content-addressed library")]
#[command(long_about = r#"
MediaIngest walks a source directory, classifies each file by its content,
skips duplicates already present in the library, and copies or converts the
rest into a canonical date-based layout before handing them to the indexer.

Features:
  - Multi-threaded import with a bounded worker pool
  - Content sniffing (magic bytes) with extension fallback
  - Duplicate detection by content fingerprint (BLAKE3, XXHash3, SHA-256)
  - Atomic publish: files appear in the library only when fully written
  - Per-file failure isolation: one bad file never aborts the run

Examples:
  mediaingest /media/card --library ~/Pictures/library        # Basic import
  mediaingest /media/card -l ~/Pictures/library --move        # Import then remove sources
  mediaingest /media/card -l ~/Pictures/library -w 8 -p       # 8 workers with progress
  mediaingest /media/card -l ~/Pictures/library --overwrite   # Replace known duplicates
"#)]
pub struct CliArgs {
    /// Source directory to import from (falls back to MEDIAINGEST_IMPORT_PATH)
    #[arg(value_name = "SOURCE", env = "MEDIAINGEST_IMPORT_PATH")]
    pub source: Option<String>,

    /// Library root the originals are stored in
    #[arg(short = 'l', long, value_name = "PATH", env = "MEDIAINGEST_LIBRARY")]
    pub library: Option<String>,

    /// Remove source files after a verified transfer
    #[arg(short = 'm', long = "move")]
    pub move_files: bool,

    /// Replace library files whose fingerprint is already known
    #[arg(long)]
    pub overwrite: bool,

    /// Number of worker threads (0 = auto-detect)
    #[arg(short = 'w', long, default_value = "0", value_name = "NUM")]
    pub workers: usize,

    /// Fingerprint algorithm for duplicate detection and verification
    #[arg(long, value_enum, default_value = "blake3", value_name = "ALGO")]
    pub fingerprint: FingerprintAlgorithm,

    /// File size above which memory-mapped copying is used (e.g., 64M)
    #[arg(long, default_value = "64M", value_name = "SIZE")]
    pub mmap_threshold: String,

    /// File pattern to exclude (glob, repeatable)
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Include hidden files
    #[arg(long)]
    pub include_hidden: bool,

    /// Follow symbolic links
    #[arg(short = 'L', long)]
    pub follow_symlinks: bool,

    /// Import sidecar files (XMP, AAE, ...) instead of skipping them
    #[arg(long)]
    pub sidecars: bool,

    /// Convert formats the library does not store natively
    #[arg(long)]
    pub convert: bool,

    /// Show live progress bars
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

/// Fingerprint algorithm for duplicate detection
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintAlgorithm {
    /// XXHash3 - Ultra fast, non-cryptographic (128-bit)
    #[value(name = "xxhash3")]
    XXHash3,
    /// BLAKE3 - Fast and cryptographically secure
    #[default]
    #[value(name = "blake3")]
    Blake3,
    /// SHA-256 - Standard cryptographic hash
    #[value(name = "sha256")]
    Sha256,
}

impl FingerprintAlgorithm {
    /// Get the digest size in bytes
    pub fn digest_size(&self) -> usize {
        match self {
            Self::XXHash3 => 16,
            Self::Blake3 => 32,
            Self::Sha256 => 32,
        }
    }

    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::XXHash3 => "XXHash3",
            Self::Blake3 => "BLAKE3",
            Self::Sha256 => "SHA-256",
        }
    }
}

/// How transferred files leave the source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransferMode {
    /// Copy files, leaving the source untouched
    #[default]
    Copy,
    /// Copy files, then remove verified sources
    Move,
}

/// Runtime configuration for one import run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportJob {
    /// Source directory
    pub source: PathBuf,
    /// Library root (originals store)
    pub originals: PathBuf,
    /// Copy or move semantics
    pub mode: TransferMode,
    /// Replace library files whose fingerprint is already known
    pub overwrite: bool,
    /// Worker thread count (0 = auto)
    pub workers: usize,
    /// Fingerprint algorithm
    pub fingerprint: FingerprintAlgorithm,
    /// Memory-map threshold in bytes
    pub mmap_threshold: u64,
    /// Exclude patterns
    pub exclude_patterns: Vec<String>,
    /// Include hidden files
    pub include_hidden: bool,
    /// Follow symlinks
    pub follow_symlinks: bool,
    /// Import sidecar files instead of skipping them
    pub import_sidecars: bool,
    /// Enable format conversion
    pub convert: bool,
    /// Remove source directories emptied by a move run
    pub prune_empty_dirs: bool,
}

impl Default for ImportJob {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            originals: PathBuf::new(),
            mode: TransferMode::Copy,
            overwrite: false,
            workers: 0, // Auto-detect
            fingerprint: FingerprintAlgorithm::Blake3,
            mmap_threshold: 64 * 1024 * 1024, // 64MB
            exclude_patterns: Vec::new(),
            include_hidden: false,
            follow_symlinks: false,
            import_sidecars: false,
            convert: false,
            prune_empty_dirs: true,
        }
    }
}

impl ImportJob {
    /// Create a job from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, String> {
        let source = args
            .source
            .as_ref()
            .ok_or("Source path required (positional argument or MEDIAINGEST_IMPORT_PATH)")?;
        let originals = args
            .library
            .as_ref()
            .ok_or("Library path required (--library or MEDIAINGEST_LIBRARY)")?;

        let mut job = Self {
            source: PathBuf::from(source),
            originals: PathBuf::from(originals),
            ..Self::default()
        };

        job.mode = if args.move_files {
            TransferMode::Move
        } else {
            TransferMode::Copy
        };
        job.overwrite = args.overwrite;
        job.workers = args.workers;
        job.fingerprint = args.fingerprint;
        job.mmap_threshold = parse_size(&args.mmap_threshold)
            .map_err(|e| format!("Invalid mmap threshold: {}", e))?;
        job.exclude_patterns = args.exclude.clone();
        job.include_hidden = args.include_hidden;
        job.follow_symlinks = args.follow_symlinks;
        job.import_sidecars = args.sidecars;
        job.convert = args.convert;

        Ok(job)
    }

    /// Effective worker count after auto-detection
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            // More workers than cores buys nothing for disk-bound imports
            num_cpus::get().min(16)
        } else {
            self.workers
        }
    }
}

/// Parse human-readable size string to bytes
pub fn parse_size(size: &str) -> Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("TB") || size.ends_with('T') {
        let num = size.trim_end_matches(|c| c == 'T' || c == 'B');
        (num.to_string(), 1024u64 * 1024 * 1024 * 1024)
    } else if size.ends_with("GB") || size.ends_with('G') {
        let num = size.trim_end_matches(|c| c == 'G' || c == 'B');
        (num.to_string(), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        let num = size.trim_end_matches(|c| c == 'M' || c == 'B');
        (num.to_string(), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        let num = size.trim_end_matches(|c| c == 'K' || c == 'B');
        (num.to_string(), 1024u64)
    } else if size.ends_with('B') {
        (size.trim_end_matches('B').to_string(), 1u64)
    } else {
        // Assume bytes if no suffix
        (size.clone(), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    Ok((num * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1KB").unwrap(), 1024);
        assert_eq!(parse_size("64M").unwrap(), 64 * 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(
            parse_size("1.5G").unwrap(),
            (1.5 * 1024.0 * 1024.0 * 1024.0) as u64
        );
        assert!(parse_size("").is_err());
        assert!(parse_size("abc").is_err());
    }

    #[test]
    fn test_fingerprint_algorithm() {
        assert_eq!(FingerprintAlgorithm::XXHash3.digest_size(), 16);
        assert_eq!(FingerprintAlgorithm::Blake3.digest_size(), 32);
        assert_eq!(FingerprintAlgorithm::Sha256.name(), "SHA-256");
    }

    #[test]
    fn test_job_from_cli() {
        let args = CliArgs {
            source: Some("/media/card".to_string()),
            library: Some("/pictures/library".to_string()),
            move_files: true,
            overwrite: false,
            workers: 4,
            fingerprint: FingerprintAlgorithm::Blake3,
            mmap_threshold: "32M".to_string(),
            exclude: vec!["*.tmp".to_string()],
            include_hidden: false,
            follow_symlinks: false,
            sidecars: false,
            convert: false,
            progress: false,
            verbose: 0,
            quiet: false,
        };

        let job = ImportJob::from_cli(&args).unwrap();
        assert_eq!(job.source, PathBuf::from("/media/card"));
        assert_eq!(job.originals, PathBuf::from("/pictures/library"));
        assert_eq!(job.mode, TransferMode::Move);
        assert_eq!(job.workers, 4);
        assert_eq!(job.mmap_threshold, 32 * 1024 * 1024);
        assert_eq!(job.exclude_patterns, vec!["*.tmp".to_string()]);
    }

    #[test]
    fn test_job_requires_library() {
        let args = CliArgs {
            source: Some("/media/card".to_string()),
            library: None,
            move_files: false,
            overwrite: false,
            workers: 0,
            fingerprint: FingerprintAlgorithm::Blake3,
            mmap_threshold: "64M".to_string(),
            exclude: Vec::new(),
            include_hidden: false,
            follow_symlinks: false,
            sidecars: false,
            convert: false,
            progress: false,
            verbose: 0,
            quiet: false,
        };

        assert!(ImportJob::from_cli(&args).is_err());
    }

    #[test]
    fn test_effective_workers() {
        let mut job = ImportJob::default();
        assert!(job.effective_workers() >= 1);

        job.workers = 3;
        assert_eq!(job.effective_workers(), 3);
    }
}
