//! Content fingerprinting for duplicate detection and verification
//!
//! Supports XXHash3 (ultra-fast), BLAKE3 (fast + secure), and SHA-256.
//! All hashers support streaming for single-pass copy-and-hash operations.

use crate::config::FingerprintAlgorithm;
use crate::error::{IngestError, IoResultExt, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Content fingerprint as a lowercase hex digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// The algorithm used
    pub algorithm: FingerprintAlgorithm,
    /// Digest as lowercase hex string
    pub digest: String,
    /// Content size in bytes
    pub size: u64,
}

impl Fingerprint {
    /// Create a new fingerprint
    pub fn new(algorithm: FingerprintAlgorithm, digest: String, size: u64) -> Self {
        Self {
            algorithm,
            digest,
            size,
        }
    }

    /// Check whether another fingerprint identifies the same content
    pub fn matches(&self, other: &Fingerprint) -> bool {
        self.algorithm == other.algorithm && self.digest == other.digest
    }

    /// Short prefix used to disambiguate filenames
    pub fn short(&self) -> &str {
        &self.digest[..8.min(self.digest.len())]
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest)
    }
}

/// Unified hasher over the supported algorithms
pub enum Fingerprinter {
    /// XXHash3 128-bit
    XXHash3(xxhash_rust::xxh3::Xxh3),
    /// BLAKE3
    Blake3(blake3::Hasher),
    /// SHA-256
    Sha256(sha2::Sha256),
}

impl Fingerprinter {
    /// Create a new hasher for the given algorithm
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        match algorithm {
            FingerprintAlgorithm::XXHash3 => Self::XXHash3(xxhash_rust::xxh3::Xxh3::new()),
            FingerprintAlgorithm::Blake3 => Self::Blake3(blake3::Hasher::new()),
            FingerprintAlgorithm::Sha256 => {
                use sha2::Digest;
                Self::Sha256(sha2::Sha256::new())
            }
        }
    }

    /// Get the algorithm this hasher uses
    pub fn algorithm(&self) -> FingerprintAlgorithm {
        match self {
            Self::XXHash3(_) => FingerprintAlgorithm::XXHash3,
            Self::Blake3(_) => FingerprintAlgorithm::Blake3,
            Self::Sha256(_) => FingerprintAlgorithm::Sha256,
        }
    }

    /// Update the hasher with more data
    pub fn update(&mut self, data: &[u8]) {
        match self {
            Self::XXHash3(h) => h.update(data),
            Self::Blake3(h) => {
                h.update(data);
            }
            Self::Sha256(h) => {
                use sha2::Digest;
                h.update(data);
            }
        }
    }

    /// Finalize and get the digest as hex string
    pub fn finalize(self) -> String {
        match self {
            Self::XXHash3(h) => format!("{:032x}", h.digest128()),
            Self::Blake3(h) => h.finalize().to_hex().to_string(),
            Self::Sha256(h) => {
                use sha2::Digest;
                let result = h.finalize();
                hex::encode(result)
            }
        }
    }
}

/// Streaming hasher for copy-and-hash operations
pub struct StreamingFingerprinter {
    hasher: Fingerprinter,
    bytes_processed: u64,
}

impl StreamingFingerprinter {
    /// Create a new streaming hasher
    pub fn new(algorithm: FingerprintAlgorithm) -> Self {
        Self {
            hasher: Fingerprinter::new(algorithm),
            bytes_processed: 0,
        }
    }

    /// Process a chunk of data
    pub fn process(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.bytes_processed += data.len() as u64;
    }

    /// Get bytes processed so far
    pub fn bytes_processed(&self) -> u64 {
        self.bytes_processed
    }

    /// Finalize and get the fingerprint
    pub fn finalize(self) -> Fingerprint {
        let algorithm = self.hasher.algorithm();
        Fingerprint::new(algorithm, self.hasher.finalize(), self.bytes_processed)
    }
}

/// Compute the fingerprint of a file
pub fn fingerprint_file(path: &Path, algorithm: FingerprintAlgorithm) -> Result<Fingerprint> {
    fingerprint_file_with_buffer(path, algorithm, 1024 * 1024) // 1MB buffer
}

/// Compute the fingerprint of a file with custom buffer size
pub fn fingerprint_file_with_buffer(
    path: &Path,
    algorithm: FingerprintAlgorithm,
    buffer_size: usize,
) -> Result<Fingerprint> {
    let file = File::open(path).with_path(path)?;
    let size = file.metadata().with_path(path)?.len();
    let mut reader = BufReader::with_capacity(buffer_size, file);
    let mut hasher = Fingerprinter::new(algorithm);
    let mut buffer = vec![0u8; buffer_size];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| IngestError::io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint::new(algorithm, hasher.finalize(), size))
}

/// Compute the fingerprint of data in memory
pub fn fingerprint_bytes(data: &[u8], algorithm: FingerprintAlgorithm) -> Fingerprint {
    let mut hasher = Fingerprinter::new(algorithm);
    hasher.update(data);
    Fingerprint::new(algorithm, hasher.finalize(), data.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, content: &[u8]) -> std::path::PathBuf {
        let path = dir.join("test.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_fingerprint_algorithms() {
        let data = b"Hello, World!";

        for algorithm in [
            FingerprintAlgorithm::XXHash3,
            FingerprintAlgorithm::Blake3,
            FingerprintAlgorithm::Sha256,
        ] {
            let fp = fingerprint_bytes(data, algorithm);
            assert!(!fp.digest.is_empty());
            assert_eq!(fp.size, data.len() as u64);
            assert_eq!(fp.digest.len(), algorithm.digest_size() * 2);

            // Verify determinism
            let fp2 = fingerprint_bytes(data, algorithm);
            assert!(fp.matches(&fp2));
        }
    }

    #[test]
    fn test_fingerprint_file_matches_memory() {
        let dir = TempDir::new().unwrap();
        let content = b"Test file content for fingerprinting";
        let path = create_test_file(dir.path(), content);

        let file_fp = fingerprint_file(&path, FingerprintAlgorithm::Blake3).unwrap();
        let memory_fp = fingerprint_bytes(content, FingerprintAlgorithm::Blake3);

        assert_eq!(file_fp.digest, memory_fp.digest);
    }

    #[test]
    fn test_different_content_differs() {
        let a = fingerprint_bytes(b"first", FingerprintAlgorithm::Blake3);
        let b = fingerprint_bytes(b"second", FingerprintAlgorithm::Blake3);
        assert!(!a.matches(&b));
    }

    #[test]
    fn test_streaming_fingerprinter() {
        let mut hasher = StreamingFingerprinter::new(FingerprintAlgorithm::Blake3);

        hasher.process(b"Hello, ");
        hasher.process(b"World!");

        let result = hasher.finalize();
        let direct = fingerprint_bytes(b"Hello, World!", FingerprintAlgorithm::Blake3);

        assert_eq!(result.digest, direct.digest);
        assert_eq!(result.size, 13);
    }

    #[test]
    fn test_short_prefix() {
        let fp = fingerprint_bytes(b"abc", FingerprintAlgorithm::Blake3);
        assert_eq!(fp.short().len(), 8);
        assert!(fp.digest.starts_with(fp.short()));
    }

    proptest! {
        #[test]
        fn fingerprint_ignores_chunking(data in prop::collection::vec(any::<u8>(), 0..4096), split in 0usize..4096) {
            let split = split.min(data.len());
            let mut streaming = StreamingFingerprinter::new(FingerprintAlgorithm::XXHash3);
            streaming.process(&data[..split]);
            streaming.process(&data[split..]);

            let whole = fingerprint_bytes(&data, FingerprintAlgorithm::XXHash3);
            prop_assert_eq!(streaming.finalize().digest, whole.digest);
        }
    }
}
