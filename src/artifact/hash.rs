//! Content-addressed artifact checks
//!
//! A missing file is an ordinary outcome (the build may have stopped
//! early). Any other I/O failure is reported as `HashError`.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Result of comparing one file against its expected digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashCheck {
    /// Digest equals the expected value
    Match,
    /// File exists but its digest differs
    Mismatch { expected: String, actual: String },
    /// File does not exist
    Missing,
}

impl HashCheck {
    pub fn is_match(&self) -> bool {
        matches!(self, HashCheck::Match)
    }

    /// Human-readable diagnostic for reports
    pub fn detail(&self) -> String {
        match self {
            HashCheck::Match => "Match".to_string(),
            HashCheck::Mismatch { expected, actual } => format!(
                "Hash mismatch:\n  Expected: {}\n  Got:      {}",
                expected, actual
            ),
            HashCheck::Missing => "file not found".to_string(),
        }
    }
}

/// Fatal read failure on an existing file
#[derive(Debug, thiserror::Error)]
#[error("failed to read {path}: {source}")]
pub struct HashError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// SHA-256 of a file's raw bytes, lowercase hex
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Compare a file's digest to `expected`.
///
/// Both sides are compared as lowercase hex.
pub fn verify_hash(path: &Path, expected: &str) -> Result<HashCheck, HashError> {
    let actual = match sha256_file(path) {
        Ok(actual) => actual,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashCheck::Missing),
        Err(source) => {
            return Err(HashError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let expected = expected.trim().to_ascii_lowercase();
    if actual == expected {
        Ok(HashCheck::Match)
    } else {
        Ok(HashCheck::Mismatch { expected, actual })
    }
}
