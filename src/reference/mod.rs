//! Reference hash table
//!
//! Parses and validates the table of known-good SHA-256 digests, normally
//! `reference.toml` next to the build script. The table is loaded once at
//! startup and is immutable afterwards.
//!
//! ```toml
//! [hashes]
//! main_exe = "4b8252b65953a02021486406cfcdca1c7670d1d1a8f3cf6e750ef6e360dc3a2f"
//! vr_exe = "..."
//!
//! [overlays]
//! s11d = "..."
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::variant::Variant;

/// Length of a hex-encoded SHA-256 digest
pub const SHA256_HEX_LEN: usize = 64;

/// Expected digests for every verified artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceTable {
    pub main_exe: String,
    pub vr_exe: String,

    /// Overlay name -> digest, shared by all verified variants
    pub overlays: BTreeMap<String, String>,
}

/// On-disk layout: primary digests live under `[hashes]`
#[derive(Debug, Deserialize)]
struct ReferenceFile {
    hashes: PrimaryHashes,
    #[serde(default)]
    overlays: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct PrimaryHashes {
    main_exe: String,
    vr_exe: String,
}

/// Errors that can occur when loading or validating the reference table
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("Reference table not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read reference table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid hash for '{key}': {reason}")]
    InvalidHash { key: String, reason: String },

    #[error("Invalid overlay name '{0}': must be non-empty and contain no path separators")]
    InvalidOverlayName(String),
}

impl ReferenceTable {
    /// Load the reference table from a TOML file
    pub fn load(path: &Path) -> Result<Self, ReferenceError> {
        if !path.exists() {
            return Err(ReferenceError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and normalize a reference table from a TOML string
    pub fn parse(content: &str) -> Result<Self, ReferenceError> {
        let file: ReferenceFile = toml::from_str(content)?;
        ReferenceTable {
            main_exe: file.hashes.main_exe,
            vr_exe: file.hashes.vr_exe,
            overlays: file.overlays,
        }
        .normalized()
    }

    /// Build a table directly, validating as if it had been loaded
    pub fn new(
        main_exe: &str,
        vr_exe: &str,
        overlays: BTreeMap<String, String>,
    ) -> Result<Self, ReferenceError> {
        ReferenceTable {
            main_exe: main_exe.to_string(),
            vr_exe: vr_exe.to_string(),
            overlays,
        }
        .normalized()
    }

    /// Expected digest of the primary executable for a variant.
    ///
    /// `None` for variants that are never verified.
    pub fn primary_hash(&self, variant: Variant) -> Option<&str> {
        match variant {
            Variant::MainExe => Some(&self.main_exe),
            Variant::VrExe => Some(&self.vr_exe),
            Variant::DevExe => None,
        }
    }

    /// Number of overlays in the table
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    fn normalized(self) -> Result<Self, ReferenceError> {
        let main_exe = normalize_hash("hashes.main_exe", &self.main_exe)?;
        let vr_exe = normalize_hash("hashes.vr_exe", &self.vr_exe)?;

        let mut overlays = BTreeMap::new();
        for (name, hash) in self.overlays {
            validate_overlay_name(&name)?;
            let hash = normalize_hash(&format!("overlays.{}", name), &hash)?;
            overlays.insert(name, hash);
        }

        Ok(Self {
            main_exe,
            vr_exe,
            overlays,
        })
    }
}

/// Lowercase a hex digest after checking its shape.
pub fn normalize_hash(key: &str, hash: &str) -> Result<String, ReferenceError> {
    let trimmed = hash.trim();
    if trimmed.len() != SHA256_HEX_LEN {
        return Err(ReferenceError::InvalidHash {
            key: key.to_string(),
            reason: format!("expected {} hex characters, got {}", SHA256_HEX_LEN, trimmed.len()),
        });
    }
    if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ReferenceError::InvalidHash {
            key: key.to_string(),
            reason: "contains non-hex characters".to_string(),
        });
    }
    Ok(trimmed.to_ascii_lowercase())
}

fn validate_overlay_name(name: &str) -> Result<(), ReferenceError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ReferenceError::InvalidOverlayName(name.to_string()));
    }
    Ok(())
}
