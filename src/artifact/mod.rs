//! Build artifacts and their expected digests
//!
//! Resolves, for a variant, the primary executable plus every overlay that
//! must be hash-checked, and provides the digest check itself.

pub mod hash;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::reference::ReferenceTable;
use crate::variant::Variant;

pub use hash::{sha256_file, verify_hash, HashCheck, HashError};

/// File-naming convention of the build output directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildLayout {
    /// Build output directory, relative paths resolve against the build dir
    pub obj_dir: PathBuf,

    /// File name of the retail executable
    pub main_exe_name: String,

    /// File name of the VR executable
    pub vr_exe_name: String,

    /// Extension appended to overlay names
    pub overlay_extension: String,
}

impl Default for BuildLayout {
    fn default() -> Self {
        Self {
            obj_dir: PathBuf::from("obj"),
            main_exe_name: "_mgsi.exe".to_string(),
            vr_exe_name: "_mgsi_vr.exe".to_string(),
            overlay_extension: "bin".to_string(),
        }
    }
}

impl BuildLayout {
    /// Layout rooted at an explicit output directory
    pub fn with_obj_dir(obj_dir: impl Into<PathBuf>) -> Self {
        Self {
            obj_dir: obj_dir.into(),
            ..Self::default()
        }
    }

    /// Make `obj_dir` absolute against `base` if it is relative
    pub fn rooted_at(mut self, base: &Path) -> Self {
        if self.obj_dir.is_relative() {
            self.obj_dir = base.join(&self.obj_dir);
        }
        self
    }

    /// Primary executable path; `None` for unverified variants
    pub fn primary_path(&self, variant: Variant) -> Option<PathBuf> {
        match variant {
            Variant::MainExe => Some(self.obj_dir.join(&self.main_exe_name)),
            Variant::VrExe => Some(self.obj_dir.join(&self.vr_exe_name)),
            Variant::DevExe => None,
        }
    }

    /// Overlay path: `<obj_dir>/<name>.<ext>`
    pub fn overlay_path(&self, name: &str) -> PathBuf {
        self.obj_dir
            .join(format!("{}.{}", name, self.overlay_extension))
    }
}

/// One artifact to check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSpec {
    pub path: PathBuf,
    pub expected_hash: String,
}

/// Everything that must match for a variant to pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub primary: ArtifactSpec,
    pub overlays: BTreeMap<String, ArtifactSpec>,
}

impl ArtifactSet {
    /// Resolve the artifact set for `variant`.
    ///
    /// Returns `None` for `dev_exe`, which is never verified. Overlays are
    /// the same for every verified variant.
    pub fn resolve(variant: Variant, table: &ReferenceTable, layout: &BuildLayout) -> Option<Self> {
        let expected_hash = table.primary_hash(variant)?.to_string();
        let path = layout.primary_path(variant)?;

        let overlays = table
            .overlays
            .iter()
            .map(|(name, hash)| {
                (
                    name.clone(),
                    ArtifactSpec {
                        path: layout.overlay_path(name),
                        expected_hash: hash.clone(),
                    },
                )
            })
            .collect();

        Some(Self {
            primary: ArtifactSpec {
                path,
                expected_hash,
            },
            overlays,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const HASH_C: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

    fn table() -> ReferenceTable {
        let mut overlays = BTreeMap::new();
        overlays.insert("s11d".to_string(), HASH_C.to_string());
        overlays.insert("init".to_string(), HASH_C.to_string());
        ReferenceTable::new(HASH_A, HASH_B, overlays).unwrap()
    }

    #[test]
    fn test_resolve_main_exe() {
        let layout = BuildLayout::with_obj_dir("/build/obj");
        let set = ArtifactSet::resolve(Variant::MainExe, &table(), &layout).unwrap();

        assert_eq!(set.primary.path, PathBuf::from("/build/obj/_mgsi.exe"));
        assert_eq!(set.primary.expected_hash, HASH_A);
        assert_eq!(set.overlays.len(), 2);
        assert_eq!(set.overlays["s11d"].path, PathBuf::from("/build/obj/s11d.bin"));
    }

    #[test]
    fn test_resolve_vr_exe_shares_overlays() {
        let layout = BuildLayout::with_obj_dir("/build/obj");
        let main = ArtifactSet::resolve(Variant::MainExe, &table(), &layout).unwrap();
        let vr = ArtifactSet::resolve(Variant::VrExe, &table(), &layout).unwrap();

        assert_eq!(vr.primary.path, PathBuf::from("/build/obj/_mgsi_vr.exe"));
        assert_eq!(vr.primary.expected_hash, HASH_B);
        assert_eq!(vr.overlays, main.overlays);
    }

    #[test]
    fn test_resolve_dev_exe_is_none() {
        let layout = BuildLayout::default();
        assert!(ArtifactSet::resolve(Variant::DevExe, &table(), &layout).is_none());
    }

    #[test]
    fn test_layout_rooted_at() {
        let layout = BuildLayout::default().rooted_at(Path::new("/src/build"));
        assert_eq!(layout.obj_dir, PathBuf::from("/src/build/obj"));

        let absolute = BuildLayout::with_obj_dir("/abs/obj").rooted_at(Path::new("/src/build"));
        assert_eq!(absolute.obj_dir, PathBuf::from("/abs/obj"));
    }

    #[test]
    fn test_custom_overlay_extension() {
        let layout = BuildLayout {
            overlay_extension: "ovl".to_string(),
            ..BuildLayout::with_obj_dir("out")
        };
        assert_eq!(layout.overlay_path("s00a"), PathBuf::from("out/s00a.ovl"));
    }
}
