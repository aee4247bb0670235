//! Build variants
//!
//! A variant selects the build configuration and which reference hash the
//! primary executable is checked against. The set is closed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Build variant selected for one orchestrator instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Retail executable (default)
    #[default]
    MainExe,
    /// VR-mode executable
    VrExe,
    /// Development build, never hash-verified
    DevExe,
}

impl Variant {
    /// All variants, in CLI order
    pub const ALL: [Variant; 3] = [Variant::MainExe, Variant::VrExe, Variant::DevExe];

    /// Stable string form used on the command line and in build arguments
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::MainExe => "main_exe",
            Variant::VrExe => "vr_exe",
            Variant::DevExe => "dev_exe",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Variant::MainExe)
    }

    /// Dev builds are exempt from hash verification.
    pub fn skips_verification(&self) -> bool {
        matches!(self, Variant::DevExe)
    }

    /// Extra arguments passed to the build tool.
    ///
    /// The default variant passes nothing; every other variant passes
    /// `--variant=<name>`.
    pub fn build_args(&self) -> Vec<String> {
        if self.is_default() {
            Vec::new()
        } else {
            vec![format!("--variant={}", self.as_str())]
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown variant '{0}' (expected main_exe, vr_exe or dev_exe)")]
pub struct ParseVariantError(String);

impl FromStr for Variant {
    type Err = ParseVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main_exe" => Ok(Variant::MainExe),
            "vr_exe" => Ok(Variant::VrExe),
            "dev_exe" => Ok(Variant::DevExe),
            other => Err(ParseVariantError(other.to_string())),
        }
    }
}
