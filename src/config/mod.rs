//! Configuration
//!
//! Three layers, later ones winning:
//! 1. Built-in defaults
//! 2. `iterate.toml` in the build directory (or `--config PATH`)
//! 3. CLI flags

mod defaults;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::artifact::BuildLayout;
use crate::process::CommandSpec;
use crate::watch::WatchConfig;

pub use defaults::{
    DEFAULT_CONFIG_FILE, DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_REFERENCE_FILE,
    MAX_TIMEOUT_SECONDS,
};

/// Errors from loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{key} must be in (0, {max}], got {value}")]
    OutOfBounds { key: &'static str, value: u64, max: u64 },
}

/// Effective configuration for one process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterateConfig {
    /// Directory the build and compare tools run in
    #[serde(skip)]
    pub build_dir: PathBuf,

    /// Reference hash table, relative to `build_dir` unless absolute
    pub reference: PathBuf,

    pub layout: BuildLayout,
    pub build: BuildSection,
    pub compare: CompareSection,
    pub watch: WatchSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSection {
    pub command: CommandSpec,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSection {
    pub command: CommandSpec,
    pub timeout_seconds: Option<u64>,
    /// Exits zero when the richer disassembly backend is installed
    pub disassembler_probe: Option<CommandSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
}

/// Flags that override file values
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub build_dir: Option<PathBuf>,
    /// Applies to both build and compare
    pub timeout_seconds: Option<u64>,
}

impl Default for IterateConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from("."),
            reference: PathBuf::from(DEFAULT_REFERENCE_FILE),
            layout: BuildLayout::default(),
            build: BuildSection::default(),
            compare: CompareSection::default(),
            watch: WatchSection::default(),
        }
    }
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            command: defaults::build_command(),
            timeout_seconds: None,
        }
    }
}

impl Default for CompareSection {
    fn default() -> Self {
        Self {
            command: defaults::compare_command(),
            timeout_seconds: None,
            disassembler_probe: Some(defaults::disassembler_probe()),
        }
    }
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl IterateConfig {
    /// Parse a config file body
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Build the effective configuration.
    ///
    /// An explicit `config_path` must exist. Without one,
    /// `<build_dir>/iterate.toml` is used if present, otherwise defaults.
    pub fn load(config_path: Option<&Path>, overrides: &CliOverrides) -> Result<Self, ConfigError> {
        let build_dir = overrides
            .build_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::parse(&std::fs::read_to_string(path)?)?
            }
            None => {
                let default_path = build_dir.join(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    tracing::debug!(path = %default_path.display(), "loading config");
                    Self::parse(&std::fs::read_to_string(&default_path)?)?
                } else {
                    Self::default()
                }
            }
        };

        config.build_dir = build_dir;
        if let Some(timeout) = overrides.timeout_seconds {
            config.build.timeout_seconds = Some(timeout);
            config.compare.timeout_seconds = Some(timeout);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_timeout("build.timeout_seconds", self.build.timeout_seconds)?;
        check_timeout("compare.timeout_seconds", self.compare.timeout_seconds)?;

        if self.watch.poll_interval_ms == 0 || self.watch.poll_interval_ms > 60_000 {
            return Err(ConfigError::OutOfBounds {
                key: "watch.poll_interval_ms",
                value: self.watch.poll_interval_ms,
                max: 60_000,
            });
        }
        if self.watch.debounce_ms == 0 || self.watch.debounce_ms > 60_000 {
            return Err(ConfigError::OutOfBounds {
                key: "watch.debounce_ms",
                value: self.watch.debounce_ms,
                max: 60_000,
            });
        }
        Ok(())
    }

    /// Reference table path resolved against the build directory
    pub fn reference_path(&self) -> PathBuf {
        if self.reference.is_absolute() {
            self.reference.clone()
        } else {
            self.build_dir.join(&self.reference)
        }
    }

    /// Layout with `obj_dir` resolved against the build directory
    pub fn layout(&self) -> BuildLayout {
        self.layout.clone().rooted_at(&self.build_dir)
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build.timeout_seconds.map(Duration::from_secs)
    }

    pub fn compare_timeout(&self) -> Option<Duration> {
        self.compare.timeout_seconds.map(Duration::from_secs)
    }

    pub fn watch_config(&self) -> WatchConfig {
        WatchConfig {
            poll_interval: Duration::from_millis(self.watch.poll_interval_ms),
            debounce: Duration::from_millis(self.watch.debounce_ms),
        }
    }
}

fn check_timeout(key: &'static str, value: Option<u64>) -> Result<(), ConfigError> {
    match value {
        Some(v) if v == 0 || v > MAX_TIMEOUT_SECONDS => Err(ConfigError::OutOfBounds {
            key,
            value: v,
            max: MAX_TIMEOUT_SECONDS,
        }),
        _ => Ok(()),
    }
}
