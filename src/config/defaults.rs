//! Built-in defaults (layer 1)

use crate::process::CommandSpec;

/// Config file looked up in the build directory
pub const DEFAULT_CONFIG_FILE: &str = "iterate.toml";

/// Reference hash table, relative to the build directory
pub const DEFAULT_REFERENCE_FILE: &str = "reference.toml";

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Upper bound for any sub-process timeout (one day)
pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;

pub fn build_command() -> CommandSpec {
    CommandSpec::new("python3", ["build.py"])
}

pub fn compare_command() -> CommandSpec {
    CommandSpec::new("python3", ["compare.py"])
}

pub fn disassembler_probe() -> CommandSpec {
    CommandSpec::new("python3", ["-c", "import capstone"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_commands() {
        assert_eq!(build_command().args, vec!["build.py"]);
        assert_eq!(compare_command().args, vec!["compare.py"]);
        assert_eq!(disassembler_probe().display(), "python3 -c import capstone");
    }
}
