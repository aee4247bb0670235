//! Build step
//!
//! Runs the external build tool for a variant and reduces the result to
//! success or failure. A failed build may leave stale or partial artifacts
//! behind; callers must not verify after a failure.

use std::path::PathBuf;
use std::time::Duration;

use crate::process::{run_captured, CommandSpec, ProcessStatus};
use crate::variant::Variant;

/// Result of one build invocation
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub succeeded: bool,
    pub status: ProcessStatus,
    pub duration: Duration,
    pub stdout: String,
    pub stderr: String,
}

impl BuildOutcome {
    /// Failed outcome with only an error message, for tests and doubles
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            status: ProcessStatus::Exited(1),
            duration: Duration::ZERO,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Successful outcome with no output
    pub fn succeeded() -> Self {
        Self {
            succeeded: true,
            status: ProcessStatus::Exited(0),
            duration: Duration::ZERO,
            stdout: String::new(),
            stderr: String::new(),
        }
    }
}

/// Anything that can build a variant
pub trait BuildStep {
    fn build(&mut self, variant: Variant) -> BuildOutcome;
}

/// Build step backed by an external command
#[derive(Debug, Clone)]
pub struct CommandBuildRunner {
    command: CommandSpec,
    work_dir: PathBuf,
    timeout: Option<Duration>,
}

impl CommandBuildRunner {
    pub fn new(command: CommandSpec, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            work_dir: work_dir.into(),
            timeout: None,
        }
    }

    /// Kill the build and treat it as failed after `timeout`
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl BuildStep for CommandBuildRunner {
    fn build(&mut self, variant: Variant) -> BuildOutcome {
        let output = run_captured(
            &self.command,
            &variant.build_args(),
            &self.work_dir,
            self.timeout,
        );

        if !output.success() {
            tracing::info!(variant = %variant, status = %output.status, "build failed");
        }

        BuildOutcome {
            succeeded: output.success(),
            status: output.status,
            duration: output.duration,
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_a_failed_build() {
        let mut runner = CommandBuildRunner::new(
            CommandSpec::new("no-such-build-tool-1c9e", ["build.py"]),
            ".",
        );
        let outcome = runner.build(Variant::MainExe);
        assert!(!outcome.succeeded);
        assert!(matches!(outcome.status, ProcessStatus::LaunchFailed(_)));
        assert!(outcome.stderr.contains("no-such-build-tool-1c9e"));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let mut runner =
            CommandBuildRunner::new(CommandSpec::new("sh", ["-c", "echo boom 1>&2; exit 2"]), ".");
        let outcome = runner.build(Variant::MainExe);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.status, ProcessStatus::Exited(2));
        assert_eq!(outcome.stderr, "boom\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_default_variant_passes_no_argument() {
        let mut runner =
            CommandBuildRunner::new(CommandSpec::new("sh", ["-c", "echo \"[$#]\"", "build"]), ".");
        let outcome = runner.build(Variant::MainExe);
        assert!(outcome.succeeded);
        assert_eq!(outcome.stdout.trim(), "[0]");
    }

    #[cfg(unix)]
    #[test]
    fn test_other_variant_passes_argument() {
        let mut runner = CommandBuildRunner::new(
            CommandSpec::new("sh", ["-c", "echo \"$1\"", "build"]),
            ".",
        );
        let outcome = runner.build(Variant::VrExe);
        assert!(outcome.succeeded);
        assert_eq!(outcome.stdout.trim(), "--variant=vr_exe");
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_is_a_failed_build() {
        let mut runner = CommandBuildRunner::new(CommandSpec::new("sh", ["-c", "sleep 5; echo done"]), ".")
            .with_timeout(Some(Duration::from_millis(200)));
        let outcome = runner.build(Variant::MainExe);
        assert!(!outcome.succeeded);
        assert!(matches!(outcome.status, ProcessStatus::TimedOut(_)));
        assert!(outcome.duration < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_work_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("marker"), "here").unwrap();
        let mut runner =
            CommandBuildRunner::new(CommandSpec::new("sh", ["-c", "cat marker"]), dir.path());
        let outcome = runner.build(Variant::MainExe);
        assert!(outcome.succeeded);
        assert_eq!(outcome.stdout, "here");
    }
}
