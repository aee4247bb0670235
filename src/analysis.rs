//! Difference analysis
//!
//! Runs the deep comparison tool after a failed verification and relays
//! what it prints. Purely diagnostic: nothing here changes the verdict.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::console::{Console, Level};
use crate::process::{run_captured, CommandSpec, ProcessStatus};

/// Printed when the disassembly backend is absent
const DISASSEMBLER_HINT: &str = "Install capstone for detailed disassembly diffs";

/// Anything that can explain a mismatch
pub trait AnalysisStep {
    fn analyze(&mut self);
}

/// What the disassembly probe found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisassemblerStatus {
    Available,
    /// Probe program not on PATH
    ProgramMissing,
    /// Probe ran but reported the capability absent
    Unavailable,
}

/// Analysis step backed by the external comparison command
#[derive(Debug, Clone)]
pub struct CommandAnalysis {
    compare: CommandSpec,
    disassembler_probe: Option<CommandSpec>,
    work_dir: PathBuf,
    timeout: Option<Duration>,
    console: Console,
}

impl CommandAnalysis {
    pub fn new(compare: CommandSpec, work_dir: impl Into<PathBuf>, console: Console) -> Self {
        Self {
            compare,
            disassembler_probe: None,
            work_dir: work_dir.into(),
            timeout: None,
            console,
        }
    }

    pub fn with_disassembler_probe(mut self, probe: Option<CommandSpec>) -> Self {
        self.disassembler_probe = probe;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check whether the richer disassembly backend is installed.
    ///
    /// `None` when no probe is configured.
    pub fn probe_disassembler(&self) -> Option<DisassemblerStatus> {
        let probe = self.disassembler_probe.as_ref()?;

        if which::which(&probe.program).is_err() {
            return Some(DisassemblerStatus::ProgramMissing);
        }

        let status = Command::new(&probe.program)
            .args(&probe.args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        Some(match status {
            Ok(s) if s.success() => DisassemblerStatus::Available,
            Ok(_) => DisassemblerStatus::Unavailable,
            Err(e) => {
                tracing::debug!(error = %e, "disassembler probe failed to run");
                DisassemblerStatus::ProgramMissing
            }
        })
    }
}

impl AnalysisStep for CommandAnalysis {
    fn analyze(&mut self) {
        self.console.section("Analyzing differences...");

        match self.probe_disassembler() {
            Some(DisassemblerStatus::Available) | None => {}
            Some(status) => {
                tracing::debug!(?status, "disassembler not available");
                self.console.status(Level::Info, DISASSEMBLER_HINT);
            }
        }

        let output = run_captured(&self.compare, &[], &self.work_dir, self.timeout);

        if let ProcessStatus::LaunchFailed(reason) = &output.status {
            self.console
                .status(Level::Warn, &format!("Comparison tool unavailable: {}", reason));
            return;
        }
        if let ProcessStatus::TimedOut(limit) = &output.status {
            self.console.status(
                Level::Warn,
                &format!("Comparison tool killed after {}s", limit.as_secs()),
            );
        }

        self.console.raw(&output.stdout);
        if !output.stderr.is_empty() {
            self.console.raw(&output.stderr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analysis(probe: Option<CommandSpec>) -> CommandAnalysis {
        CommandAnalysis::new(CommandSpec::new("true", Vec::<String>::new()), ".", Console::plain())
            .with_disassembler_probe(probe)
    }

    #[test]
    fn test_no_probe_configured() {
        assert_eq!(analysis(None).probe_disassembler(), None);
    }

    #[test]
    fn test_probe_program_missing() {
        let a = analysis(Some(CommandSpec::new("no-such-python-4d1b", ["-c", "import capstone"])));
        assert_eq!(a.probe_disassembler(), Some(DisassemblerStatus::ProgramMissing));
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_reports_available_and_unavailable() {
        let ok = analysis(Some(CommandSpec::new("sh", ["-c", "exit 0"])));
        assert_eq!(ok.probe_disassembler(), Some(DisassemblerStatus::Available));

        let absent = analysis(Some(CommandSpec::new("sh", ["-c", "exit 1"])));
        assert_eq!(absent.probe_disassembler(), Some(DisassemblerStatus::Unavailable));
    }

    #[test]
    fn test_missing_compare_tool_does_not_panic() {
        let mut a = CommandAnalysis::new(
            CommandSpec::new("no-such-compare-tool-88aa", Vec::<String>::new()),
            ".",
            Console::plain(),
        );
        a.analyze();
    }
}
