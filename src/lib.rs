//! match-iterate - build, verify and diff loop for matching decompilation
//!
//! Compiles a source tree, checks the produced executable and overlays
//! byte-for-byte against reference SHA-256 digests, and runs a comparison
//! tool when anything differs. Watch mode repeats the cycle whenever a
//! tracked source file changes.

pub mod analysis;
pub mod artifact;
pub mod build;
pub mod config;
pub mod console;
pub mod cycle;
pub mod process;
pub mod reference;
pub mod signal;
pub mod telemetry;
pub mod variant;
pub mod verify;
pub mod watch;

pub use analysis::{AnalysisStep, CommandAnalysis};
pub use artifact::{ArtifactSet, ArtifactSpec, BuildLayout, HashCheck};
pub use build::{BuildOutcome, BuildStep, CommandBuildRunner};
pub use config::{CliOverrides, ConfigError, IterateConfig};
pub use console::Console;
pub use cycle::{CycleOrchestrator, CycleResult, CycleState};
pub use reference::{ReferenceError, ReferenceTable};
pub use signal::{InterruptHandler, InterruptState};
pub use variant::Variant;
pub use verify::{HashVerificationStep, VerificationReport, VerificationStep};
pub use watch::{Cycle, Pause, PollOutcome, ThreadPause, WatchConfig, WatchError, Watcher};

/// Orchestrator wired to the real external tools
pub type CommandOrchestrator =
    CycleOrchestrator<CommandBuildRunner, HashVerificationStep, CommandAnalysis>;

/// Build a command-backed orchestrator from configuration.
///
/// `table` may be `None` only for variants that skip verification.
pub fn orchestrator_from_config(
    config: &IterateConfig,
    table: Option<ReferenceTable>,
    variant: Variant,
    console: Console,
) -> CommandOrchestrator {
    let builder = CommandBuildRunner::new(config.build.command.clone(), &config.build_dir)
        .with_timeout(config.build_timeout());
    let verifier = match table {
        Some(table) => HashVerificationStep::new(table, config.layout()),
        None => HashVerificationStep::without_reference(config.layout()),
    };
    let analyzer = CommandAnalysis::new(config.compare.command.clone(), &config.build_dir, console)
        .with_disassembler_probe(config.compare.disassembler_probe.clone())
        .with_timeout(config.compare_timeout());

    CycleOrchestrator::new(variant, builder, verifier, analyzer, console)
}
