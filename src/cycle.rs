//! Build → verify → analyze cycle
//!
//! State machine for one cycle:
//! `Start → Building → {BuildFailed | Verifying} → {Matched | Mismatched → Analyzing} → Done`
//!
//! A failed build ends the cycle without verification, since whatever
//! artifacts are on disk may be stale or partial.

use std::path::PathBuf;

use crate::analysis::AnalysisStep;
use crate::build::BuildStep;
use crate::console::{Console, Level};
use crate::verify::{LineKind, VerificationReport, VerificationStep};
use crate::variant::Variant;

/// Cycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Start,
    Building,
    BuildFailed,
    Verifying,
    Matched,
    Mismatched,
    Analyzing,
    /// Terminal, carrying the overall outcome
    Done(bool),
}

impl CycleState {
    /// Whether no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, CycleState::Done(_))
    }
}

/// Boolean summary of one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleResult {
    pub built: bool,
    pub verified: bool,
    pub analyzed: bool,
}

impl CycleResult {
    /// A cycle succeeds iff the build succeeded and every artifact matched.
    pub fn success(&self) -> bool {
        self.built && self.verified
    }
}

/// Sequences the three steps for a fixed variant
pub struct CycleOrchestrator<B, V, A> {
    variant: Variant,
    verbose: bool,
    watch_file: Option<PathBuf>,
    builder: B,
    verifier: V,
    analyzer: A,
    console: Console,
    history: Vec<CycleState>,
}

impl<B, V, A> CycleOrchestrator<B, V, A>
where
    B: BuildStep,
    V: VerificationStep,
    A: AnalysisStep,
{
    pub fn new(variant: Variant, builder: B, verifier: V, analyzer: A, console: Console) -> Self {
        Self {
            variant,
            verbose: false,
            watch_file: None,
            builder,
            verifier,
            analyzer,
            console,
            history: Vec::new(),
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// File named in the summary while in watch mode
    pub fn watch_file(mut self, path: Option<PathBuf>) -> Self {
        self.watch_file = path;
        self
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// States visited by the most recent cycle
    pub fn history(&self) -> &[CycleState] {
        &self.history
    }

    pub fn builder(&self) -> &B {
        &self.builder
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn analyzer(&self) -> &A {
        &self.analyzer
    }

    /// Run one full cycle and return its summary.
    pub fn run_cycle(&mut self) -> CycleResult {
        self.history.clear();
        let mut result = CycleResult::default();
        let mut state = CycleState::Start;

        self.console.header(&format!(
            "BUILD ITERATION CYCLE - {}",
            self.variant.as_str().to_uppercase()
        ));

        while !state.is_terminal() {
            self.history.push(state);
            state = match state {
                CycleState::Start => CycleState::Building,
                CycleState::Building => {
                    result.built = self.run_build();
                    if result.built {
                        CycleState::Verifying
                    } else {
                        CycleState::BuildFailed
                    }
                }
                CycleState::BuildFailed => {
                    self.console
                        .note(Level::Fail, "\n✗ Build failed - fix compilation errors first");
                    CycleState::Done(false)
                }
                CycleState::Verifying => {
                    result.verified = self.run_verification();
                    if result.verified {
                        CycleState::Matched
                    } else {
                        CycleState::Mismatched
                    }
                }
                CycleState::Matched => {
                    self.print_summary(true);
                    CycleState::Done(true)
                }
                CycleState::Mismatched => CycleState::Analyzing,
                CycleState::Analyzing => {
                    self.analyzer.analyze();
                    result.analyzed = true;
                    self.print_summary(false);
                    CycleState::Done(false)
                }
                done @ CycleState::Done(_) => done,
            };
        }
        self.history.push(state);

        tracing::debug!(
            variant = %self.variant,
            built = result.built,
            verified = result.verified,
            analyzed = result.analyzed,
            "cycle finished"
        );
        result
    }

    fn run_build(&mut self) -> bool {
        self.console.section("Running build...");
        let outcome = self.builder.build(self.variant);
        let secs = outcome.duration.as_secs_f64();

        if !outcome.succeeded {
            self.console
                .status(Level::Fail, &format!("Build FAILED in {:.2}s ({})", secs, outcome.status));
            self.console.raw("\nStderr:");
            self.console.raw(&outcome.stderr);
            return false;
        }

        self.console
            .status(Level::Ok, &format!("Build completed in {:.2}s", secs));
        if self.verbose {
            self.console.raw("\nBuild output:");
            self.console.raw(&outcome.stdout);
        }
        true
    }

    fn run_verification(&mut self) -> bool {
        self.console.section("Verifying build output...");
        let report = self.verifier.verify_all(self.variant);
        self.print_report(&report);
        report.overall_matched()
    }

    fn print_report(&self, report: &VerificationReport) {
        for line in report.render(self.verbose) {
            match line.kind {
                LineKind::Pass => self.console.status(Level::Ok, &line.text),
                LineKind::Fail => self.console.status(Level::Fail, &line.text),
                LineKind::Partial => {
                    self.console.note(Level::Warn, &format!("✗ {}", line.text))
                }
                LineKind::Info => self.console.status(Level::Info, &line.text),
                LineKind::Detail => self.console.raw(&line.text),
            }
        }
    }

    fn print_summary(&self, success: bool) {
        self.console.header("SUMMARY");

        if success {
            self.console
                .status(Level::Ok, "BUILD SUCCESSFUL - PERFECT MATCH!");
            self.console
                .raw("\nThe compiled binary matches the target perfectly.");
            self.console.raw("This code is ready to commit!");
        } else {
            self.console
                .status(Level::Warn, "BUILD COMPLETED - NEEDS ITERATION");
            self.console
                .raw("\nThe compiled binary does not match the target.");
            self.console
                .raw("Review the differences above and iterate on the source code.");
        }

        if let Some(path) = &self.watch_file {
            self.console.raw(&format!("\nMonitoring: {}", path.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildOutcome;
    use crate::verify::{ArtifactOutcome, ArtifactState};

    struct FixedBuild(bool, usize);
    impl BuildStep for FixedBuild {
        fn build(&mut self, _variant: Variant) -> BuildOutcome {
            self.1 += 1;
            if self.0 {
                BuildOutcome::succeeded()
            } else {
                BuildOutcome::failed("error: boom")
            }
        }
    }

    struct FixedVerify(bool, usize);
    impl VerificationStep for FixedVerify {
        fn verify_all(&mut self, _variant: Variant) -> VerificationReport {
            self.1 += 1;
            VerificationReport {
                skipped: false,
                primary: Some(ArtifactOutcome {
                    artifact_id: "main executable".to_string(),
                    state: if self.0 {
                        ArtifactState::Matched
                    } else {
                        ArtifactState::Missing
                    },
                }),
                overlays: Vec::new(),
            }
        }
    }

    #[derive(Default)]
    struct CountAnalysis(usize);
    impl AnalysisStep for CountAnalysis {
        fn analyze(&mut self) {
            self.0 += 1;
        }
    }

    fn orchestrator(
        build_ok: bool,
        verify_ok: bool,
    ) -> CycleOrchestrator<FixedBuild, FixedVerify, CountAnalysis> {
        CycleOrchestrator::new(
            Variant::MainExe,
            FixedBuild(build_ok, 0),
            FixedVerify(verify_ok, 0),
            CountAnalysis::default(),
            Console::plain(),
        )
    }

    #[test]
    fn test_perfect_match_path() {
        let mut o = orchestrator(true, true);
        let result = o.run_cycle();
        assert!(result.success());
        assert!(!result.analyzed);
        assert_eq!(o.analyzer().0, 0);
        assert_eq!(
            o.history(),
            &[
                CycleState::Start,
                CycleState::Building,
                CycleState::Verifying,
                CycleState::Matched,
                CycleState::Done(true),
            ]
        );
    }

    #[test]
    fn test_mismatch_runs_analysis_once() {
        let mut o = orchestrator(true, false);
        let result = o.run_cycle();
        assert!(!result.success());
        assert!(result.built);
        assert!(result.analyzed);
        assert_eq!(o.analyzer().0, 1);
        assert_eq!(o.history().last(), Some(&CycleState::Done(false)));
        assert!(o.history().contains(&CycleState::Analyzing));
    }

    #[test]
    fn test_build_failure_skips_verification() {
        let mut o = orchestrator(false, true);
        let result = o.run_cycle();
        assert!(!result.success());
        assert!(!result.built);
        assert_eq!(o.verifier().1, 0);
        assert_eq!(o.analyzer().0, 0);
        assert_eq!(
            o.history(),
            &[
                CycleState::Start,
                CycleState::Building,
                CycleState::BuildFailed,
                CycleState::Done(false),
            ]
        );
    }

    #[test]
    fn test_history_resets_each_cycle() {
        let mut o = orchestrator(true, true);
        o.run_cycle();
        o.run_cycle();
        assert_eq!(o.history().len(), 5);
        assert_eq!(o.builder().1, 2);
    }

    #[test]
    fn test_terminal_states() {
        assert!(CycleState::Done(true).is_terminal());
        assert!(CycleState::Done(false).is_terminal());
        assert!(!CycleState::Analyzing.is_terminal());
        assert!(!CycleState::BuildFailed.is_terminal());
    }
}
