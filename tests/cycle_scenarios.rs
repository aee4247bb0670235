//! End-to-end cycle scenarios
//!
//! Drives the orchestrator with real `sh` build commands and real hash
//! verification over a temporary build directory. Analysis and
//! verification are wrapped in counters so the tests can assert which
//! steps ran.

#![cfg(unix)]

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use match_iterate::artifact::sha256_file;
use match_iterate::process::CommandSpec;
use match_iterate::{
    AnalysisStep, BuildLayout, CommandBuildRunner, Console, CycleOrchestrator, HashVerificationStep,
    ReferenceTable, Variant, VerificationReport, VerificationStep,
};
use tempfile::TempDir;

// =============================================================================
// Helpers
// =============================================================================

struct CountingVerify<V> {
    inner: V,
    calls: usize,
}

impl<V: VerificationStep> VerificationStep for CountingVerify<V> {
    fn verify_all(&mut self, variant: Variant) -> VerificationReport {
        self.calls += 1;
        self.inner.verify_all(variant)
    }
}

#[derive(Default)]
struct CountingAnalysis {
    calls: usize,
}

impl AnalysisStep for CountingAnalysis {
    fn analyze(&mut self) {
        self.calls += 1;
    }
}

type TestOrchestrator =
    CycleOrchestrator<CommandBuildRunner, CountingVerify<HashVerificationStep>, CountingAnalysis>;

/// Build dir with `obj/` holding a primary executable and two overlays,
/// plus a reference table whose digests match them.
fn seeded_build_dir() -> (TempDir, ReferenceTable) {
    let dir = TempDir::new().unwrap();
    let obj = dir.path().join("obj");
    fs::create_dir(&obj).unwrap();

    fs::write(obj.join("_mgsi.exe"), b"MZ main executable").unwrap();
    fs::write(obj.join("_mgsi_vr.exe"), b"MZ vr executable").unwrap();
    fs::write(obj.join("s11d.bin"), b"overlay s11d").unwrap();
    fs::write(obj.join("init.bin"), b"overlay init").unwrap();

    let mut overlays = BTreeMap::new();
    overlays.insert("s11d".to_string(), digest(&obj.join("s11d.bin")));
    overlays.insert("init".to_string(), digest(&obj.join("init.bin")));

    let table = ReferenceTable::new(
        &digest(&obj.join("_mgsi.exe")),
        &digest(&obj.join("_mgsi_vr.exe")),
        overlays,
    )
    .unwrap();

    (dir, table)
}

fn digest(path: &Path) -> String {
    sha256_file(path).unwrap()
}

fn orchestrator(
    dir: &Path,
    table: ReferenceTable,
    variant: Variant,
    build_script: &str,
) -> TestOrchestrator {
    let builder = CommandBuildRunner::new(CommandSpec::new("sh", ["-c", build_script]), dir);
    let verifier = CountingVerify {
        inner: HashVerificationStep::new(table, BuildLayout::with_obj_dir(dir.join("obj"))),
        calls: 0,
    };
    CycleOrchestrator::new(
        variant,
        builder,
        verifier,
        CountingAnalysis::default(),
        Console::plain(),
    )
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_build_ok_all_match_is_success_without_analysis() {
    let (dir, table) = seeded_build_dir();
    let mut o = orchestrator(dir.path(), table, Variant::MainExe, "exit 0");

    let result = o.run_cycle();

    assert!(result.success());
    assert_eq!(o.verifier().calls, 1);
    assert_eq!(o.analyzer().calls, 0);
}

#[test]
fn test_primary_mismatch_runs_analysis_once() {
    let (dir, table) = seeded_build_dir();
    // The "build" rewrites the primary with different bytes.
    let mut o = orchestrator(
        dir.path(),
        table,
        Variant::MainExe,
        "printf 'changed' > obj/_mgsi.exe",
    );

    let result = o.run_cycle();

    assert!(!result.success());
    assert!(result.built);
    assert!(!result.verified);
    assert_eq!(o.analyzer().calls, 1);
}

#[test]
fn test_failed_build_never_verifies_even_with_matching_stale_artifacts() {
    let (dir, table) = seeded_build_dir();
    let mut o = orchestrator(dir.path(), table, Variant::MainExe, "echo 'error: x' 1>&2; exit 1");

    let result = o.run_cycle();

    assert!(!result.success());
    assert!(!result.built);
    assert_eq!(o.verifier().calls, 0);
    assert_eq!(o.analyzer().calls, 0);
}

#[test]
fn test_overlay_mismatch_fails_cycle() {
    let (dir, table) = seeded_build_dir();
    let mut o = orchestrator(dir.path(), table, Variant::MainExe, "rm obj/init.bin");

    let result = o.run_cycle();

    assert!(!result.success());
    assert_eq!(o.analyzer().calls, 1);
}

#[test]
fn test_vr_variant_checks_vr_executable() {
    let (dir, table) = seeded_build_dir();
    // With `sh -c SCRIPT`, the appended variant argument becomes $0.
    let mut o = orchestrator(
        dir.path(),
        table,
        Variant::VrExe,
        "test \"$0\" = --variant=vr_exe",
    );

    let result = o.run_cycle();
    assert!(result.built, "vr build should receive --variant=vr_exe");
    assert!(result.success());
}

#[test]
fn test_dev_variant_skips_verification() {
    let (dir, table) = seeded_build_dir();
    fs::remove_dir_all(dir.path().join("obj")).unwrap();
    let mut o = orchestrator(dir.path(), table, Variant::DevExe, "exit 0");

    let result = o.run_cycle();

    assert!(result.success());
    assert_eq!(o.verifier().calls, 1);
    assert_eq!(o.analyzer().calls, 0);
}
