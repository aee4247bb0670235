//! Verification step
//!
//! Hash-checks the primary executable and every overlay of a variant and
//! aggregates the per-artifact outcomes into one pass/fail verdict.

use crate::artifact::{verify_hash, ArtifactSet, ArtifactSpec, BuildLayout, HashCheck};
use crate::reference::ReferenceTable;
use crate::variant::Variant;

/// Mismatching overlays listed individually in verbose reports
pub const MAX_LISTED_MISMATCHES: usize = 5;

/// Identifier of the primary executable in reports
pub const PRIMARY_ARTIFACT_ID: &str = "main executable";

/// Outcome of checking one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactState {
    Matched,
    /// Present but different, with diagnostic detail
    Mismatched(String),
    Missing,
    /// Present but could not be read
    Unverifiable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactOutcome {
    pub artifact_id: String,
    pub state: ArtifactState,
}

impl ArtifactOutcome {
    pub fn matched(&self) -> bool {
        matches!(self.state, ArtifactState::Matched)
    }

    pub fn detail(&self) -> String {
        match &self.state {
            ArtifactState::Matched => "Match".to_string(),
            ArtifactState::Mismatched(detail) => detail.clone(),
            ArtifactState::Missing => "file not found".to_string(),
            ArtifactState::Unverifiable(reason) => format!("unverifiable: {}", reason),
        }
    }
}

/// Everything one verification pass found
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationReport {
    /// True when the variant is exempt and nothing was inspected
    pub skipped: bool,
    pub primary: Option<ArtifactOutcome>,
    pub overlays: Vec<ArtifactOutcome>,
}

impl VerificationReport {
    /// Report for an exempt variant
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// True iff the primary and every overlay matched (or verification was skipped).
    pub fn overall_matched(&self) -> bool {
        if self.skipped {
            return true;
        }
        let primary = self.primary.as_ref().map(ArtifactOutcome::matched).unwrap_or(false);
        primary && self.overlays.iter().all(ArtifactOutcome::matched)
    }

    pub fn overlay_total(&self) -> usize {
        self.overlays.len()
    }

    pub fn overlay_matches(&self) -> usize {
        self.overlays.iter().filter(|o| o.matched()).count()
    }

    pub fn overlay_mismatches(&self) -> Vec<&ArtifactOutcome> {
        self.overlays.iter().filter(|o| !o.matched()).collect()
    }

    /// Report lines tagged with their kind.
    ///
    /// Verbose mode adds the primary mismatch detail and up to
    /// [`MAX_LISTED_MISMATCHES`] failing overlays.
    pub fn render(&self, verbose: bool) -> Vec<ReportLine> {
        let mut lines = Vec::new();

        if self.skipped {
            lines.push(ReportLine::info("Dev build - skipping verification"));
            return lines;
        }

        if let Some(primary) = &self.primary {
            if primary.matched() {
                lines.push(ReportLine::pass("Main executable: MATCH"));
            } else {
                lines.push(ReportLine::fail("Main executable: MISMATCH"));
                if verbose {
                    lines.push(ReportLine::detail(format!("  {}", primary.detail())));
                }
            }
        }

        let mismatches = self.overlay_mismatches();
        let summary = format!(
            "Overlays: {}/{} match",
            self.overlay_matches(),
            self.overlay_total()
        );
        if mismatches.is_empty() {
            lines.push(ReportLine::pass(summary));
        } else {
            lines.push(ReportLine::partial(summary));
            if verbose {
                for outcome in mismatches.iter().take(MAX_LISTED_MISMATCHES) {
                    lines.push(ReportLine::detail(format!(
                        "  ✗ {}: {}",
                        outcome.artifact_id,
                        outcome.detail()
                    )));
                }
                if mismatches.len() > MAX_LISTED_MISMATCHES {
                    lines.push(ReportLine::detail(format!(
                        "  ... and {} more",
                        mismatches.len() - MAX_LISTED_MISMATCHES
                    )));
                }
            }
        }

        lines
    }
}

/// Kind of a rendered report line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Pass,
    Fail,
    /// Some overlays matched, some did not
    Partial,
    Info,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub kind: LineKind,
    pub text: String,
}

impl ReportLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
    fn pass(text: impl Into<String>) -> Self {
        Self::new(LineKind::Pass, text)
    }
    fn fail(text: impl Into<String>) -> Self {
        Self::new(LineKind::Fail, text)
    }
    fn partial(text: impl Into<String>) -> Self {
        Self::new(LineKind::Partial, text)
    }
    fn info(text: impl Into<String>) -> Self {
        Self::new(LineKind::Info, text)
    }
    fn detail(text: impl Into<String>) -> Self {
        Self::new(LineKind::Detail, text)
    }
}

/// Anything that can verify a variant's build output
pub trait VerificationStep {
    fn verify_all(&mut self, variant: Variant) -> VerificationReport;
}

/// Verification against a reference hash table
#[derive(Debug, Clone)]
pub struct HashVerificationStep {
    table: Option<ReferenceTable>,
    layout: BuildLayout,
}

impl HashVerificationStep {
    pub fn new(table: ReferenceTable, layout: BuildLayout) -> Self {
        Self {
            table: Some(table),
            layout,
        }
    }

    /// Step for exempt variants, which need no reference table
    pub fn without_reference(layout: BuildLayout) -> Self {
        Self {
            table: None,
            layout,
        }
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }
}

impl VerificationStep for HashVerificationStep {
    fn verify_all(&mut self, variant: Variant) -> VerificationReport {
        if variant.skips_verification() {
            return VerificationReport::skipped();
        }

        let Some(table) = &self.table else {
            return VerificationReport {
                skipped: false,
                primary: Some(ArtifactOutcome {
                    artifact_id: PRIMARY_ARTIFACT_ID.to_string(),
                    state: ArtifactState::Unverifiable("no reference table loaded".to_string()),
                }),
                overlays: Vec::new(),
            };
        };

        let Some(set) = ArtifactSet::resolve(variant, table, &self.layout) else {
            // Only exempt variants fail to resolve.
            return VerificationReport::skipped();
        };

        let primary = check_artifact(PRIMARY_ARTIFACT_ID, &set.primary);
        let overlays = set
            .overlays
            .iter()
            .map(|(name, spec)| check_artifact(name, spec))
            .collect();

        VerificationReport {
            skipped: false,
            primary: Some(primary),
            overlays,
        }
    }
}

/// Check one artifact, converting I/O faults into an unverifiable outcome.
pub fn check_artifact(artifact_id: &str, spec: &ArtifactSpec) -> ArtifactOutcome {
    let state = match verify_hash(&spec.path, &spec.expected_hash) {
        Ok(HashCheck::Match) => ArtifactState::Matched,
        Ok(HashCheck::Missing) => ArtifactState::Missing,
        Ok(check @ HashCheck::Mismatch { .. }) => ArtifactState::Mismatched(check.detail()),
        Err(e) => {
            tracing::error!(artifact = artifact_id, error = %e, "artifact unreadable");
            ArtifactState::Unverifiable(e.to_string())
        }
    };

    ArtifactOutcome {
        artifact_id: artifact_id.to_string(),
        state,
    }
}
