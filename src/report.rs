//! Finding aggregation and the queryable analysis result
//!
//! Per-artifact reports are concatenated in scan order, de-duplicated by
//! `(path, rule, line)`, and exposed through a small set of derived queries
//! that are recomputed on demand rather than cached.

use crate::models::{Finding, Severity};
use crate::rules::ids::{RuleCategory, RuleId};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Non-fatal problem recorded while evaluating one artifact.
///
/// Warnings mark a result as partial without failing the run: a rule that
/// errored, or a template that needed the fallback analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineWarning {
    pub artifact: PathBuf,
    /// Present when a specific rule failed; absent for artifact-level events.
    pub rule: Option<RuleId>,
    pub message: String,
}

/// Findings and warnings for one artifact, in rule-registration order.
#[derive(Debug, Clone, Default)]
pub struct ArtifactReport {
    pub findings: Vec<Finding>,
    pub warnings: Vec<EngineWarning>,
}

/// The aggregated, queryable outcome of one analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub project_path: PathBuf,
    /// Stable order: artifact scan order, then rule-registration order,
    /// then line.
    pub findings: Vec<Finding>,
    pub warnings: Vec<EngineWarning>,
    pub timestamp: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

impl AnalysisResult {
    /// Findings per severity. Recomputed on demand; sums to `findings.len()`.
    pub fn severity_counts(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.severity).or_insert(0) += 1;
        }
        counts
    }

    /// Findings per rule family. Recomputed on demand.
    pub fn category_counts(&self) -> BTreeMap<RuleCategory, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.category).or_insert(0) += 1;
        }
        counts
    }

    /// The most severe level present, if any finding exists.
    pub fn highest_severity(&self) -> Option<Severity> {
        self.findings.iter().map(|f| f.severity).max()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Critical)
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Whether any warning was recorded; consumers should surface partial
    /// results as such.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// A new result retaining findings with severity >= `min`.
    ///
    /// Pure and idempotent; order, warnings, and timing carry over.
    pub fn filter_by_severity(&self, min: Severity) -> AnalysisResult {
        AnalysisResult {
            project_path: self.project_path.clone(),
            findings: self
                .findings
                .iter()
                .filter(|f| f.severity >= min)
                .cloned()
                .collect(),
            warnings: self.warnings.clone(),
            timestamp: self.timestamp,
            duration: self.duration,
        }
    }
}

/// Merge per-artifact reports into one result.
///
/// Input order is preserved (it is the scan order); duplicate identities
/// keep their first occurrence.
pub fn aggregate(
    project_path: impl Into<PathBuf>,
    reports: Vec<ArtifactReport>,
    timestamp: DateTime<Utc>,
    duration: Duration,
) -> AnalysisResult {
    let mut findings = Vec::new();
    let mut warnings = Vec::new();
    let mut seen: FxHashSet<(PathBuf, RuleId, u32)> = FxHashSet::default();

    for report in reports {
        for finding in report.findings {
            if seen.insert(finding.identity()) {
                findings.push(finding);
            }
        }
        warnings.extend(report.warnings);
    }

    AnalysisResult {
        project_path: project_path.into(),
        findings,
        warnings,
        timestamp,
        duration,
    }
}
