//! Core data models
//!
//! These models are shared across the engine: artifacts as delivered by the
//! scanner, the classified artifact kinds, and the findings that rules emit.

use crate::rules::ids::{RuleCategory, RuleId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Generate a deterministic finding ID based on content hash.
///
/// Findings carry stable IDs across runs, enabling:
/// - Tracking findings over time (fixed vs new vs recurring)
/// - Suppression by ID in config files
/// - Reliable deduplication
///
/// The ID is a 16-character hex string derived from hashing the rule
/// identifier, file path, line number, and message.
pub fn deterministic_finding_id(rule: &str, file: &str, line: u32, message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(rule.as_bytes());
    hasher.update(b"\n");
    hasher.update(file.as_bytes());
    hasher.update(b"\n");
    hasher.update(line.to_le_bytes());
    hasher.update(b"\n");
    hasher.update(message.as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Severity levels for findings, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// The classified kind of a source artifact.
///
/// `Directive` shares the component rule set downstream; the registry treats
/// it as an alias when resolving applicable rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Component,
    Template,
    Service,
    Directive,
    Config,
    Store,
    Routing,
    Test,
    #[default]
    Other,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ArtifactKind::Component => "component",
            ArtifactKind::Template => "template",
            ArtifactKind::Service => "service",
            ArtifactKind::Directive => "directive",
            ArtifactKind::Config => "config",
            ArtifactKind::Store => "store",
            ArtifactKind::Routing => "routing",
            ArtifactKind::Test => "test",
            ArtifactKind::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// One file as delivered by the external scanner.
///
/// The `hint` is a coarse classification the scanner may already have; the
/// in-core classifier refines it into the authoritative [`ArtifactKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub content: String,
    pub size: usize,
    #[serde(default)]
    pub hint: Option<ArtifactKind>,
}

impl ScannedFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let content = content.into();
        let size = content.len();
        Self {
            path: path.into(),
            content,
            size,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: ArtifactKind) -> Self {
        self.hint = Some(hint);
        self
    }
}

/// A source artifact with its authoritative classification.
///
/// Created once per scanned file and never mutated afterwards; rules only
/// ever borrow it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceArtifact {
    pub path: PathBuf,
    pub content: String,
    pub kind: ArtifactKind,
    pub size: usize,
}

impl SourceArtifact {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>, kind: ArtifactKind) -> Self {
        let content = content.into();
        let size = content.len();
        Self {
            path: path.into(),
            content,
            kind,
            size,
        }
    }

    /// Path as a lossy UTF-8 string, for matching and display.
    pub fn path_str(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Exact position of a finding within an artifact.
///
/// Lines and columns are 1-based; 0 means "not derivable".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: u32,
    pub col: u32,
}

impl Location {
    pub fn new(path: impl Into<PathBuf>, line: u32, col: u32) -> Self {
        Self {
            path: path.into(),
            line,
            col,
        }
    }
}

/// A single reported anti-pattern occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub rule: RuleId,
    pub severity: Severity,
    pub location: Location,
    pub message: String,
    pub remediation: String,
    pub category: RuleCategory,
}

impl Finding {
    /// Build a finding with a deterministic ID derived from its identity.
    pub fn new(
        rule: RuleId,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Self {
        let message = message.into();
        let id = deterministic_finding_id(
            rule.as_str(),
            &location.path.to_string_lossy(),
            location.line,
            &message,
        );
        Self {
            id,
            rule,
            severity,
            location,
            message,
            remediation: remediation.into(),
            category: rule.category(),
        }
    }

    /// Identity used for deduplication: at most one finding may exist per
    /// `(path, rule, line)` in a result.
    pub fn identity(&self) -> (PathBuf, RuleId, u32) {
        (self.location.path.clone(), self.rule, self.location.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::ids::TemplateRule;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn finding_ids_are_deterministic() {
        let a = deterministic_finding_id("missing-track-by", "a.html", 3, "msg");
        let b = deterministic_finding_id("missing-track-by", "a.html", 3, "msg");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);

        let c = deterministic_finding_id("missing-track-by", "a.html", 4, "msg");
        assert_ne!(a, c);
    }

    #[test]
    fn finding_derives_category_from_rule() {
        let f = Finding::new(
            RuleId::Template(TemplateRule::MissingTrackBy),
            Severity::Medium,
            Location::new("a.html", 1, 1),
            "missing trackBy",
            "add a trackBy function",
        );
        assert_eq!(f.category, RuleCategory::TemplateRendering);
        assert_eq!(f.rule.as_str(), "missing-track-by");
    }

    #[test]
    fn scanned_file_records_size() {
        let f = ScannedFile::new("x.ts", "abc");
        assert_eq!(f.size, 3);
        assert!(f.hint.is_none());
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Critical).unwrap(),
            "\"critical\""
        );
    }
}
