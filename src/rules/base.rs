//! Rule trait and evaluation context
//!
//! A rule is a pure function from one artifact (plus optional derived facts
//! and companion evidence) to findings. Rules never see each other's output,
//! never share state across artifacts, and source every threshold from the
//! injected [`RuleConfig`].

use crate::companion::CompanionLookup;
use crate::config::RuleConfig;
use crate::models::{Finding, Location, Severity, SourceArtifact};
use crate::rules::ids::RuleId;
use crate::template::StructuralFacts;
use anyhow::Result;

/// Everything a rule may consult for one artifact.
pub struct RuleContext<'a> {
    pub artifact: &'a SourceArtifact,
    /// Present for template artifacts only.
    pub facts: Option<&'a StructuralFacts>,
    pub companions: &'a dyn CompanionLookup,
    pub config: &'a RuleConfig,
}

impl<'a> RuleContext<'a> {
    pub fn content(&self) -> &'a str {
        &self.artifact.content
    }

    /// Location inside the current artifact.
    pub fn location(&self, line: u32, col: u32) -> Location {
        Location::new(self.artifact.path.clone(), line, col)
    }

    /// Shorthand for building a finding against the current artifact.
    pub fn finding(
        &self,
        rule: RuleId,
        severity: Severity,
        line: u32,
        col: u32,
        message: impl Into<String>,
        remediation: impl Into<String>,
    ) -> Finding {
        Finding::new(rule, severity, self.location(line, col), message, remediation)
    }
}

/// Trait implemented by every detection rule.
///
/// # Contract
///
/// - `check` is deterministic for a fixed artifact and config.
/// - Rules must not emit two findings with the same `(path, rule, line)`
///   identity.
/// - An `Err` (or panic) is contained by the engine: the rule contributes
///   zero findings for that artifact and siblings still run.
pub trait Rule: Send + Sync {
    /// Typed identity, stable across runs.
    fn id(&self) -> RuleId;

    /// One-line description of what this rule finds.
    fn description(&self) -> &'static str;

    /// Evaluate the rule against one artifact.
    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>>;
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::companion::NoCompanions;
    use crate::models::ArtifactKind;

    /// Run one rule over an ad-hoc artifact with default config.
    pub fn run_rule(
        rule: &dyn Rule,
        path: &str,
        content: &str,
        kind: ArtifactKind,
        facts: Option<&StructuralFacts>,
    ) -> Vec<Finding> {
        let artifact = SourceArtifact::new(path, content, kind);
        let config = RuleConfig::default();
        let ctx = RuleContext {
            artifact: &artifact,
            facts,
            companions: &NoCompanions,
            config: &config,
        };
        rule.check(&ctx).expect("rule evaluation failed")
    }
}
