//! Rule dispatcher
//!
//! Runs every rule registered for an artifact's kind, in registration
//! order, and isolates failures: a rule that returns `Err` or panics
//! contributes zero findings and a warning, and its siblings still run.

use crate::companion::CompanionLookup;
use crate::config::RuleConfig;
use crate::models::SourceArtifact;
use crate::report::{ArtifactReport, EngineWarning};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::registry::RuleRegistry;
use crate::template::StructuralFacts;
use rustc_hash::FxHashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Evaluates rules for single artifacts. Immutable once built; safe to
/// share across worker threads.
pub struct RuleEngine {
    registry: RuleRegistry,
    config: RuleConfig,
}

impl RuleEngine {
    pub fn new(registry: RuleRegistry, config: RuleConfig) -> Self {
        Self { registry, config }
    }

    /// Engine with the built-in rule set.
    pub fn with_defaults(config: RuleConfig) -> Self {
        Self::new(RuleRegistry::with_defaults(), config)
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut RuleRegistry {
        &mut self.registry
    }

    /// Run every applicable rule against one artifact.
    ///
    /// Findings come back in rule-registration order, each rule's output
    /// sorted by line and de-duplicated by line.
    pub fn evaluate(
        &self,
        artifact: &SourceArtifact,
        facts: Option<&StructuralFacts>,
        companions: &dyn CompanionLookup,
    ) -> ArtifactReport {
        let mut report = ArtifactReport::default();
        let ctx = RuleContext {
            artifact,
            facts,
            companions,
            config: &self.config,
        };

        for rule in self.registry.rules_for(artifact.kind) {
            match self.run_rule(rule, &ctx) {
                Ok(mut findings) => {
                    findings.sort_by_key(|f| (f.location.line, f.location.col));
                    // One finding per (rule, line), even if a rule misbehaves.
                    let mut lines = FxHashSet::default();
                    findings.retain(|f| lines.insert(f.location.line));
                    report.findings.extend(findings);
                }
                Err(message) => {
                    warn!(
                        "rule {} failed on {}: {}",
                        rule.id(),
                        artifact.path.display(),
                        message
                    );
                    report.warnings.push(EngineWarning {
                        artifact: artifact.path.clone(),
                        rule: Some(rule.id()),
                        message,
                    });
                }
            }
        }

        debug!(
            "{}: {} findings, {} warnings",
            artifact.path.display(),
            report.findings.len(),
            report.warnings.len()
        );
        report
    }

    /// Invoke one rule, converting both `Err` and panics into messages.
    fn run_rule(
        &self,
        rule: &Arc<dyn Rule>,
        ctx: &RuleContext<'_>,
    ) -> Result<Vec<crate::models::Finding>, String> {
        let outcome = catch_unwind(AssertUnwindSafe(|| rule.check(ctx)));
        match outcome {
            Ok(Ok(findings)) => Ok(findings),
            Ok(Err(err)) => Err(err.to_string()),
            Err(panic_info) => {
                let message = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic".to_string()
                };
                Err(format!("panic: {message}"))
            }
        }
    }
}
