//! Engine-wide properties
//!
//! Determinism, filter correctness, aggregation consistency, severity
//! coherence, de-duplication, and rule independence, checked through the
//! public API with a realistic mixed batch.

use nganalyzer::{
    aggregate, AnalysisPipeline, AnalysisResult, ArtifactKind, Finding, NoCompanions, RuleConfig,
    RuleId, ScannedFile, Severity, TemplateAnalyzer,
};
use nganalyzer::rules::{Rule, RuleContext, RuleEngine, RuleRegistry};
use std::sync::Arc;

fn mixed_batch() -> Vec<ScannedFile> {
    vec![
        ScannedFile::new(
            "src/app/list.component.html",
            "<li *ngFor=\"let u of users\">{{ describe(u) }}</li>\n<div [innerHTML]=\"raw\"></div>\n",
        ),
        ScannedFile::new(
            "src/app/leaky.component.ts",
            "@Component({ selector: 'app-leaky' })\nexport class LeakyComponent {\n  load() { this.users$.subscribe(u => this.users = u); }\n}\n",
        ),
        ScannedFile::new(
            "src/app/users.reducer.ts",
            "export const reducer = createReducer(initial,\n  on(add, (state, { user }) => {\n    state.users.push(user);\n    return state;\n  }),\n);\n",
        ),
        ScannedFile::new(
            "src/app/app-routing.module.ts",
            "const routes = [\n  { path: 'admin', component: AdminComponent },\n  { path: 'home', component: HomeComponent },\n];\nRouterModule.forRoot(routes);\n",
        ),
        ScannedFile::new(
            "src/app/list.component.spec.ts",
            "it('loads', () => {\n  service.load();\n});\n",
        ),
    ]
}

fn analyze() -> AnalysisResult {
    AnalysisPipeline::new(RuleConfig::default(), 2)
        .run("proj", mixed_batch(), &NoCompanions)
        .unwrap()
}

#[test]
fn repeated_runs_are_identical() {
    let first = analyze();
    let second = analyze();

    let key = |r: &AnalysisResult| {
        r.findings
            .iter()
            .map(|f| (f.id.clone(), f.rule, f.severity, f.location.clone()))
            .collect::<Vec<_>>()
    };
    assert!(!first.findings.is_empty());
    assert_eq!(key(&first), key(&second));
}

#[test]
fn filtering_retains_a_subset_at_or_above_the_threshold() {
    let result = analyze();
    for min in [Severity::Low, Severity::Medium, Severity::High, Severity::Critical] {
        let filtered = result.filter_by_severity(min);
        assert!(filtered.findings.len() <= result.findings.len());
        assert!(filtered.findings.iter().all(|f| f.severity >= min));
        for f in &filtered.findings {
            assert!(result.findings.iter().any(|orig| orig.id == f.id));
        }
        let twice = filtered.filter_by_severity(min);
        assert_eq!(twice.findings.len(), filtered.findings.len());
    }
}

#[test]
fn counts_are_consistent_with_the_finding_list() {
    let result = analyze();
    let by_severity: usize = result.severity_counts().values().sum();
    let by_category: usize = result.category_counts().values().sum();
    assert_eq!(by_severity, result.findings.len());
    assert_eq!(by_category, result.findings.len());
}

#[test]
fn critical_flag_matches_highest_severity() {
    let result = analyze();
    if result.has_critical_issues() {
        assert_eq!(result.highest_severity(), Some(Severity::Critical));
    } else {
        assert_ne!(result.highest_severity(), Some(Severity::Critical));
    }
    // The reducer mutation in the batch guarantees a critical finding.
    assert!(result.has_critical_issues());
}

#[test]
fn finding_identities_are_unique() {
    let result = analyze();
    let mut seen = std::collections::HashSet::new();
    for f in &result.findings {
        assert!(
            seen.insert((f.location.path.clone(), f.rule, f.location.line)),
            "duplicate identity: {:?} {} line {}",
            f.location.path,
            f.rule,
            f.location.line
        );
    }
}

#[test]
fn malformed_markup_still_yields_phase_one_facts() {
    let analyzer = TemplateAnalyzer::new();
    let facts = analyzer.analyze("<div [innerHTML]=\"raw\" <broken <a><a></a></a>");
    assert!(facts.unsafe_inner_html);
    assert!(facts.nested_anchor_tags);
}

/// A rule that emits the same identity twice; the engine must collapse it.
struct DuplicateEmittingRule;

impl Rule for DuplicateEmittingRule {
    fn id(&self) -> RuleId {
        RuleId::Custom("duplicate-emitter")
    }
    fn description(&self) -> &'static str {
        "emits the same finding twice"
    }
    fn check(&self, ctx: &RuleContext<'_>) -> anyhow::Result<Vec<Finding>> {
        let one = ctx.finding(self.id(), Severity::Medium, 7, 1, "dup", "none");
        Ok(vec![one.clone(), one])
    }
}

#[test]
fn duplicate_emissions_collapse_to_one_finding() {
    let mut registry = RuleRegistry::new();
    registry.register(ArtifactKind::Service, Arc::new(DuplicateEmittingRule));
    let engine = RuleEngine::new(registry, RuleConfig::default());

    let artifact = nganalyzer::SourceArtifact::new(
        "x.service.ts",
        "export class X {}",
        ArtifactKind::Service,
    );
    let report = engine.evaluate(&artifact, None, &NoCompanions);
    assert_eq!(report.findings.len(), 1);
}

struct MarkerRule {
    id: &'static str,
    line: u32,
}

impl Rule for MarkerRule {
    fn id(&self) -> RuleId {
        RuleId::Custom(self.id)
    }
    fn description(&self) -> &'static str {
        "emits one fixed finding"
    }
    fn check(&self, ctx: &RuleContext<'_>) -> anyhow::Result<Vec<Finding>> {
        Ok(vec![ctx.finding(self.id(), Severity::Low, self.line, 1, self.id, "none")])
    }
}

#[test]
fn rule_results_do_not_depend_on_registration_order() {
    let build = |reversed: bool| {
        let mut registry = RuleRegistry::new();
        let mut rules: Vec<Arc<dyn Rule>> = vec![
            Arc::new(MarkerRule { id: "alpha", line: 1 }),
            Arc::new(MarkerRule { id: "beta", line: 2 }),
        ];
        if reversed {
            rules.reverse();
        }
        for rule in rules {
            registry.register(ArtifactKind::Service, rule);
        }
        RuleEngine::new(registry, RuleConfig::default())
    };

    let artifact = nganalyzer::SourceArtifact::new(
        "x.service.ts",
        "export class X {}",
        ArtifactKind::Service,
    );
    let forward = build(false).evaluate(&artifact, None, &NoCompanions);
    let reverse = build(true).evaluate(&artifact, None, &NoCompanions);

    let set = |r: &nganalyzer::report::ArtifactReport| {
        let mut ids: Vec<_> = r
            .findings
            .iter()
            .map(|f| (f.rule.as_str(), f.location.line))
            .collect();
        ids.sort();
        ids
    };
    assert_eq!(set(&forward), set(&reverse));
}

#[test]
fn aggregating_no_reports_is_an_empty_result() {
    use chrono::Utc;
    use std::time::Duration;

    let result = aggregate("proj", vec![], Utc::now(), Duration::ZERO);
    assert!(result.is_empty());
    assert!(result.category_counts().is_empty());
}
