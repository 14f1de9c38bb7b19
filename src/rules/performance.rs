//! Performance rules
//!
//! Change-detection pressure and payload weight: default change detection on
//! large components, work done in getters, whole-library imports, and
//! templates whose companion source has outgrown its budget.

use crate::companion::template_source_sibling;
use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{PerformanceRule, RuleId};
use crate::rules::text::{
    count_token, first_token_line, line_col, matching_delimiter, token_offsets,
};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static FULL_IMPORT: OnceLock<Regex> = OnceLock::new();
static GETTER: OnceLock<Regex> = OnceLock::new();

fn full_import() -> &'static Regex {
    FULL_IMPORT.get_or_init(|| {
        Regex::new(
            r#"import\s+(?:\*\s+as\s+\w+|\w+)\s+from\s+['"](lodash|moment|rxjs|date-fns)['"]"#,
        )
        .unwrap()
    })
}

fn getter() -> &'static Regex {
    GETTER.get_or_init(|| Regex::new(r"\bget\s+(\w+)\s*\(\s*\)").unwrap())
}

const LOOP_MARKERS: &[&str] = &[
    "for (",
    "for(",
    "while (",
    "while(",
    ".filter(",
    ".reduce(",
    ".sort(",
    ".map(",
];

/// Components on default change detection re-render on every tick.
pub struct MissingOnPushRule;

impl Rule for MissingOnPushRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::MissingOnPush)
    }

    fn description(&self) -> &'static str {
        "Component without OnPush change detection"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if !content.contains("@Component(") {
            return Ok(vec![]);
        }
        if content.contains("ChangeDetectionStrategy.OnPush") {
            return Ok(vec![]);
        }
        let large = ctx.artifact.line_count() > ctx.config.performance.onpush_line_threshold;
        let severity = if large { Severity::Medium } else { Severity::Low };
        let line = first_token_line(content, "@Component(").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            severity,
            line,
            1,
            "component uses default change detection",
            "Set changeDetection: ChangeDetectionStrategy.OnPush and drive the view \
             from inputs, observables, or signals; default strategy re-checks this \
             component on every application tick.",
        )])
    }
}

/// Frequent manual detectChanges() calls paper over a modeling problem.
pub struct ManualChangeDetectionOveruseRule;

impl Rule for ManualChangeDetectionOveruseRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::ManualChangeDetectionOveruse)
    }

    fn description(&self) -> &'static str {
        "detectChanges() called repeatedly"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let count = count_token(content, ".detectChanges()");
        if count <= ctx.config.performance.max_detect_changes {
            return Ok(vec![]);
        }
        let line = first_token_line(content, ".detectChanges()").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            1,
            format!("{count} manual detectChanges() calls"),
            "Model the data as observables or signals so change detection follows \
             automatically; scattered manual triggers hide ordering bugs.",
        )])
    }
}

/// Getters run on every change detection pass; loops inside them multiply.
pub struct HeavyGetterRule;

impl Rule for HeavyGetterRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::HeavyGetter)
    }

    fn description(&self) -> &'static str {
        "Getter does iteration work"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for caps in getter().captures_iter(content) {
            let m = caps.get(0).expect("match exists");
            let Some(open_rel) = content[m.end()..].find('{') else {
                continue;
            };
            let open = m.end() + open_rel;
            // A ':' before the brace is a return type; the brace still opens the body.
            let Some(close) = matching_delimiter(content, open) else {
                continue;
            };
            let body = &content[open..close];
            if !LOOP_MARKERS.iter().any(|l| body.contains(l)) {
                continue;
            }
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                format!("getter `{}` iterates over data", &caps[1]),
                "Compute once when the inputs change (memoized field, computed \
                 signal, or pure pipe); getters execute on every change detection \
                 pass.",
            ));
        }
        Ok(findings)
    }
}

/// Importing a whole utility library defeats tree shaking.
pub struct FullLibraryImportRule;

impl Rule for FullLibraryImportRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::FullLibraryImport)
    }

    fn description(&self) -> &'static str {
        "Whole utility library imported"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for caps in full_import().captures_iter(content) {
            let m = caps.get(0).expect("match exists");
            let lib = &caps[1];
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                format!("entire `{lib}` package imported"),
                "Import the specific entry points you use (e.g. lodash-es \
                 per-function imports, rxjs/operators); whole-package imports drag \
                 the full library into the bundle.",
            ));
        }
        Ok(findings)
    }
}

/// setInterval polling keeps the zone busy and the radio awake.
pub struct IntervalPollingRule;

impl Rule for IntervalPollingRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::IntervalPolling)
    }

    fn description(&self) -> &'static str {
        "setInterval used for polling"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for off in token_offsets(content, "setInterval(") {
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "setInterval drives periodic work",
                "Use an rxjs timer/interval piped through takeUntilDestroyed (or \
                 server push); raw setInterval escapes teardown and triggers zone \
                 change detection on every tick.",
            ));
        }
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Below-the-fold images should lazy-load once a template carries several.
pub struct MissingLazyImageRule;

impl Rule for MissingLazyImageRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::MissingLazyImage)
    }

    fn description(&self) -> &'static str {
        "Image-heavy template without lazy loading"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        static IMG: OnceLock<Regex> = OnceLock::new();
        let img = IMG.get_or_init(|| Regex::new(r"(?i)<img(\s[^>]*)?>").unwrap());

        let content = ctx.content();
        let tags: Vec<_> = img.find_iter(content).collect();
        if tags.len() < ctx.config.template.min_images_for_lazy {
            return Ok(vec![]);
        }
        let Some(first_eager) = tags.iter().find(|m| !m.as_str().contains("loading=")) else {
            return Ok(vec![]);
        };
        let (line, col) = line_col(content, first_eager.start());
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Low,
            line,
            col,
            format!("{} images load eagerly", tags.len()),
            "Add loading=\"lazy\" (or ngSrc with priority only above the fold) so \
             off-screen images stop competing with the initial render.",
        )])
    }
}

/// Uses the companion source's size as a split-point signal for the view.
pub struct BundleBudgetExceededRule;

impl Rule for BundleBudgetExceededRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::BundleBudgetExceeded)
    }

    fn description(&self) -> &'static str {
        "Companion source exceeds the bundle budget"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(sibling) = template_source_sibling(&ctx.artifact.path) else {
            return Ok(vec![]);
        };
        let Some(source) = ctx.companions.try_read(&sibling) else {
            return Ok(vec![]);
        };
        let min_bytes = ctx.config.bundle_budget.min_bytes;
        if source.len() < min_bytes {
            return Ok(vec![]);
        }
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            1,
            1,
            format!(
                "companion source weighs {} bytes (budget {})",
                source.len(),
                min_bytes
            ),
            "Split the feature into lazily loaded children; a component this heavy \
             lands in the initial bundle of every route that references it.",
        )])
    }
}

/// Function calls under an ngFor multiply per item, per check.
pub struct FunctionCallInHotPathRule;

impl Rule for FunctionCallInHotPathRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::FunctionCallInHotPath)
    }

    fn description(&self) -> &'static str {
        "Many bound function calls in a repeated view"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        if facts.structural_directive_count == 0 {
            return Ok(vec![]);
        }
        let calls = facts.function_call_sites.len();
        if calls < ctx.config.template.max_function_calls {
            return Ok(vec![]);
        }
        let line = facts
            .function_call_sites
            .iter()
            .map(|c| c.line)
            .filter(|&l| l > 0)
            .min()
            .unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::High,
            line,
            1,
            format!("{calls} bound function calls in a template that repeats rows"),
            "Precompute per-item values on the model before binding; calls inside a \
             repeated view run once per row on every change detection pass.",
        )])
    }
}

/// Inline templates past the budget belong in their own file.
pub struct LargeInlineTemplateRule;

impl Rule for LargeInlineTemplateRule {
    fn id(&self) -> RuleId {
        RuleId::Performance(PerformanceRule::LargeInlineTemplate)
    }

    fn description(&self) -> &'static str {
        "Inline template grew past the configured size"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let Some(off) = token_offsets(content, "template:").into_iter().next() else {
            return Ok(vec![]);
        };
        let Some(tick_rel) = content[off..].find('`') else {
            return Ok(vec![]);
        };
        let start = off + tick_rel + 1;
        let Some(end_rel) = content[start..].find('`') else {
            return Ok(vec![]);
        };
        let template = &content[start..start + end_rel];
        let lines = template.lines().count();
        if lines <= ctx.config.performance.max_inline_template_lines {
            return Ok(vec![]);
        }
        let (line, col) = line_col(content, off);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            col,
            format!("inline template spans {lines} lines"),
            "Move the markup to a templateUrl file; long inline templates lose \
             editor tooling and bloat the component source.",
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::InMemoryCompanions;
    use crate::config::RuleConfig;
    use crate::models::{ArtifactKind, SourceArtifact};
    use crate::rules::base::testutil::run_rule;
    use crate::rules::base::RuleContext;
    use crate::template::TemplateAnalyzer;

    #[test]
    fn missing_onpush_low_for_small_components() {
        let src = "@Component({ selector: 'x' })\nexport class XComponent {}\n";
        let findings = run_rule(&MissingOnPushRule, "x.component.ts", src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn onpush_component_is_quiet() {
        let src = "@Component({ changeDetection: ChangeDetectionStrategy.OnPush })\nclass X {}\n";
        assert!(run_rule(&MissingOnPushRule, "x.ts", src, ArtifactKind::Component, None).is_empty());
    }

    #[test]
    fn heavy_getter_flagged() {
        let src = "export class C {\n  get total(): number {\n    return this.items.reduce((a, b) => a + b.price, 0);\n  }\n}\n";
        let findings = run_rule(&HeavyGetterRule, "c.ts", src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("total"));
    }

    #[test]
    fn trivial_getter_is_quiet() {
        let src = "export class C {\n  get name(): string { return this._name; }\n}\n";
        assert!(run_rule(&HeavyGetterRule, "c.ts", src, ArtifactKind::Component, None).is_empty());
    }

    #[test]
    fn full_library_import_flagged() {
        let src = "import * as _ from 'lodash';\nimport moment from 'moment';\n";
        let findings = run_rule(&FullLibraryImportRule, "c.ts", src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn named_imports_are_quiet() {
        let src = "import { debounce } from 'lodash-es';\nimport { map } from 'rxjs/operators';\n";
        assert!(run_rule(&FullLibraryImportRule, "c.ts", src, ArtifactKind::Component, None)
            .is_empty());
    }

    #[test]
    fn bundle_budget_uses_companion_size() {
        let markup = "<div></div>";
        let artifact = SourceArtifact::new("big.component.html", markup, ArtifactKind::Template);
        let companions = InMemoryCompanions::new();
        companions.insert("big.component.ts", "x".repeat(600_000));
        let config = RuleConfig::default();
        let facts = TemplateAnalyzer::new().analyze(markup);
        let ctx = RuleContext {
            artifact: &artifact,
            facts: Some(&facts),
            companions: &companions,
            config: &config,
        };
        let findings = BundleBudgetExceededRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn bundle_budget_absent_companion_is_quiet() {
        let markup = "<div></div>";
        let facts = TemplateAnalyzer::new().analyze(markup);
        let findings = run_rule(
            &BundleBudgetExceededRule,
            "big.component.html",
            markup,
            ArtifactKind::Template,
            Some(&facts),
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn hot_path_calls_require_repeat_and_volume() {
        let few = "<li *ngFor=\"let x of xs\">{{ f(x) }}</li>";
        let facts = TemplateAnalyzer::new().analyze(few);
        assert!(run_rule(
            &FunctionCallInHotPathRule,
            "t.html",
            few,
            ArtifactKind::Template,
            Some(&facts)
        )
        .is_empty());

        let many = "<li *ngFor=\"let x of xs\">{{ a(x) }}{{ b(x) }}{{ c(x) }}{{ d(x) }}{{ e(x) }}</li>";
        let facts = TemplateAnalyzer::new().analyze(many);
        let findings = run_rule(
            &FunctionCallInHotPathRule,
            "t.html",
            many,
            ArtifactKind::Template,
            Some(&facts),
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn large_inline_template_flagged() {
        let mut src = String::from("@Component({\n  template: `\n");
        for i in 0..50 {
            src.push_str(&format!("    <p>row {i}</p>\n"));
        }
        src.push_str("  `,\n})\nclass X {}\n");
        let findings =
            run_rule(&LargeInlineTemplateRule, "x.ts", &src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 1);
    }
}
