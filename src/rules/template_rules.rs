//! Template and rendering rules
//!
//! These rules consume the shared [`StructuralFacts`] record where possible
//! and fall back to targeted regex scans over the raw markup for signals the
//! facts do not carry.

use crate::companion::template_source_sibling;
use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{RuleId, TemplateRule};
use crate::rules::text::{count_token, first_token_line, line_col, token_offsets};
use crate::template::fallback;
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static IF_AND_FOR_TAG: OnceLock<Regex> = OnceLock::new();
static IMG_TAG: OnceLock<Regex> = OnceLock::new();
static BLANK_TARGET_TAG: OnceLock<Regex> = OnceLock::new();
static ANY_TAG: OnceLock<Regex> = OnceLock::new();

fn if_and_for_tag() -> &'static Regex {
    IF_AND_FOR_TAG.get_or_init(|| {
        Regex::new(r"<[^>]*(?:\*ngIf[^>]*\*ngFor|\*ngFor[^>]*\*ngIf)[^>]*>").unwrap()
    })
}

fn img_tag() -> &'static Regex {
    IMG_TAG.get_or_init(|| Regex::new(r"(?i)<img(\s[^>]*)?>").unwrap())
}

fn blank_target_tag() -> &'static Regex {
    BLANK_TARGET_TAG.get_or_init(|| Regex::new(r#"<a\s[^>]*target\s*=\s*"_blank"[^>]*>"#).unwrap())
}

fn any_tag() -> &'static Regex {
    ANY_TAG.get_or_init(|| Regex::new(r"</?([A-Za-z][A-Za-z0-9-]*)[^>]*?(/)?>").unwrap())
}

/// Flags `*ngFor` loops that render without a track function.
///
/// Severity escalates when the conventional companion source shows a
/// large-collection signal; a missing or unreadable companion is simply
/// no evidence and leaves the finding at MEDIUM.
pub struct MissingTrackByRule;

impl Rule for MissingTrackByRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::MissingTrackBy)
    }

    fn description(&self) -> &'static str {
        "ngFor without trackBy re-creates DOM nodes on every change"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        let has_ng_for = facts.structural_directive_count > 0
            || facts.structural_directives.iter().any(|d| d.name == "ngFor");
        if !has_ng_for || facts.has_track_by {
            return Ok(vec![]);
        }

        let mut severity = Severity::Medium;
        if let Some(sibling) = template_source_sibling(&ctx.artifact.path) {
            if let Some(source) = ctx.companions.try_read(&sibling) {
                let markers = &ctx.config.template.large_collection_markers;
                if markers.iter().any(|m| source.contains(m.as_str())) {
                    severity = Severity::High;
                }
            }
        }

        let line = first_token_line(ctx.content(), "*ngFor").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            severity,
            line,
            1,
            "*ngFor iterates without a trackBy function",
            "Provide trackBy with a stable identity so Angular reuses DOM nodes \
             instead of destroying and re-creating the whole list on each change.",
        )])
    }
}

/// Flags function calls evaluated inside binding expressions.
pub struct TemplateFunctionCallsRule;

impl Rule for TemplateFunctionCallsRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::TemplateFunctionCalls)
    }

    fn description(&self) -> &'static str {
        "Function calls in bindings re-run on every change detection cycle"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        let escalate = facts.function_call_sites.len() >= ctx.config.template.max_function_calls;
        let severity = if escalate { Severity::High } else { Severity::Medium };

        Ok(facts
            .function_call_sites
            .iter()
            .map(|site| {
                ctx.finding(
                    self.id(),
                    severity,
                    site.line,
                    site.col,
                    format!("binding expression calls a function: `{}`", site.expression),
                    "Precompute the value in the component, memoize it, or expose it \
                     through a pure pipe so change detection stays cheap.",
                )
            })
            .collect())
    }
}

/// Flags raw-HTML bindings that bypass sanitization review.
pub struct UnsafeInnerHtmlRule;

impl Rule for UnsafeInnerHtmlRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::UnsafeInnerHtml)
    }

    fn description(&self) -> &'static str {
        "Binding [innerHTML] renders markup from data"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        if !facts.unsafe_inner_html {
            return Ok(vec![]);
        }
        let line = first_token_line(ctx.content(), "[innerHTML]").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::High,
            line,
            1,
            "[innerHTML] binds markup directly into the DOM",
            "Render the value with interpolation, or sanitize it explicitly with \
             DomSanitizer and document why the markup is trusted.",
        )])
    }
}

/// Nested `<a>` elements are invalid HTML; browsers re-parent them, so
/// server-rendered and hydrated DOM disagree.
pub struct NestedAnchorTagsRule;

impl Rule for NestedAnchorTagsRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::NestedAnchorTags)
    }

    fn description(&self) -> &'static str {
        "Nested anchor tags cause hydration mismatches"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        if !facts.nested_anchor_tags {
            return Ok(vec![]);
        }
        let line = first_token_line(ctx.content(), "<a").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Critical,
            line,
            1,
            "anchor element nested inside another anchor",
            "Restructure so links are siblings; browsers re-parent nested anchors, \
             which breaks hydration of server-rendered pages.",
        )])
    }
}

/// Flags non-deterministic value sources rendered into the template.
pub struct NonDeterministicRenderingRule;

impl Rule for NonDeterministicRenderingRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::NonDeterministicRendering)
    }

    fn description(&self) -> &'static str {
        "Random or clock values render differently on server and client"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        if !facts.dynamic_content_detected {
            return Ok(vec![]);
        }
        let line = ["Math.random(", "Date.now(", "new Date("]
            .iter()
            .filter_map(|m| first_token_line(ctx.content(), m))
            .min()
            .unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::High,
            line,
            1,
            "template renders a non-deterministic value",
            "Compute the value once in the component (or transfer it from the \
             server) so both render passes agree.",
        )])
    }
}

/// Flags templates carrying more structural directives than configured.
pub struct StructuralDirectiveOverloadRule;

impl Rule for StructuralDirectiveOverloadRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::StructuralDirectiveOverload)
    }

    fn description(&self) -> &'static str {
        "Too many structural directives in one template"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let Some(facts) = ctx.facts else {
            return Ok(vec![]);
        };
        let count = facts.structural_directives.len();
        if count <= ctx.config.template.max_structural_directives {
            return Ok(vec![]);
        }
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            1,
            1,
            format!("template declares {count} structural directives"),
            "Split the view into child components; heavy conditional structure in \
             one template is hard to test and re-renders as a unit.",
        )])
    }
}

/// `*ngIf` and `*ngFor` on one element have an undefined evaluation order.
pub struct NgIfForSameElementRule;

impl Rule for NgIfForSameElementRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::NgIfForSameElement)
    }

    fn description(&self) -> &'static str {
        "ngIf and ngFor on the same element"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        Ok(if_and_for_tag()
            .find_iter(ctx.content())
            .map(|m| {
                let (line, col) = line_col(ctx.content(), m.start());
                ctx.finding(
                    self.id(),
                    Severity::High,
                    line,
                    col,
                    "*ngIf and *ngFor share one element",
                    "Move the *ngIf onto an <ng-container> wrapper; combining both \
                     on one element relies on an implicit precedence readers miss.",
                )
            })
            .collect())
    }
}

/// Flags long or ternary-heavy binding expressions.
pub struct ComplexTemplateExpressionRule;

impl Rule for ComplexTemplateExpressionRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::ComplexTemplateExpression)
    }

    fn description(&self) -> &'static str {
        "Binding expression too complex to read in the template"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.template;
        let mut findings = Vec::new();
        for (expr, offset) in fallback::interpolations(ctx.content()) {
            let too_long = expr.trim().len() > cfg.max_expression_length;
            let ternaries = expr.matches('?').count();
            let too_branchy = ternaries > cfg.max_expression_ternaries;
            if !too_long && !too_branchy {
                continue;
            }
            let severity = if too_long && too_branchy {
                Severity::Medium
            } else {
                Severity::Low
            };
            let (line, col) = line_col(ctx.content(), offset);
            findings.push(ctx.finding(
                self.id(),
                severity,
                line,
                col,
                "interpolated expression is hard to follow",
                "Move the expression into a component getter-free field or a pure \
                 pipe with a descriptive name.",
            ));
        }
        Ok(findings)
    }
}

/// Counts inline `style=` attributes against the configured budget.
pub struct InlineStyleOverloadRule;

impl Rule for InlineStyleOverloadRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::InlineStyleOverload)
    }

    fn description(&self) -> &'static str {
        "Inline styles scattered through the template"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let count = count_token(ctx.content(), " style=\"");
        if count <= ctx.config.template.max_inline_styles {
            return Ok(vec![]);
        }
        let line = first_token_line(ctx.content(), " style=\"").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Low,
            line,
            1,
            format!("{count} inline style attributes in one template"),
            "Move presentation into the component stylesheet; inline styles defeat \
             theming and are invisible to style tooling.",
        )])
    }
}

/// Images without explicit dimensions shift layout when they load.
pub struct ImageMissingDimensionsRule;

impl Rule for ImageMissingDimensionsRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::ImageMissingDimensions)
    }

    fn description(&self) -> &'static str {
        "Image without width/height causes layout shift"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for m in img_tag().find_iter(ctx.content()) {
            let tag = m.as_str();
            if tag.contains("width") && tag.contains("height") {
                continue;
            }
            if tag.contains("fill") {
                continue; // ngSrc fill mode sizes from the parent
            }
            let (line, col) = line_col(ctx.content(), m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "image has no explicit width and height",
                "Declare width and height (or ngSrc with fill) so the browser can \
                 reserve space before the image loads.",
            ));
        }
        Ok(findings)
    }
}

/// `target="_blank"` without `rel="noopener"` leaks the opener handle.
pub struct AnchorTargetBlankRule;

impl Rule for AnchorTargetBlankRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::AnchorTargetBlank)
    }

    fn description(&self) -> &'static str {
        "target=\"_blank\" links without rel=\"noopener\""
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let mut findings = Vec::new();
        for m in blank_target_tag().find_iter(ctx.content()) {
            if m.as_str().contains("noopener") {
                continue;
            }
            let (line, col) = line_col(ctx.content(), m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "external link opens without rel=\"noopener\"",
                "Add rel=\"noopener noreferrer\" so the opened page cannot reach \
                 back through window.opener.",
            ));
        }
        Ok(findings)
    }
}

/// Flags element nesting deeper than the configured budget.
pub struct DeepComponentNestingRule;

impl Rule for DeepComponentNestingRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::DeepComponentNesting)
    }

    fn description(&self) -> &'static str {
        "Template nests elements deeper than the configured budget"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const VOID: &[&str] = &[
            "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
            "track", "wbr",
        ];
        let mut depth = 0usize;
        let mut max_depth = 0usize;
        let mut max_offset = 0usize;
        for caps in any_tag().captures_iter(ctx.content()) {
            let whole = caps.get(0).expect("match exists");
            let name = caps.get(1).expect("capture 1 exists").as_str().to_ascii_lowercase();
            let self_closing = caps.get(2).is_some() || VOID.contains(&name.as_str());
            if whole.as_str().starts_with("</") {
                depth = depth.saturating_sub(1);
            } else if !self_closing {
                depth += 1;
                if depth > max_depth {
                    max_depth = depth;
                    max_offset = whole.start();
                }
            }
        }
        if max_depth <= ctx.config.template.max_nesting_depth {
            return Ok(vec![]);
        }
        let (line, col) = line_col(ctx.content(), max_offset);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            col,
            format!("element nesting reaches depth {max_depth}"),
            "Extract child components; deeply nested markup is slow to diff and \
             painful to restyle.",
        )])
    }
}

/// `$any()` switches off type checking for the whole subtree expression.
pub struct TemplateAnyCastRule;

impl Rule for TemplateAnyCastRule {
    fn id(&self) -> RuleId {
        RuleId::Template(TemplateRule::TemplateAnyCast)
    }

    fn description(&self) -> &'static str {
        "$any() cast disables template type checking"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        Ok(token_offsets(ctx.content(), "$any(")
            .into_iter()
            .map(|off| {
                let (line, col) = line_col(ctx.content(), off);
                ctx.finding(
                    self.id(),
                    Severity::Low,
                    line,
                    col,
                    "$any() hides the expression from the template type checker",
                    "Fix the underlying type instead of casting; $any spreads through \
                     the expression and masks real errors.",
                )
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::companion::InMemoryCompanions;
    use crate::config::RuleConfig;
    use crate::models::{ArtifactKind, SourceArtifact};
    use crate::rules::base::testutil::run_rule;
    use crate::template::TemplateAnalyzer;

    fn template_findings(rule: &dyn Rule, markup: &str) -> Vec<Finding> {
        let facts = TemplateAnalyzer::new().analyze(markup);
        run_rule(rule, "app/list.component.html", markup, ArtifactKind::Template, Some(&facts))
    }

    #[test]
    fn missing_track_by_defaults_to_medium() {
        let findings =
            template_findings(&MissingTrackByRule, r#"<li *ngFor="let u of users">{{ u.name }}</li>"#);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn missing_track_by_escalates_with_companion_evidence() {
        let markup = r#"<li *ngFor="let u of users">{{ u.name }}</li>"#;
        let facts = TemplateAnalyzer::new().analyze(markup);
        let artifact =
            SourceArtifact::new("app/list.component.html", markup, ArtifactKind::Template);
        let companions = InMemoryCompanions::new();
        companions.insert(
            "app/list.component.ts",
            "export class ListComponent { users = this.api.loadAll(); }",
        );
        let config = RuleConfig::default();
        let ctx = RuleContext {
            artifact: &artifact,
            facts: Some(&facts),
            companions: &companions,
            config: &config,
        };
        let findings = MissingTrackByRule.check(&ctx).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn track_by_present_emits_nothing() {
        let findings = template_findings(
            &MissingTrackByRule,
            r#"<li *ngFor="let u of users; trackBy: byId">{{ u.name }}</li>"#,
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn nested_anchor_is_critical() {
        let findings = template_findings(&NestedAnchorTagsRule, "<a><a></a></a>");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn function_calls_flagged_per_site() {
        let findings = template_findings(
            &TemplateFunctionCallsRule,
            "<p [title]=\"describe(x)\">{{ total() }}</p>",
        );
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Medium));
    }

    #[test]
    fn ng_if_for_same_element_detected() {
        let findings = template_findings(
            &NgIfForSameElementRule,
            r#"<li *ngIf="visible" *ngFor="let u of users">{{ u }}</li>"#,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn image_dimensions_rule_skips_sized_images() {
        let findings = template_findings(
            &ImageMissingDimensionsRule,
            r#"<img src="a.png" width="10" height="10"><img src="b.png">"#,
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn blank_target_needs_noopener() {
        let flagged = template_findings(
            &AnchorTargetBlankRule,
            r#"<a href="https://x" target="_blank">x</a>"#,
        );
        assert_eq!(flagged.len(), 1);

        let safe = template_findings(
            &AnchorTargetBlankRule,
            r#"<a href="https://x" target="_blank" rel="noopener">x</a>"#,
        );
        assert!(safe.is_empty());
    }

    #[test]
    fn any_cast_flagged_per_occurrence() {
        let findings =
            template_findings(&TemplateAnyCastRule, "<p>{{ $any(user).name }} {{ $any(x).y }}</p>");
        assert_eq!(findings.len(), 2);
    }
}
