//! Forms rules
//!
//! Template-driven forms that outgrew ngModel, reactive form groups nested
//! past reason, and form streams without teardown.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{FormsRule, RuleId};
use crate::rules::reactivity::has_cleanup;
use crate::rules::text::{
    call_argument_span, count_token, first_token_line, line_col, token_offsets,
};
use anyhow::Result;

const VALIDATION_MARKERS: &[&str] = &["required", "minlength", "maxlength", "pattern="];

/// Template-driven forms past a handful of ngModel bindings become
/// unmanageable; reactive forms scale better.
pub struct OversizedTemplateFormRule;

impl Rule for OversizedTemplateFormRule {
    fn id(&self) -> RuleId {
        RuleId::Forms(FormsRule::OversizedTemplateForm)
    }

    fn description(&self) -> &'static str {
        "Template-driven form with too many ngModel bindings"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let count = count_token(content, "ngModel");
        if count <= ctx.config.forms.max_ng_model_bindings {
            return Ok(vec![]);
        }
        let line = first_token_line(content, "ngModel").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            1,
            format!("{count} ngModel bindings in one form"),
            "Convert to a reactive FormGroup; template-driven forms this size lose \
             typed values, cross-field validation, and testability.",
        )])
    }
}

/// A form that accepts anything usually means validation lives nowhere.
pub struct MissingFormValidationRule;

impl Rule for MissingFormValidationRule {
    fn id(&self) -> RuleId {
        RuleId::Forms(FormsRule::MissingFormValidation)
    }

    fn description(&self) -> &'static str {
        "Form without any validation attributes"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let Some(line) = first_token_line(content, "<form") else {
            return Ok(vec![]);
        };
        if VALIDATION_MARKERS.iter().any(|m| content.contains(m))
            || content.contains("formControlName")
        {
            return Ok(vec![]);
        }
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Low,
            line,
            1,
            "form declares no validation",
            "Add required/minlength/pattern attributes or wire the form to a \
             validated FormGroup; otherwise bad input surfaces as server errors.",
        )])
    }
}

/// FormGroups nested deeper than the budget are hard to address and patch.
pub struct NestedFormGroupDepthRule;

impl NestedFormGroupDepthRule {
    /// Depth of the `new FormGroup(` chain rooted at `offset`.
    fn group_depth(content: &str, offset: usize, budget: usize) -> usize {
        if budget == 0 {
            return 1;
        }
        let Some(span) = call_argument_span(content, offset) else {
            return 1;
        };
        let inner_max = token_offsets(&content[span.clone()], "new FormGroup(")
            .into_iter()
            .map(|rel| Self::group_depth(content, span.start + rel + 4, budget - 1))
            .max()
            .unwrap_or(0);
        1 + inner_max
    }
}

impl Rule for NestedFormGroupDepthRule {
    fn id(&self) -> RuleId {
        RuleId::Forms(FormsRule::NestedFormGroupDepth)
    }

    fn description(&self) -> &'static str {
        "FormGroups nested deeper than the configured budget"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let max_depth = ctx.config.forms.max_group_depth;
        let offsets = token_offsets(content, "new FormGroup(");

        for &off in &offsets {
            // Only measure from roots, not groups inside another group.
            let inside_another = offsets.iter().any(|&other| {
                other != off
                    && call_argument_span(content, other + 4)
                        .is_some_and(|span| span.contains(&off))
            });
            if inside_another {
                continue;
            }
            let depth = Self::group_depth(content, off + 4, max_depth + 2);
            if depth > max_depth {
                let (line, col) = line_col(content, off);
                return Ok(vec![ctx.finding(
                    self.id(),
                    Severity::Low,
                    line,
                    col,
                    format!("form groups nest {depth} levels deep"),
                    "Flatten the model or extract sub-forms into child components \
                     with their own groups; deep paths make patchValue and error \
                     display brittle.",
                )]);
            }
        }
        Ok(vec![])
    }
}

/// Reading input values off the DOM sidesteps the form model entirely.
pub struct ManualDomValueAccessRule;

impl Rule for ManualDomValueAccessRule {
    fn id(&self) -> RuleId {
        RuleId::Forms(FormsRule::ManualDomValueAccess)
    }

    fn description(&self) -> &'static str {
        "Input values read directly from the DOM"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const MARKERS: &[&str] = &[".nativeElement.value", ").value"];
        let content = ctx.content();
        let mut findings = Vec::new();
        for marker in MARKERS {
            for off in token_offsets(content, marker) {
                // `).value` only counts after a DOM query.
                if *marker == ").value" {
                    let prefix = &content[off.saturating_sub(80)..off];
                    if !prefix.contains("getElementById(") && !prefix.contains("querySelector(") {
                        continue;
                    }
                }
                let (line, col) = line_col(content, off);
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Medium,
                    line,
                    col,
                    "input value read from the DOM",
                    "Bind the control to the form model and read from there; DOM \
                     reads bypass value accessors, validators, and typing.",
                ));
            }
        }
        findings.sort_by_key(|f| f.location.line);
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// valueChanges streams subscribed without teardown outlive the form.
pub struct FormValueChangesLeakRule;

impl Rule for FormValueChangesLeakRule {
    fn id(&self) -> RuleId {
        RuleId::Forms(FormsRule::FormValueChangesLeak)
    }

    fn description(&self) -> &'static str {
        "valueChanges subscription without cleanup"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if !content.contains("valueChanges") || !content.contains(".subscribe(") {
            return Ok(vec![]);
        }
        if has_cleanup(content) {
            return Ok(vec![]);
        }
        let line = first_token_line(content, "valueChanges").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::High,
            line,
            1,
            "valueChanges subscribed without a cleanup path",
            "Pipe through takeUntilDestroyed() or unsubscribe in ngOnDestroy; form \
             streams emit for as long as the control exists.",
        )])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactKind;
    use crate::rules::base::testutil::run_rule;

    #[test]
    fn oversized_template_form_flagged() {
        let mut markup = String::from("<form>\n");
        for i in 0..12 {
            markup.push_str(&format!("  <input name=\"f{i}\" [(ngModel)]=\"m.f{i}\">\n"));
        }
        markup.push_str("</form>\n");
        let findings = run_rule(
            &OversizedTemplateFormRule,
            "f.component.html",
            &markup,
            ArtifactKind::Template,
            None,
        );
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn form_without_validation_flagged() {
        let markup = "<form (ngSubmit)=\"save()\">\n  <input name=\"email\">\n</form>\n";
        let findings = run_rule(
            &MissingFormValidationRule,
            "f.component.html",
            markup,
            ArtifactKind::Template,
            None,
        );
        assert_eq!(findings.len(), 1);

        let validated = markup.replace("<input name=\"email\">", "<input name=\"email\" required>");
        assert!(run_rule(
            &MissingFormValidationRule,
            "f.component.html",
            &validated,
            ArtifactKind::Template,
            None
        )
        .is_empty());
    }

    #[test]
    fn nested_form_groups_flagged_past_budget() {
        let src = "form = new FormGroup({\n  a: new FormGroup({\n    b: new FormGroup({\n      c: new FormGroup({\n        d: new FormGroup({ e: new FormControl('') }),\n      }),\n    }),\n  }),\n});\n";
        let findings =
            run_rule(&NestedFormGroupDepthRule, "f.ts", src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn shallow_form_groups_are_quiet() {
        let src = "form = new FormGroup({ name: new FormControl(''), address: new FormGroup({ city: new FormControl('') }) });\n";
        assert!(
            run_rule(&NestedFormGroupDepthRule, "f.ts", src, ArtifactKind::Component, None)
                .is_empty()
        );
    }

    #[test]
    fn dom_value_access_flagged() {
        let src = "const email = document.getElementById('email').value;\n";
        let findings = run_rule(&ManualDomValueAccessRule, "f.ts", src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn value_changes_leak_flagged() {
        let src = "this.form.valueChanges.subscribe(v => this.preview(v));\n";
        let findings = run_rule(&FormValueChangesLeakRule, "f.ts", src, ArtifactKind::Component, None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }
}
