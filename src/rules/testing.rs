//! Testing rules
//!
//! Spec files that assert nothing, focused or disabled tests left behind,
//! and clock installs without teardown.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{RuleId, TestingRule};
use crate::rules::text::{call_argument_span, first_token_line, line_col, token_offsets};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static IT_CALL: OnceLock<Regex> = OnceLock::new();
static FOCUSED: OnceLock<Regex> = OnceLock::new();
static DISABLED: OnceLock<Regex> = OnceLock::new();

fn it_call() -> &'static Regex {
    IT_CALL.get_or_init(|| Regex::new(r"\bit\s*\(").unwrap())
}

fn focused() -> &'static Regex {
    FOCUSED.get_or_init(|| Regex::new(r"\b(fit|fdescribe)\s*\(").unwrap())
}

fn disabled() -> &'static Regex {
    DISABLED.get_or_init(|| Regex::new(r"\b(xit|xdescribe)\s*\(|\bit\.skip\s*\(").unwrap())
}

/// A test body without a single expectation passes no matter what.
///
/// The body of each `it(...)` call is extracted with string-aware delimiter
/// matching so expectations inside nested callbacks still count.
pub struct AssertionFreeTestRule;

impl Rule for AssertionFreeTestRule {
    fn id(&self) -> RuleId {
        RuleId::Testing(TestingRule::AssertionFreeTest)
    }

    fn description(&self) -> &'static str {
        "Test case without any expectation"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in it_call().find_iter(content) {
            let Some(span) = call_argument_span(content, m.start()) else {
                continue;
            };
            let body = &content[span];
            if body.contains("expect(")
                || body.contains("expectAsync(")
                || body.contains("verify(")
                || body.contains("assert")
            {
                continue;
            }
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "test case contains no expectation",
                "Assert the observable outcome, or delete the case; a test without \
                 expectations only proves the code does not throw.",
            ));
        }
        Ok(findings)
    }
}

/// `fit`/`fdescribe` silently skip the rest of the suite in CI.
pub struct FocusedTestRule;

impl Rule for FocusedTestRule {
    fn id(&self) -> RuleId {
        RuleId::Testing(TestingRule::FocusedTest)
    }

    fn description(&self) -> &'static str {
        "Focused test left in the suite"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for caps in focused().captures_iter(content) {
            let m = caps.get(0).expect("match exists");
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                format!("`{}` focuses this spec and skips the rest", &caps[1]),
                "Remove the focus prefix before merging; with it, CI green means \
                 only this block ran.",
            ));
        }
        Ok(findings)
    }
}

/// Disabled tests rot; either fix or delete them.
pub struct DisabledTestRule;

impl Rule for DisabledTestRule {
    fn id(&self) -> RuleId {
        RuleId::Testing(TestingRule::DisabledTest)
    }

    fn description(&self) -> &'static str {
        "Disabled test left in the suite"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in disabled().find_iter(content) {
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "test is disabled",
                "Re-enable with the underlying issue fixed, or delete it with a \
                 pointer to the tracking issue; disabled specs drift from the code \
                 until they can never run again.",
            ));
        }
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Installed fake clocks must be uninstalled or later suites see them.
pub struct MissingAsyncTeardownRule;

impl Rule for MissingAsyncTeardownRule {
    fn id(&self) -> RuleId {
        RuleId::Testing(TestingRule::MissingAsyncTeardown)
    }

    fn description(&self) -> &'static str {
        "Fake time installed without teardown"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();

        if let Some(line) = first_token_line(content, "jasmine.clock().install()") {
            if !content.contains("uninstall()") {
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Low,
                    line,
                    1,
                    "fake clock installed but never uninstalled",
                    "Pair install() with uninstall() in afterEach; a leaked fake \
                     clock makes unrelated suites time-dependent.",
                ));
            }
        }

        if let Some(line) = first_token_line(content, "fakeAsync(") {
            if !content.contains("tick(") && !content.contains("flush(") {
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Low,
                    line,
                    1,
                    "fakeAsync zone without tick() or flush()",
                    "Advance virtual time explicitly; pending timers at the end of a \
                     fakeAsync test fail or leak depending on the framework version.",
                ));
            }
        }

        Ok(findings)
    }
}

/// Console output in specs drowns the reporter signal.
pub struct TestConsoleNoiseRule;

impl Rule for TestConsoleNoiseRule {
    fn id(&self) -> RuleId {
        RuleId::Testing(TestingRule::TestConsoleNoise)
    }

    fn description(&self) -> &'static str {
        "console output inside tests"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for off in token_offsets(content, "console.log(") {
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "console.log left in a spec",
                "Remove it or assert on the value instead; leftover logging buries \
                 real failures in CI output.",
            ));
        }
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactKind;
    use crate::rules::base::testutil::run_rule;

    fn spec_findings(rule: &dyn Rule, content: &str) -> Vec<Finding> {
        run_rule(rule, "app/x.component.spec.ts", content, ArtifactKind::Test, None)
    }

    #[test]
    fn assertion_free_test_flagged() {
        let src = "it('loads users', () => {\n  service.load();\n});\n";
        let findings = spec_findings(&AssertionFreeTestRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn expectation_in_nested_callback_counts() {
        let src = "it('loads', () => {\n  service.load().then(users => {\n    expect(users.length).toBe(3);\n  });\n});\n";
        assert!(spec_findings(&AssertionFreeTestRule, src).is_empty());
    }

    #[test]
    fn focused_and_disabled_tests_flagged() {
        let src = "fdescribe('suite', () => {\n  fit('a', () => expect(1).toBe(1));\n  xit('b', () => expect(2).toBe(2));\n});\n";
        assert_eq!(spec_findings(&FocusedTestRule, src).len(), 2);
        assert_eq!(spec_findings(&DisabledTestRule, src).len(), 1);
    }

    #[test]
    fn exit_call_is_not_a_disabled_test() {
        let src = "process.exit(1);\n";
        assert!(spec_findings(&DisabledTestRule, src).is_empty());
    }

    #[test]
    fn clock_without_uninstall_flagged() {
        let src = "beforeEach(() => jasmine.clock().install());\n";
        assert_eq!(spec_findings(&MissingAsyncTeardownRule, src).len(), 1);

        let balanced = "beforeEach(() => jasmine.clock().install());\nafterEach(() => jasmine.clock().uninstall());\n";
        assert!(spec_findings(&MissingAsyncTeardownRule, balanced).is_empty());
    }

    #[test]
    fn console_noise_flagged() {
        let src = "it('x', () => {\n  console.log(result);\n  expect(result).toBeTruthy();\n});\n";
        assert_eq!(spec_findings(&TestConsoleNoiseRule, src).len(), 1);
    }
}
