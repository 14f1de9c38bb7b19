//! TypeScript hygiene rules
//!
//! Escape hatches and shape smells in the type layer: `any` spread, non-null
//! assertions, suppressed diagnostics, duplicated interfaces, and magic
//! numbers.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{RuleId, TypeScriptRule};
use crate::rules::text::{blank_string_literals, first_token_line, line_col, matching_delimiter};
use anyhow::Result;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::OnceLock;

static ANY_ANNOTATION: OnceLock<Regex> = OnceLock::new();
static EMPTY_INTERFACE: OnceLock<Regex> = OnceLock::new();
static INTERFACE_DECL: OnceLock<Regex> = OnceLock::new();
static PROPERTY: OnceLock<Regex> = OnceLock::new();
static NUMBER_LITERAL: OnceLock<Regex> = OnceLock::new();
static PUBLIC_METHOD: OnceLock<Regex> = OnceLock::new();

fn any_annotation() -> &'static Regex {
    ANY_ANNOTATION.get_or_init(|| Regex::new(r":\s*any\b").unwrap())
}

fn empty_interface() -> &'static Regex {
    EMPTY_INTERFACE.get_or_init(|| {
        Regex::new(r"interface\s+\w+(?:\s+extends\s+[\w,\s]+)?\s*\{\s*\}").unwrap()
    })
}

fn interface_decl() -> &'static Regex {
    INTERFACE_DECL.get_or_init(|| Regex::new(r"interface\s+(\w+)\s*\{").unwrap())
}

fn property() -> &'static Regex {
    PROPERTY.get_or_init(|| Regex::new(r"(?:readonly\s+)?(\w+)\??\s*:\s*([^;,\n{}]+)").unwrap())
}

fn number_literal() -> &'static Regex {
    NUMBER_LITERAL.get_or_init(|| Regex::new(r"[^\w.](\d{2,})\b").unwrap())
}

fn public_method() -> &'static Regex {
    PUBLIC_METHOD.get_or_init(|| Regex::new(r"(?m)^\s*public\s+(\w+)\s*\([^)]*\)\s*\{").unwrap())
}

/// Counts `any` annotations against the configured budget.
pub struct AnyTypeOveruseRule;

impl Rule for AnyTypeOveruseRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::AnyTypeOveruse)
    }

    fn description(&self) -> &'static str {
        "Too many any annotations"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.typescript;
        let content = ctx.content();
        let count = any_annotation().find_iter(content).count();
        if count <= cfg.max_any {
            return Ok(vec![]);
        }
        let severity = if count > cfg.max_any_critical {
            Severity::High
        } else {
            Severity::Medium
        };
        let line = any_annotation()
            .find(content)
            .map(|m| line_col(content, m.start()).0)
            .unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            severity,
            line,
            1,
            format!("{count} `any` annotations in one file"),
            "Type the hot spots first (API responses, event payloads); every `any` \
             silently disables checking for everything it touches.",
        )])
    }
}

/// Non-null assertions move null handling from the compiler to production.
pub struct NonNullAssertionOveruseRule;

impl Rule for NonNullAssertionOveruseRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::NonNullAssertionOveruse)
    }

    fn description(&self) -> &'static str {
        "Non-null assertions used pervasively"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.typescript;
        let code = blank_string_literals(ctx.content());
        let count = code.matches("!.").count();
        if count <= cfg.max_non_null_assertions {
            return Ok(vec![]);
        }
        let severity = if count > cfg.max_non_null_assertions * 2 {
            Severity::Medium
        } else {
            Severity::Low
        };
        let line = first_token_line(&code, "!.").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            severity,
            line,
            1,
            format!("{count} non-null assertions in one file"),
            "Model the optionality (narrowing, default values, ?. chains); each `!` \
             is a deferred runtime crash.",
        )])
    }
}

/// `@ts-ignore` hides whatever diagnostic comes next, forever.
pub struct TsIgnoreRule;

impl Rule for TsIgnoreRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::TsIgnore)
    }

    fn description(&self) -> &'static str {
        "Compiler diagnostics suppressed"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const MARKERS: &[&str] = &["@ts-ignore", "@ts-nocheck"];
        let content = ctx.content();
        let mut findings = Vec::new();
        for marker in MARKERS {
            for off in crate::rules::text::token_offsets(content, marker) {
                let (line, col) = line_col(content, off);
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Medium,
                    line,
                    col,
                    format!("`{marker}` suppresses compiler diagnostics"),
                    "Fix the underlying type error, or use @ts-expect-error so the \
                     suppression fails loudly once the error is gone.",
                ));
            }
        }
        findings.sort_by_key(|f| f.location.line);
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Empty interfaces assert nothing and usually mark an abandoned design.
pub struct EmptyInterfaceRule;

impl Rule for EmptyInterfaceRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::EmptyInterface)
    }

    fn description(&self) -> &'static str {
        "Interface with no members"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in empty_interface().find_iter(content) {
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "interface declares no members",
                "Delete it or replace with a type alias; an empty interface matches \
                 everything and documents nothing.",
            ));
        }
        Ok(findings)
    }
}

/// Two interfaces with the same property shape are one entity written twice.
pub struct ParallelShapeDuplicationRule;

impl Rule for ParallelShapeDuplicationRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::ParallelShapeDuplication)
    }

    fn description(&self) -> &'static str {
        "Interfaces duplicating the same shape"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        // Shape signature -> (first interface name, line of first sighting).
        let mut seen: FxHashMap<String, String> = FxHashMap::default();
        let mut findings = Vec::new();

        for caps in interface_decl().captures_iter(content) {
            let whole = caps.get(0).expect("match exists");
            let name = caps[1].to_string();
            let open = whole.end() - 1;
            let Some(close) = matching_delimiter(content, open) else {
                continue;
            };
            let body = &content[open + 1..close];

            let mut props: Vec<String> = property()
                .captures_iter(body)
                .map(|c| format!("{}:{}", &c[1], c[2].trim()))
                .collect();
            if props.len() < 3 {
                continue;
            }
            props.sort();
            let signature = props.join(";");

            if let Some(original) = seen.get(&signature) {
                let (line, col) = line_col(content, whole.start());
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Medium,
                    line,
                    col,
                    format!("`{name}` duplicates the shape of `{original}`"),
                    "Keep one interface (or derive with Pick/Omit); parallel copies \
                     of a shape drift independently.",
                ));
            } else {
                seen.insert(signature, name);
            }
        }
        Ok(findings)
    }
}

/// Repeated bare numeric literals with no name.
pub struct MagicNumbersRule;

impl Rule for MagicNumbersRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::MagicNumbers)
    }

    fn description(&self) -> &'static str {
        "Unnamed numeric literals scattered through the file"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.typescript;
        let code = blank_string_literals(ctx.content());
        let mut distinct = FxHashSet::default();
        let mut first_offset = None;
        for caps in number_literal().captures_iter(&code) {
            let m = caps.get(1).expect("capture 1 exists");
            if matches!(m.as_str(), "10" | "100" | "1000") {
                continue;
            }
            if distinct.insert(m.as_str().to_string()) && first_offset.is_none() {
                first_offset = Some(m.start());
            }
        }
        if distinct.len() <= cfg.max_magic_numbers {
            return Ok(vec![]);
        }
        let (line, col) = line_col(&code, first_offset.unwrap_or(0));
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Low,
            line,
            col,
            format!("{} distinct unnamed numeric literals", distinct.len()),
            "Lift recurring numbers into named constants next to the logic that \
             owns them; bare literals hide intent and invite drift.",
        )])
    }
}

/// Public methods without return annotations leak inference to callers.
pub struct UntypedPublicApiRule;

impl Rule for UntypedPublicApiRule {
    fn id(&self) -> RuleId {
        RuleId::TypeScript(TypeScriptRule::UntypedPublicApi)
    }

    fn description(&self) -> &'static str {
        "Public method without a return type"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for caps in public_method().captures_iter(content) {
            let m = caps.get(0).expect("match exists");
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                format!("public method `{}` has no return type", &caps[1]),
                "Annotate the return type; inferred public signatures change \
                 silently when the body does.",
            ));
        }
        Ok(findings)
    }
}
