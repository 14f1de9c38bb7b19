//! Architecture and dependency-injection rules
//!
//! Components and services that grow past their role: oversized classes,
//! self-referential injection, DOM reach-arounds, and DI escape hatches.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{ArchitectureRule, RuleId};
use crate::rules::text::{
    call_argument_span, import_count, line_col, matching_delimiter, token_offsets,
};
use anyhow::Result;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

static CLASS_DECL: OnceLock<Regex> = OnceLock::new();
static EXTENDS_COMPONENT: OnceLock<Regex> = OnceLock::new();
static NEW_SERVICE: OnceLock<Regex> = OnceLock::new();
static EMPTY_HOOK: OnceLock<Regex> = OnceLock::new();

fn class_decl() -> &'static Regex {
    CLASS_DECL.get_or_init(|| Regex::new(r"class\s+([A-Za-z_]\w*)").unwrap())
}

fn extends_component() -> &'static Regex {
    EXTENDS_COMPONENT
        .get_or_init(|| Regex::new(r"class\s+\w+\s+extends\s+(\w*Component)\b").unwrap())
}

fn new_service() -> &'static Regex {
    NEW_SERVICE.get_or_init(|| Regex::new(r"\bnew\s+([A-Z]\w*Service)\s*\(").unwrap())
}

fn empty_hook() -> &'static Regex {
    EMPTY_HOOK.get_or_init(|| {
        Regex::new(r"ng(OnInit|OnDestroy|OnChanges|AfterViewInit|AfterContentInit)\s*\(\s*\)\s*(?::\s*void\s*)?\{\s*\}").unwrap()
    })
}

/// The parameter list of each `constructor(` together with its offset.
fn constructor_params(content: &str) -> Vec<(usize, String)> {
    token_offsets(content, "constructor")
        .into_iter()
        .filter(|&off| {
            // Reject identifiers that merely contain the word.
            off == 0 || !content.as_bytes()[off - 1].is_ascii_alphanumeric()
        })
        .filter_map(|off| {
            call_argument_span(content, off).map(|span| (off, content[span].to_string()))
        })
        .collect()
}

/// Name of the class declared closest above `offset`.
fn enclosing_class(content: &str, offset: usize) -> Option<String> {
    class_decl()
        .captures_iter(&content[..offset])
        .last()
        .map(|caps| caps[1].to_string())
}

/// Flags components whose import or line counts exceed the configured
/// budgets, escalating to CRITICAL past the second bound.
pub struct GodComponentRule;

impl Rule for GodComponentRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::GodComponent)
    }

    fn description(&self) -> &'static str {
        "Component with too many imports or lines"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.god_component;
        let imports = import_count(ctx.content());
        let lines = ctx.artifact.line_count();

        let critical =
            imports > cfg.max_imports_critical || lines > cfg.max_lines_critical;
        let high = imports > cfg.max_imports || lines > cfg.max_lines;
        if !critical && !high {
            return Ok(vec![]);
        }

        let severity = if critical { Severity::Critical } else { Severity::High };
        let mut reasons = Vec::new();
        if imports > cfg.max_imports {
            reasons.push(format!("{imports} imports"));
        }
        if lines > cfg.max_lines {
            reasons.push(format!("{lines} lines"));
        }

        Ok(vec![ctx.finding(
            self.id(),
            severity,
            1,
            1,
            format!("component has grown too large ({})", reasons.join(", ")),
            "Split responsibilities into child components and services; a class \
             this size usually mixes presentation, orchestration, and data access.",
        )])
    }
}

/// A class that injects itself can never be constructed by the injector.
pub struct SelfInjectionCycleRule;

impl Rule for SelfInjectionCycleRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::SelfInjectionCycle)
    }

    fn description(&self) -> &'static str {
        "Class injects itself through its own constructor"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for (off, params) in constructor_params(content) {
            let Some(class_name) = enclosing_class(content, off) else {
                continue;
            };
            let type_marker = format!(": {class_name}");
            if params.contains(&type_marker) {
                let (line, col) = line_col(content, off);
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Critical,
                    line,
                    col,
                    format!("`{class_name}` injects itself in its constructor"),
                    "Remove the self-reference; the injector cannot resolve a \
                     provider that depends on its own instance.",
                ));
            }
        }
        Ok(findings)
    }
}

/// Constructors with long parameter lists hide too many collaborators.
pub struct ConstructorOverInjectionRule;

impl Rule for ConstructorOverInjectionRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::ConstructorOverInjection)
    }

    fn description(&self) -> &'static str {
        "Constructor injects too many dependencies"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.injection;
        let content = ctx.content();
        let mut findings = Vec::new();
        for (off, params) in constructor_params(content) {
            let trimmed = params.trim();
            if trimmed.is_empty() {
                continue;
            }
            let count = trimmed.matches(',').count() + 1;
            if count <= cfg.max_constructor_params {
                continue;
            }
            let severity = if count > cfg.max_constructor_params_high {
                Severity::High
            } else {
                Severity::Medium
            };
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                severity,
                line,
                col,
                format!("constructor injects {count} dependencies"),
                "Group related collaborators behind a facade service or split the \
                 class; a wide constructor is the classic too-many-responsibilities \
                 signal.",
            ));
        }
        Ok(findings)
    }
}

/// Components should delegate HTTP access to a service layer.
pub struct HttpInComponentRule;

impl Rule for HttpInComponentRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::HttpInComponent)
    }

    fn description(&self) -> &'static str {
        "Component talks to HttpClient directly"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let uses_http = content.contains(": HttpClient")
            || content.contains("inject(HttpClient)");
        if !uses_http {
            return Ok(vec![]);
        }
        let line = crate::rules::text::first_token_line(content, "HttpClient").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            1,
            "component injects HttpClient directly",
            "Move the call into a dedicated data service so the component stays \
             declarative and the endpoint is mockable in one place.",
        )])
    }
}

/// Direct DOM access bypasses Angular's rendering abstraction.
pub struct DomManipulationRule;

impl Rule for DomManipulationRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::DomManipulation)
    }

    fn description(&self) -> &'static str {
        "Direct DOM access from component code"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const MARKERS: &[&str] = &[
            "document.getElementById(",
            "document.querySelector(",
            "document.querySelectorAll(",
            ".nativeElement",
        ];
        let content = ctx.content();
        let mut lines_seen = FxHashSet::default();
        let mut findings = Vec::new();
        for marker in MARKERS {
            for off in token_offsets(content, marker) {
                let (line, col) = line_col(content, off);
                if !lines_seen.insert(line) {
                    continue;
                }
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Medium,
                    line,
                    col,
                    format!("direct DOM access via `{}`", marker.trim_end_matches('(')),
                    "Use Renderer2, template references, or bindings; raw DOM access \
                     breaks server-side rendering and web workers.",
                ));
            }
        }
        findings.sort_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Pulling dependencies from the injector at runtime hides them from the type system.
pub struct ServiceLocatorRule;

impl Rule for ServiceLocatorRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::ServiceLocator)
    }

    fn description(&self) -> &'static str {
        "Injector used as a service locator"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for off in token_offsets(content, "injector.get(") {
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "dependency fetched through injector.get()",
                "Declare the dependency as a constructor parameter or inject() call \
                 so it is visible, typed, and test-overridable.",
            ));
        }
        for off in token_offsets(content, "Injector.get(") {
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "dependency fetched through Injector.get()",
                "Declare the dependency as a constructor parameter or inject() call \
                 so it is visible, typed, and test-overridable.",
            ));
        }
        findings.sort_by_key(|f| f.location.line);
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Services without `providedIn` end up in module provider arrays and
/// defeat tree shaking.
pub struct MissingProvidedInRule;

impl Rule for MissingProvidedInRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::MissingProvidedIn)
    }

    fn description(&self) -> &'static str {
        "Injectable without providedIn"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for off in token_offsets(content, "@Injectable(") {
            let Some(span) = call_argument_span(content, off + 1) else {
                continue;
            };
            if content[span].contains("providedIn") {
                continue;
            }
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "@Injectable() without providedIn",
                "Use @Injectable({ providedIn: 'root' }) (or a narrower injector) so \
                 unused services tree-shake away.",
            ));
        }
        Ok(findings)
    }
}

/// Deep component inheritance couples views through fragile base classes.
pub struct ComponentInheritanceRule;

impl Rule for ComponentInheritanceRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::ComponentInheritance)
    }

    fn description(&self) -> &'static str {
        "Component extends another component"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for caps in extends_component().captures_iter(content) {
            let m = caps.get(0).expect("match exists");
            let base = &caps[1];
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                format!("component inherits from `{base}`"),
                "Prefer composition: extract shared behavior into services or \
                 directives instead of a component base class.",
            ));
        }
        Ok(findings)
    }
}

/// `new FooService()` bypasses the injector and every provider override.
pub struct ManualServiceInstantiationRule;

impl Rule for ManualServiceInstantiationRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::ManualServiceInstantiation)
    }

    fn description(&self) -> &'static str {
        "Service constructed with new instead of injected"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for caps in new_service().captures_iter(content) {
            let m = caps.get(0).expect("match exists");
            let name = &caps[1];
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::High,
                line,
                col,
                format!("`{name}` constructed manually with new"),
                "Inject the service instead; manual construction skips singleton \
                 scoping, provider overrides, and the service's own dependencies.",
            ));
        }
        Ok(findings)
    }
}

/// Work in constructors runs before inputs are set and is hard to test.
pub struct LogicHeavyConstructorRule;

impl Rule for LogicHeavyConstructorRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::LogicHeavyConstructor)
    }

    fn description(&self) -> &'static str {
        "Constructor body does real work"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let cfg = &ctx.config.injection;
        let content = ctx.content();
        let mut findings = Vec::new();
        for (off, _params) in constructor_params(content) {
            // Body is the brace block right after the parameter list.
            let Some(close) = call_argument_span(content, off).map(|s| s.end) else {
                continue;
            };
            let Some(body_open_rel) = content[close..].find('{') else {
                continue;
            };
            let body_open = close + body_open_rel;
            let Some(body_close) = matching_delimiter(content, body_open) else {
                continue;
            };
            let statements = content[body_open..body_close].matches(';').count();
            if statements <= cfg.max_constructor_statements {
                continue;
            }
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                format!("constructor executes {statements} statements"),
                "Move initialization into ngOnInit or a factory; constructors should \
                 only record injected collaborators.",
            ));
        }
        Ok(findings)
    }
}

/// Empty lifecycle hooks still force Angular to call into the class.
pub struct EmptyLifecycleHookRule;

impl Rule for EmptyLifecycleHookRule {
    fn id(&self) -> RuleId {
        RuleId::Architecture(ArchitectureRule::EmptyLifecycleHook)
    }

    fn description(&self) -> &'static str {
        "Empty lifecycle hook body"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in empty_hook().find_iter(content) {
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "lifecycle hook is empty",
                "Delete the hook (and its interface clause if now unused); empty \
                 hooks add a per-instance call for nothing.",
            ));
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactKind;
    use crate::rules::base::testutil::run_rule;

    fn component_findings(rule: &dyn Rule, content: &str) -> Vec<Finding> {
        run_rule(rule, "app/big.component.ts", content, ArtifactKind::Component, None)
    }

    fn synthetic_component(imports: usize, lines: usize) -> String {
        let mut src = String::new();
        for i in 0..imports {
            src.push_str(&format!("import {{ Dep{i} }} from './dep{i}';\n"));
        }
        src.push_str("@Component({ selector: 'app-big' })\nexport class BigComponent {\n");
        while src.lines().count() < lines - 1 {
            src.push_str("  // widget wiring\n");
        }
        src.push_str("}\n");
        src
    }

    #[test]
    fn god_component_high_between_bounds() {
        let src = synthetic_component(22, 410);
        let findings = component_findings(&GodComponentRule, &src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn god_component_critical_past_second_bound() {
        let src = synthetic_component(35, 410);
        let findings = component_findings(&GodComponentRule, &src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn god_component_quiet_below_bounds() {
        let src = synthetic_component(5, 60);
        assert!(component_findings(&GodComponentRule, &src).is_empty());
    }

    #[test]
    fn self_injection_is_critical() {
        let src = "@Injectable()\nexport class FooService {\n  constructor(private self: FooService) {}\n}\n";
        let findings = run_rule(
            &SelfInjectionCycleRule,
            "app/foo.service.ts",
            src,
            ArtifactKind::Service,
            None,
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].location.line, 3);
    }

    #[test]
    fn injecting_a_different_service_is_fine() {
        let src = "export class FooService {\n  constructor(private bar: BarService) {}\n}\n";
        assert!(run_rule(
            &SelfInjectionCycleRule,
            "x.ts",
            src,
            ArtifactKind::Service,
            None
        )
        .is_empty());
    }

    #[test]
    fn over_injection_counts_params() {
        let src = "export class C {\n  constructor(a: A, b: B, c: C2, d: D, e: E, f: F, g: G) {}\n}\n";
        let findings = component_findings(&ConstructorOverInjectionRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
    }

    #[test]
    fn provided_in_present_is_quiet() {
        let with = "@Injectable({ providedIn: 'root' })\nexport class S {}\n";
        assert!(run_rule(&MissingProvidedInRule, "s.ts", with, ArtifactKind::Service, None)
            .is_empty());

        let without = "@Injectable()\nexport class S {}\n";
        assert_eq!(
            run_rule(&MissingProvidedInRule, "s.ts", without, ArtifactKind::Service, None).len(),
            1
        );
    }

    #[test]
    fn manual_service_instantiation_flagged() {
        let src = "const api = new ApiService(http);\n";
        let findings = component_findings(&ManualServiceInstantiationRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn empty_hooks_flagged() {
        let src = "export class C {\n  ngOnInit(): void {}\n  ngOnDestroy() {}\n}\n";
        assert_eq!(component_findings(&EmptyLifecycleHookRule, src).len(), 2);
    }
}
