//! Reactivity rules
//!
//! Stream lifecycle and signal discipline: leaked subscriptions, nested
//! subscribe pyramids, state writes from inside reactive effects, and
//! subjects that never complete.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{ReactivityRule, RuleId};
use crate::rules::text::{
    call_argument_span, count_token, first_token_line, line_col, token_offsets,
};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

/// Markers that count as subscription cleanup anywhere in the artifact.
const CLEANUP_MARKERS: &[&str] = &[
    "unsubscribe(",
    "takeUntil(",
    "takeUntilDestroyed(",
    "take(1)",
    "first()",
    "DestroyRef",
    "ngOnDestroy",
];

static SUBJECT_FIELD: OnceLock<Regex> = OnceLock::new();
static EFFECT_OPEN: OnceLock<Regex> = OnceLock::new();
static SIGNAL_WRITE: OnceLock<Regex> = OnceLock::new();
static SIGNAL_INNER_MUTATION: OnceLock<Regex> = OnceLock::new();

fn subject_field() -> &'static Regex {
    SUBJECT_FIELD.get_or_init(|| {
        Regex::new(r"public\s+\w+\$?\s*[:=][^;\n]*\b(?:Behavior|Replay|Async)?Subject\b").unwrap()
    })
}

fn effect_open() -> &'static Regex {
    EFFECT_OPEN.get_or_init(|| Regex::new(r"\beffect\s*\(").unwrap())
}

fn signal_write() -> &'static Regex {
    SIGNAL_WRITE.get_or_init(|| Regex::new(r"\w+\s*\.\s*(set|update)\s*\(").unwrap())
}

fn signal_inner_mutation() -> &'static Regex {
    SIGNAL_INNER_MUTATION.get_or_init(|| {
        Regex::new(r"\w+\(\)\s*\.\s*(?:(push|splice|pop|shift|unshift|sort|reverse)\s*\(|\w+\s*=[^=])")
            .unwrap()
    })
}

pub(crate) fn has_cleanup(content: &str) -> bool {
    CLEANUP_MARKERS.iter().any(|m| content.contains(m))
}

/// Byte offsets of `.subscribe(` call tokens.
fn subscribe_offsets(content: &str) -> Vec<usize> {
    token_offsets(content, ".subscribe(")
        .into_iter()
        .map(|off| off + 1)
        .collect()
}

/// A subscription with no visible teardown path leaks across navigations.
pub struct SubscriptionWithoutCleanupRule;

impl Rule for SubscriptionWithoutCleanupRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::SubscriptionWithoutCleanup)
    }

    fn description(&self) -> &'static str {
        "subscribe() without any unsubscribe path"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if !content.contains(".subscribe(") || has_cleanup(content) {
            return Ok(vec![]);
        }
        let line = first_token_line(content, ".subscribe(").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::High,
            line,
            1,
            "subscription has no cleanup path",
            "Pipe through takeUntilDestroyed(), keep the Subscription and \
             unsubscribe in ngOnDestroy, or use the async pipe instead of \
             subscribing manually.",
        )])
    }
}

/// Finds subscribe calls nested inside another subscribe's callback.
///
/// The argument block of each outer call is extracted with string-aware
/// delimiter matching; nested occurrences strictly within that span decide
/// the severity.
pub struct NestedSubscribeRule;

impl Rule for NestedSubscribeRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::NestedSubscribe)
    }

    fn description(&self) -> &'static str {
        "subscribe() nested inside another subscribe callback"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let offsets = subscribe_offsets(content);
        let spans: Vec<_> = offsets
            .iter()
            .map(|&off| call_argument_span(content, off))
            .collect();

        let mut findings = Vec::new();
        for (i, &off) in offsets.iter().enumerate() {
            // Only report the outermost call of each pyramid.
            let inside_another = spans
                .iter()
                .enumerate()
                .any(|(j, span)| {
                    j != i && span.as_ref().is_some_and(|s| s.contains(&off))
                });
            if inside_another {
                continue;
            }
            let Some(span) = &spans[i] else { continue };
            let nested = count_token(&content[span.clone()], ".subscribe(");
            if nested == 0 {
                continue;
            }
            let severity = if nested > ctx.config.subscription_hell.max_depth {
                Severity::Critical
            } else {
                Severity::High
            };
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                severity,
                line,
                col,
                format!("subscribe callback contains {nested} nested subscribe call(s)"),
                "Compose the streams with switchMap/mergeMap/forkJoin instead of \
                 subscribing inside a callback; nesting loses cancellation and \
                 error propagation.",
            ));
        }
        Ok(findings)
    }
}

/// Writing state from inside `effect(...)` re-triggers the effect graph.
///
/// A line-level state machine tracks whether the scan is inside an effect
/// block via brace depth; writes observed while inside are flagged. State
/// resets per artifact and is never shared.
pub struct EffectWritesStateRule;

impl Rule for EffectWritesStateRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::EffectWritesState)
    }

    fn description(&self) -> &'static str {
        "Signal written from inside an effect"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut in_effect = false;
        let mut depth: i32 = 0;
        let mut findings = Vec::new();

        for (i, line) in content.lines().enumerate() {
            if !in_effect && effect_open().is_match(line) {
                in_effect = true;
                depth = 0;
            }
            if in_effect {
                if signal_write().is_match(line) && !effect_open().is_match(line) {
                    findings.push(ctx.finding(
                        self.id(),
                        Severity::High,
                        (i + 1) as u32,
                        1,
                        "signal written inside an effect",
                        "Derive the value with computed() or move the write into the \
                         event handler; effects that write signals ping-pong the \
                         reactive graph.",
                    ));
                }
                depth += line.matches('{').count() as i32 + line.matches('(').count() as i32;
                depth -= line.matches('}').count() as i32 + line.matches(')').count() as i32;
                if depth <= 0 {
                    in_effect = false;
                }
            }
        }
        Ok(findings)
    }
}

/// Subjects that are never completed keep every subscriber alive.
pub struct SubjectWithoutCompleteRule;

impl Rule for SubjectWithoutCompleteRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::SubjectWithoutComplete)
    }

    fn description(&self) -> &'static str {
        "Subject created but never completed"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const SUBJECT_CTORS: &[&str] =
            &["new Subject(", "new BehaviorSubject(", "new ReplaySubject("];
        let content = ctx.content();
        let first = SUBJECT_CTORS
            .iter()
            .filter_map(|m| first_token_line(content, m))
            .min();
        let Some(line) = first else {
            return Ok(vec![]);
        };
        if content.contains(".complete()") {
            return Ok(vec![]);
        }
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            1,
            "subject is never completed",
            "Call complete() in ngOnDestroy (a destroy$ subject works well) so \
             downstream subscribers release their references.",
        )])
    }
}

/// Public subjects hand every consumer the right to emit.
pub struct ExposedSubjectRule;

impl Rule for ExposedSubjectRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::ExposedSubject)
    }

    fn description(&self) -> &'static str {
        "Subject exposed publicly instead of as an Observable"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in subject_field().find_iter(content) {
            if m.as_str().contains("asObservable") {
                continue;
            }
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "subject is exposed as a public field",
                "Keep the subject private and expose subject.asObservable(); public \
                 subjects let any consumer emit into the stream.",
            ));
        }
        Ok(findings)
    }
}

/// Raw `valueChanges.subscribe` reacts to every keystroke.
pub struct MissingDebounceRule;

impl Rule for MissingDebounceRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::MissingDebounce)
    }

    fn description(&self) -> &'static str {
        "valueChanges subscribed without debounce"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if content.contains("debounceTime(") {
            return Ok(vec![]);
        }
        let mut findings = Vec::new();
        for off in token_offsets(content, "valueChanges") {
            let tail = &content[off..(off + 120).min(content.len())];
            if !tail.contains(".subscribe(") {
                continue;
            }
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "valueChanges handled without debounceTime",
                "Pipe through debounceTime (and distinctUntilChanged) before \
                 reacting; every keystroke otherwise triggers the handler.",
            ));
        }
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Converting streams to promises drops cancellation and later emissions.
pub struct PromiseStreamMixingRule;

impl Rule for PromiseStreamMixingRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::PromiseStreamMixing)
    }

    fn description(&self) -> &'static str {
        "Observables converted to promises alongside subscriptions"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const CONVERSIONS: &[&str] = &["firstValueFrom(", "lastValueFrom(", ".toPromise("];
        let content = ctx.content();
        if !content.contains(".subscribe(") {
            return Ok(vec![]);
        }
        let first = CONVERSIONS
            .iter()
            .filter_map(|m| first_token_line(content, m))
            .min();
        let Some(line) = first else {
            return Ok(vec![]);
        };
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Low,
            line,
            1,
            "promise conversions mixed with manual subscriptions",
            "Pick one model per flow; converting to promises mid-stream drops \
             cancellation and hides later emissions.",
        )])
    }
}

/// A component that uses the async pipe and also subscribes manually is
/// maintaining two lifecycles for the same data.
pub struct AsyncPipeWithSubscribeRule;

impl Rule for AsyncPipeWithSubscribeRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::AsyncPipeWithSubscribe)
    }

    fn description(&self) -> &'static str {
        "async pipe and manual subscribe in one component"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if !content.contains(".subscribe(") {
            return Ok(vec![]);
        }

        // Inline template, or the conventional sibling template.
        let mut uses_async_pipe = content.contains("| async");
        if !uses_async_pipe {
            let sibling = ctx.artifact.path.with_extension("html");
            if let Some(markup) = ctx.companions.try_read(&sibling) {
                uses_async_pipe = markup.contains("| async");
            }
        }
        if !uses_async_pipe {
            return Ok(vec![]);
        }

        let line = first_token_line(content, ".subscribe(").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            1,
            "manual subscription alongside async pipe usage",
            "Let the async pipe own the subscription; manual subscribes next to it \
             duplicate state and need their own teardown.",
        )])
    }
}

/// Mutating the object inside a signal bypasses change notification.
pub struct SignalMutationOutsideUpdateRule;

impl Rule for SignalMutationOutsideUpdateRule {
    fn id(&self) -> RuleId {
        RuleId::Reactivity(ReactivityRule::SignalMutationOutsideUpdate)
    }

    fn description(&self) -> &'static str {
        "Signal contents mutated in place"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if !content.contains("signal(") {
            return Ok(vec![]);
        }
        let mut findings = Vec::new();
        for m in signal_inner_mutation().find_iter(content) {
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "value inside a signal is mutated in place",
                "Use set() or update() with a fresh reference; in-place mutation \
                 does not notify consumers of the signal.",
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

    fn component_findings(rule: &dyn Rule, content: &str) -> Vec<Finding> {
        run_rule(rule, "app/x.component.ts", content, ArtifactKind::Component, None)
    }

    #[test]
    fn leaked_subscription_flagged() {
        let src = "ngOnInit() {\n  this.data$.subscribe(d => this.d = d);\n}\n";
        // No ngOnDestroy/unsubscribe/takeUntil anywhere.
        let src = src.replace("ngOnInit", "onLoad");
        let findings = component_findings(&SubscriptionWithoutCleanupRule, &src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn cleanup_marker_suppresses_leak_finding() {
        let src = "this.data$.pipe(takeUntil(this.destroy$)).subscribe(d => {});\n";
        assert!(component_findings(&SubscriptionWithoutCleanupRule, src).is_empty());
    }

    #[test]
    fn single_nested_subscribe_is_high() {
        let src = "a$.subscribe(a => {\n  b$(a).subscribe(b => use(b));\n});\n";
        let findings = component_findings(&NestedSubscribeRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].location.line, 1);
    }

    #[test]
    fn deep_nesting_is_critical() {
        let src = "a$.subscribe(a => {\n  b$.subscribe(b => {\n    c$.subscribe(c => use(c));\n  });\n});\n";
        let findings = component_findings(&NestedSubscribeRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn flat_subscribes_are_quiet() {
        let src = "a$.subscribe(a => use(a));\nb$.subscribe(b => use(b));\n";
        assert!(component_findings(&NestedSubscribeRule, src).is_empty());
    }

    #[test]
    fn effect_writes_are_flagged_only_inside() {
        let src = concat!(
            "setup() {\n",
            "  effect(() => {\n",
            "    this.count.set(this.source() + 1);\n",
            "  });\n",
            "  this.count.set(0);\n",
            "}\n",
        );
        let findings = component_findings(&EffectWritesStateRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location.line, 3);
    }

    #[test]
    fn subject_without_complete_flagged() {
        let src = "private destroy$ = new Subject<void>();\n";
        let findings = component_findings(&SubjectWithoutCompleteRule, src);
        assert_eq!(findings.len(), 1);

        let with_complete = format!("{src}ngOnDestroy() {{ this.destroy$.complete(); }}\n");
        assert!(component_findings(&SubjectWithoutCompleteRule, &with_complete).is_empty());
    }

    #[test]
    fn public_subject_flagged() {
        let src = "public changes = new Subject<string>();\n";
        assert_eq!(component_findings(&ExposedSubjectRule, src).len(), 1);

        let private_field = "private changes = new Subject<string>();\n";
        assert!(component_findings(&ExposedSubjectRule, private_field).is_empty());
    }

    #[test]
    fn value_changes_without_debounce() {
        let src = "this.form.valueChanges.subscribe(v => this.search(v));\n";
        assert_eq!(component_findings(&MissingDebounceRule, src).len(), 1);

        let debounced =
            "this.form.valueChanges.pipe(debounceTime(300)).subscribe(v => this.search(v));\n";
        assert!(component_findings(&MissingDebounceRule, debounced).is_empty());
    }

    #[test]
    fn signal_in_place_mutation_flagged() {
        let src = "items = signal<string[]>([]);\nadd(x: string) { this.items().push(x); }\n";
        let findings = component_findings(&SignalMutationOutsideUpdateRule, src);
        assert_eq!(findings.len(), 1);
    }
}
