//! State management rules
//!
//! Store discipline: immutable reducers, effects with error paths, and
//! state shapes that store one entity once.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{RuleId, StateRule};
use crate::rules::reactivity::has_cleanup;
use crate::rules::text::{line_col, matching_delimiter, token_offsets};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static STATE_ASSIGN: OnceLock<Regex> = OnceLock::new();
static STATE_ARRAY_MUTATION: OnceLock<Regex> = OnceLock::new();
static INTERFACE_DECL: OnceLock<Regex> = OnceLock::new();
static PROPERTY: OnceLock<Regex> = OnceLock::new();
static SELECT_PIPE: OnceLock<Regex> = OnceLock::new();
static DISPATCH_LITERAL: OnceLock<Regex> = OnceLock::new();

fn state_assign() -> &'static Regex {
    STATE_ASSIGN.get_or_init(|| Regex::new(r"\bstate\.\w+(?:\.\w+)*\s*=[^=]").unwrap())
}

fn state_array_mutation() -> &'static Regex {
    STATE_ARRAY_MUTATION.get_or_init(|| {
        Regex::new(r"\bstate\.\w+(?:\.\w+)*\.(push|splice|pop|shift|unshift|sort|reverse)\s*\(")
            .unwrap()
    })
}

fn interface_decl() -> &'static Regex {
    INTERFACE_DECL.get_or_init(|| Regex::new(r"interface\s+(\w+)\s*(?:extends\s+[\w,\s<>]+)?\{").unwrap())
}

fn property() -> &'static Regex {
    PROPERTY.get_or_init(|| Regex::new(r"(?:readonly\s+)?(\w+)\??\s*:\s*([^;,\n{}]+)").unwrap())
}

fn select_pipe() -> &'static Regex {
    SELECT_PIPE.get_or_init(|| Regex::new(r"\.select\([^)]*\)\s*\.\s*pipe\s*\(").unwrap())
}

fn dispatch_literal() -> &'static Regex {
    DISPATCH_LITERAL.get_or_init(|| Regex::new(r"\.dispatch\s*\(\s*\{").unwrap())
}

/// All `interface` bodies with their name and body span.
fn interface_bodies(content: &str) -> Vec<(String, usize, std::ops::Range<usize>)> {
    interface_decl()
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0).expect("match exists");
            let open = whole.end() - 1;
            let close = matching_delimiter(content, open)?;
            Some((caps[1].to_string(), whole.start(), open + 1..close))
        })
        .collect()
}

/// Reducers must return new state; in-place writes corrupt every consumer
/// holding the previous reference.
pub struct ReducerStateMutationRule;

impl Rule for ReducerStateMutationRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::ReducerStateMutation)
    }

    fn description(&self) -> &'static str {
        "Reducer mutates state in place"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in state_assign()
            .find_iter(content)
            .chain(state_array_mutation().find_iter(content))
        {
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Critical,
                line,
                col,
                "state mutated in place inside a reducer",
                "Return a new object with spread (or use an immutable update helper); \
                 in-place mutation breaks change detection and time-travel debugging.",
            ));
        }
        findings.sort_by_key(|f| f.location.line);
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// An effect without catchError dies on its first error and never fires again.
pub struct EffectWithoutErrorHandlingRule;

impl Rule for EffectWithoutErrorHandlingRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::EffectWithoutErrorHandling)
    }

    fn description(&self) -> &'static str {
        "createEffect without catchError"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for off in token_offsets(content, "createEffect(") {
            let Some(span) = crate::rules::text::call_argument_span(content, off) else {
                continue;
            };
            if content[span].contains("catchError(") {
                continue;
            }
            let (line, col) = line_col(content, off);
            findings.push(ctx.finding(
                self.id(),
                Severity::High,
                line,
                col,
                "effect pipeline has no catchError",
                "Handle errors inside the inner observable (catchError returning a \
                 recovery action); an uncaught error terminates the effect stream \
                 for the rest of the session.",
            ));
        }
        Ok(findings)
    }
}

/// Store selections subscribed in components need the same teardown as any
/// other subscription.
pub struct StoreSubscribeNoCleanupRule;

impl Rule for StoreSubscribeNoCleanupRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::StoreSubscribeNoCleanup)
    }

    fn description(&self) -> &'static str {
        "store.select().subscribe() without cleanup"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if !content.contains(".select(") || !content.contains(".subscribe(") {
            return Ok(vec![]);
        }
        if has_cleanup(content) {
            return Ok(vec![]);
        }
        let line = crate::rules::text::first_token_line(content, ".select(").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::High,
            line,
            1,
            "store selection subscribed without a cleanup path",
            "Prefer the async pipe for store selections, or pipe through \
             takeUntilDestroyed(); selections live as long as the store otherwise.",
        )])
    }
}

/// Detects one entity stored as an array plus parallel id-list or count
/// fields that can drift out of sync.
pub struct RedundantEntityStorageRule;

impl RedundantEntityStorageRule {
    fn singular(name: &str) -> &str {
        name.strip_suffix('s').unwrap_or(name)
    }
}

impl Rule for RedundantEntityStorageRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::RedundantEntityStorage)
    }

    fn description(&self) -> &'static str {
        "Entity stored redundantly across parallel fields"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();

        for (name, decl_off, body) in interface_bodies(content) {
            let body_text = &content[body];
            let props: Vec<(String, String)> = property()
                .captures_iter(body_text)
                .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
                .collect();
            let prop_names: Vec<&str> = props.iter().map(|(n, _)| n.as_str()).collect();

            for (prop, ty) in &props {
                if !ty.ends_with("[]") && !ty.starts_with("Array<") {
                    continue;
                }
                let stem = Self::singular(prop);
                let id_field = format!("{stem}Ids");
                let count_field = format!("{stem}Count");
                let alt_count_field = format!("{prop}Count");

                let mut redundant: Vec<&str> = Vec::new();
                if prop_names.contains(&id_field.as_str()) {
                    redundant.push(&id_field);
                }
                if prop_names.contains(&count_field.as_str()) {
                    redundant.push(&count_field);
                } else if prop_names.contains(&alt_count_field.as_str()) {
                    redundant.push(&alt_count_field);
                }
                if redundant.is_empty() {
                    continue;
                }

                let (line, col) = line_col(content, decl_off);
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Medium,
                    line,
                    col,
                    format!(
                        "`{name}` stores `{prop}` alongside derived fields ({})",
                        redundant.join(", ")
                    ),
                    "Keep the array as the single source of truth and derive ids and \
                     counts in selectors; parallel fields drift out of sync under \
                     concurrent updates.",
                ));
                // One finding per interface, even when several arrays qualify.
                break;
            }
        }
        Ok(findings)
    }
}

/// Filtering and mapping after select() belongs in a memoized selector.
pub struct SelectorLogicInComponentRule;

impl Rule for SelectorLogicInComponentRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::SelectorLogicInComponent)
    }

    fn description(&self) -> &'static str {
        "Selector-shaped logic in a component pipe"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in select_pipe().find_iter(content) {
            let pipe_open = content[m.start()..m.end()]
                .rfind('(')
                .map(|rel| m.start() + rel);
            let Some(open) = pipe_open else { continue };
            let Some(close) = matching_delimiter(content, open) else {
                continue;
            };
            let body = &content[open..close];
            if !body.contains("map(") && !body.contains("filter(") {
                continue;
            }
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Medium,
                line,
                col,
                "selection reshaped in the component instead of a selector",
                "Move the map/filter into a createSelector so the projection is \
                 memoized and shared by every consumer.",
            ));
        }
        Ok(findings)
    }
}

/// Inline action literals skip the typed action creators.
pub struct UntypedActionDispatchRule;

impl Rule for UntypedActionDispatchRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::UntypedActionDispatch)
    }

    fn description(&self) -> &'static str {
        "Action dispatched as an object literal"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for m in dispatch_literal().find_iter(content) {
            let (line, col) = line_col(content, m.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                "action dispatched as a raw object literal",
                "Use a createAction creator; literal actions are invisible to \
                 exhaustiveness checks and typo-prone.",
            ));
        }
        Ok(findings)
    }
}

/// Store files past the configured size mix too many feature slices.
pub struct MassiveStoreFileRule;

impl Rule for MassiveStoreFileRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::MassiveStoreFile)
    }

    fn description(&self) -> &'static str {
        "Store file larger than the configured budget"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let lines = ctx.artifact.line_count();
        if lines <= ctx.config.state.max_store_lines {
            return Ok(vec![]);
        }
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            1,
            1,
            format!("store file spans {lines} lines"),
            "Split the store by feature slice (reducer, selectors, effects per \
             feature); monolithic store files serialize every team on one file.",
        )])
    }
}

/// Deeply nested state is painful to update immutably.
pub struct NestedStateDepthRule;

impl Rule for NestedStateDepthRule {
    fn id(&self) -> RuleId {
        RuleId::State(StateRule::NestedStateDepth)
    }

    fn description(&self) -> &'static str {
        "State interface nests deeper than the configured budget"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let mut findings = Vec::new();
        for (name, decl_off, body) in interface_bodies(content) {
            let mut depth = 1usize;
            let mut max_depth = 1usize;
            for b in content[body].bytes() {
                match b {
                    b'{' => {
                        depth += 1;
                        max_depth = max_depth.max(depth);
                    }
                    b'}' => depth = depth.saturating_sub(1),
                    _ => {}
                }
            }
            if max_depth <= ctx.config.state.max_state_depth {
                continue;
            }
            let (line, col) = line_col(content, decl_off);
            findings.push(ctx.finding(
                self.id(),
                Severity::Low,
                line,
                col,
                format!("`{name}` nests {max_depth} levels deep"),
                "Normalize the shape (entities by id plus id lists); flat state \
                 keeps immutable updates one spread deep.",
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

    fn store_findings(rule: &dyn Rule, content: &str) -> Vec<Finding> {
        run_rule(rule, "app/users.reducer.ts", content, ArtifactKind::Store, None)
    }

    #[test]
    fn reducer_mutation_is_critical() {
        let src = "on(add, (state, { user }) => {\n  state.users.push(user);\n  return state;\n});\n";
        let findings = store_findings(&ReducerStateMutationRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].location.line, 2);
    }

    #[test]
    fn spread_update_is_quiet() {
        let src = "on(add, (state, { user }) => ({ ...state, users: [...state.users, user] }));\n";
        assert!(store_findings(&ReducerStateMutationRule, src).is_empty());
    }

    #[test]
    fn effect_without_catch_error_flagged() {
        let src = "loadUsers$ = createEffect(() =>\n  this.actions$.pipe(\n    ofType(load),\n    switchMap(() => this.api.fetch()),\n    map(users => loaded({ users })),\n  ),\n);\n";
        let findings = store_findings(&EffectWithoutErrorHandlingRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn effect_with_catch_error_is_quiet() {
        let src = "x$ = createEffect(() => this.a$.pipe(switchMap(f), catchError(() => of(failed()))));\n";
        assert!(store_findings(&EffectWithoutErrorHandlingRule, src).is_empty());
    }

    #[test]
    fn redundant_entity_storage_emits_one_finding() {
        let src = concat!(
            "export interface UsersState {\n",
            "  users: User[];\n",
            "  userIds: string[];\n",
            "  userCount: number;\n",
            "}\n",
        );
        let findings = store_findings(&RedundantEntityStorageRule, src);
        assert_eq!(findings.len(), 1, "exactly one finding per interface");
        assert!(findings[0].message.contains("userIds"));
        assert!(findings[0].message.contains("userCount"));
    }

    #[test]
    fn single_source_of_truth_is_quiet() {
        let src = "interface UsersState {\n  users: User[];\n  selectedId: string | null;\n}\n";
        assert!(store_findings(&RedundantEntityStorageRule, src).is_empty());
    }

    #[test]
    fn nested_state_depth_flagged() {
        let src = "interface S {\n  a: { b: { c: { d: { e: number } } } };\n}\n";
        let findings = store_findings(&NestedStateDepthRule, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn untyped_dispatch_flagged() {
        let src = "this.store.dispatch({ type: '[Users] Load' });\n";
        assert_eq!(store_findings(&UntypedActionDispatchRule, src).len(), 1);
    }
}
