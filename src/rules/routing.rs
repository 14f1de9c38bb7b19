//! Routing rules
//!
//! Route tables that load everything eagerly, privileged paths without
//! guards, and parameter reads that miss in-place navigation.

use crate::models::{Finding, Severity};
use crate::rules::base::{Rule, RuleContext};
use crate::rules::ids::{RoutingRule, RuleId};
use crate::rules::text::{
    count_token, first_token_line, line_col, matching_delimiter, token_offsets,
};
use anyhow::Result;
use regex::Regex;
use std::sync::OnceLock;

static ROUTE_PATH: OnceLock<Regex> = OnceLock::new();

fn route_path() -> &'static Regex {
    ROUTE_PATH.get_or_init(|| Regex::new(r#"path\s*:\s*['"]([^'"]*)['"]"#).unwrap())
}

/// The route object literal enclosing `offset`, if any.
fn enclosing_route_object(content: &str, offset: usize) -> Option<std::ops::Range<usize>> {
    let open = content[..offset].rfind('{')?;
    let close = matching_delimiter(content, open)?;
    (open..close).contains(&offset).then(|| open..close)
}

/// Route tables with only eager `component:` entries ship every feature in
/// the initial bundle.
pub struct EagerRouteLoadingRule;

impl Rule for EagerRouteLoadingRule {
    fn id(&self) -> RuleId {
        RuleId::Routing(RoutingRule::EagerRouteLoading)
    }

    fn description(&self) -> &'static str {
        "Route table loads every feature eagerly"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let eager = count_token(content, "component:");
        if eager < 2 {
            return Ok(vec![]);
        }
        if content.contains("loadChildren") || content.contains("loadComponent") {
            return Ok(vec![]);
        }
        let line = first_token_line(content, "component:").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Medium,
            line,
            1,
            format!("{eager} routes load eagerly, none lazily"),
            "Use loadChildren/loadComponent for feature routes so each area \
             downloads on first navigation instead of at startup.",
        )])
    }
}

/// Privileged paths (admin, billing, ...) need a canActivate guard.
pub struct UnguardedAdminRouteRule;

impl Rule for UnguardedAdminRouteRule {
    fn id(&self) -> RuleId {
        RuleId::Routing(RoutingRule::UnguardedAdminRoute)
    }

    fn description(&self) -> &'static str {
        "Privileged route without a guard"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let markers = &ctx.config.routing.privileged_path_markers;
        let mut findings = Vec::new();

        for caps in route_path().captures_iter(content) {
            let segment = caps.get(1).expect("capture 1 exists");
            let lowered = segment.as_str().to_ascii_lowercase();
            if !markers.iter().any(|m| lowered.contains(m.as_str())) {
                continue;
            }
            let Some(route) = enclosing_route_object(content, segment.start()) else {
                continue;
            };
            let route_text = &content[route];
            if route_text.contains("canActivate") || route_text.contains("canMatch") {
                continue;
            }
            let (line, col) = line_col(content, segment.start());
            findings.push(ctx.finding(
                self.id(),
                Severity::High,
                line,
                col,
                format!("route '{}' has no canActivate guard", segment.as_str()),
                "Attach a canActivate (or canMatch) guard; relying on the UI to hide \
                 the link leaves the route reachable by URL.",
            ));
        }
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Without a wildcard route, unknown URLs render a blank shell.
pub struct MissingWildcardRouteRule;

impl Rule for MissingWildcardRouteRule {
    fn id(&self) -> RuleId {
        RuleId::Routing(RoutingRule::MissingWildcardRoute)
    }

    fn description(&self) -> &'static str {
        "Route table without a wildcard fallback"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        if route_path().captures_iter(content).count() < 2 {
            return Ok(vec![]);
        }
        let has_wildcard = route_path()
            .captures_iter(content)
            .any(|caps| &caps[1] == "**");
        if has_wildcard {
            return Ok(vec![]);
        }
        let line = first_token_line(content, "path").unwrap_or(1);
        Ok(vec![ctx.finding(
            self.id(),
            Severity::Low,
            line,
            1,
            "no `**` wildcard route in the table",
            "Add a trailing { path: '**', ... } route to a not-found view so typos \
             and stale links land somewhere intentional.",
        )])
    }
}

/// `snapshot.params` reads once; in-place navigation never updates it.
pub struct SnapshotParamBindingRule;

impl Rule for SnapshotParamBindingRule {
    fn id(&self) -> RuleId {
        RuleId::Routing(RoutingRule::SnapshotParamBinding)
    }

    fn description(&self) -> &'static str {
        "Route params read from the snapshot"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        const MARKERS: &[&str] = &["snapshot.params", "snapshot.paramMap", "snapshot.queryParams"];
        let content = ctx.content();
        let mut findings = Vec::new();
        for marker in MARKERS {
            for off in token_offsets(content, marker) {
                let (line, col) = line_col(content, off);
                findings.push(ctx.finding(
                    self.id(),
                    Severity::Medium,
                    line,
                    col,
                    format!("route parameter read via `{marker}`"),
                    "Subscribe to route.paramMap (or use input binding); the \
                     snapshot goes stale when the router reuses the component \
                     instance.",
                ));
            }
        }
        findings.sort_by_key(|f| f.location.line);
        findings.dedup_by_key(|f| f.location.line);
        Ok(findings)
    }
}

/// Route trees nested past the budget encode navigation nobody can follow.
pub struct DeepRouteNestingRule;

impl DeepRouteNestingRule {
    fn children_depth(content: &str, offset: usize, budget: usize) -> usize {
        if budget == 0 {
            return 1;
        }
        let Some(open_rel) = content[offset..].find('[') else {
            return 1;
        };
        let open = offset + open_rel;
        let Some(close) = matching_delimiter(content, open) else {
            return 1;
        };
        let span = open + 1..close;
        let inner_max = token_offsets(&content[span.clone()], "children:")
            .into_iter()
            .map(|rel| Self::children_depth(content, span.start + rel, budget - 1))
            .max()
            .unwrap_or(0);
        1 + inner_max
    }
}

impl Rule for DeepRouteNestingRule {
    fn id(&self) -> RuleId {
        RuleId::Routing(RoutingRule::DeepRouteNesting)
    }

    fn description(&self) -> &'static str {
        "Routes nested deeper than the configured budget"
    }

    fn check(&self, ctx: &RuleContext<'_>) -> Result<Vec<Finding>> {
        let content = ctx.content();
        let max_depth = ctx.config.routing.max_route_depth;
        let offsets = token_offsets(content, "children:");

        for &off in &offsets {
            let nested_in_other = offsets.iter().any(|&other| {
                other != off
                    && other < off
                    && content[other..].find('[').is_some_and(|rel| {
                        matching_delimiter(content, other + rel)
                            .is_some_and(|close| (other + rel..close).contains(&off))
                    })
            });
            if nested_in_other {
                continue;
            }
            let depth = Self::children_depth(content, off, max_depth + 2);
            if depth > max_depth {
                let (line, col) = line_col(content, off);
                return Ok(vec![ctx.finding(
                    self.id(),
                    Severity::Low,
                    line,
                    col,
                    format!("route tree nests {depth} levels of children"),
                    "Flatten with feature-level route files and loadChildren; deep \
                     inline trees hide the URL structure they produce.",
                )]);
            }
        }
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtifactKind;
    use crate::rules::base::testutil::run_rule;

    fn routing_findings(rule: &dyn Rule, content: &str) -> Vec<Finding> {
        run_rule(rule, "app/app-routing.module.ts", content, ArtifactKind::Routing, None)
    }

    #[test]
    fn eager_table_flagged_lazy_table_quiet() {
        let eager = "const routes = [\n  { path: 'home', component: HomeComponent },\n  { path: 'users', component: UsersComponent },\n];\n";
        assert_eq!(routing_findings(&EagerRouteLoadingRule, eager).len(), 1);

        let lazy = "const routes = [\n  { path: 'home', component: HomeComponent },\n  { path: 'users', loadChildren: () => import('./users/users.module') },\n];\n";
        assert!(routing_findings(&EagerRouteLoadingRule, lazy).is_empty());
    }

    #[test]
    fn unguarded_admin_route_is_high() {
        let src = "const routes = [\n  { path: 'admin', component: AdminComponent },\n];\n";
        let findings = routing_findings(&UnguardedAdminRouteRule, src);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn guarded_admin_route_is_quiet() {
        let src = "const routes = [\n  { path: 'admin', component: AdminComponent, canActivate: [adminGuard] },\n];\n";
        assert!(routing_findings(&UnguardedAdminRouteRule, src).is_empty());
    }

    #[test]
    fn wildcard_presence_checked() {
        let without = "const routes = [\n  { path: 'a', component: A },\n  { path: 'b', component: B },\n];\n";
        assert_eq!(routing_findings(&MissingWildcardRouteRule, without).len(), 1);

        let with = "const routes = [\n  { path: 'a', component: A },\n  { path: '**', component: NotFound },\n];\n";
        assert!(routing_findings(&MissingWildcardRouteRule, with).is_empty());
    }

    #[test]
    fn snapshot_params_flagged() {
        let src = "ngOnInit() {\n  this.id = this.route.snapshot.params['id'];\n}\n";
        assert_eq!(routing_findings(&SnapshotParamBindingRule, src).len(), 1);
    }

    #[test]
    fn deep_children_flagged() {
        let src = "const routes = [{ path: 'a', children: [\n  { path: 'b', children: [\n    { path: 'c', children: [\n      { path: 'd', children: [\n        { path: 'e', component: E },\n      ] },\n    ] },\n  ] },\n] }];\n";
        let findings = routing_findings(&DeepRouteNestingRule, src);
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn shallow_children_quiet() {
        let src = "const routes = [{ path: 'a', children: [{ path: 'b', component: B }] }];\n";
        assert!(routing_findings(&DeepRouteNestingRule, src).is_empty());
    }
}
