//! Rule configuration
//!
//! Every numeric bound a rule compares against lives here, so CI setups can
//! tighten or relax detection without touching rule code and tests can pin
//! thresholds deterministically. The whole surface deserializes from TOML or
//! JSON with per-field defaults; embedders load the file, this crate only
//! consumes the values.
//!
//! ```toml
//! [god_component]
//! max_imports = 20
//! max_imports_critical = 30
//! max_lines = 400
//! max_lines_critical = 500
//!
//! [subscription_hell]
//! max_depth = 1
//!
//! [bundle_budget]
//! min_bytes = 512000
//! ```

use serde::Deserialize;

/// Thresholds for the god component rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GodComponentConfig {
    /// Import count above which severity is HIGH.
    pub max_imports: usize,
    /// Import count above which severity escalates to CRITICAL.
    pub max_imports_critical: usize,
    /// Line count above which severity is HIGH.
    pub max_lines: usize,
    /// Line count above which severity escalates to CRITICAL.
    pub max_lines_critical: usize,
}

impl Default for GodComponentConfig {
    fn default() -> Self {
        Self {
            max_imports: 20,
            max_imports_critical: 30,
            max_lines: 400,
            max_lines_critical: 500,
        }
    }
}

/// Nested subscription depth tolerated before findings escalate.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubscriptionHellConfig {
    /// Nesting depth above which a nested subscribe becomes CRITICAL.
    pub max_depth: usize,
}

impl Default for SubscriptionHellConfig {
    fn default() -> Self {
        Self { max_depth: 1 }
    }
}

/// Companion-size evidence used by the bundle budget rule.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BundleBudgetConfig {
    /// Companion source size in bytes above which the budget is exceeded.
    pub min_bytes: usize,
}

impl Default for BundleBudgetConfig {
    fn default() -> Self {
        Self { min_bytes: 512_000 }
    }
}

/// Template-shape thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Call sites in binding expressions above which severity escalates.
    pub max_function_calls: usize,
    /// Structural directives tolerated before the template counts as overloaded.
    pub max_structural_directives: usize,
    /// Character length above which a binding expression is complex.
    pub max_expression_length: usize,
    /// Ternary operators tolerated in one expression.
    pub max_expression_ternaries: usize,
    /// Inline `style=` attributes tolerated per template.
    pub max_inline_styles: usize,
    /// Element nesting depth tolerated before flagging.
    pub max_nesting_depth: usize,
    /// Images required before missing `loading="lazy"` is reported.
    pub min_images_for_lazy: usize,
    /// Companion markers that corroborate a large rendered collection.
    pub large_collection_markers: Vec<String>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            max_function_calls: 5,
            max_structural_directives: 8,
            max_expression_length: 80,
            max_expression_ternaries: 2,
            max_inline_styles: 5,
            max_nesting_depth: 8,
            min_images_for_lazy: 3,
            large_collection_markers: vec![
                "getAll".into(),
                "loadAll".into(),
                "findAll".into(),
                "fetchAll".into(),
                "selectAll".into(),
            ],
        }
    }
}

/// Dependency injection thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Constructor parameters above which severity is MEDIUM.
    pub max_constructor_params: usize,
    /// Constructor parameters above which severity escalates to HIGH.
    pub max_constructor_params_high: usize,
    /// Statements tolerated inside a constructor body.
    pub max_constructor_statements: usize,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            max_constructor_params: 6,
            max_constructor_params_high: 10,
            max_constructor_statements: 5,
        }
    }
}

/// TypeScript hygiene thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TypeScriptConfig {
    /// `any` annotations above which severity is MEDIUM.
    pub max_any: usize,
    /// `any` annotations above which severity escalates to HIGH.
    pub max_any_critical: usize,
    /// Non-null assertions tolerated per artifact.
    pub max_non_null_assertions: usize,
    /// Distinct magic numbers tolerated per artifact.
    pub max_magic_numbers: usize,
}

impl Default for TypeScriptConfig {
    fn default() -> Self {
        Self {
            max_any: 5,
            max_any_critical: 15,
            max_non_null_assertions: 10,
            max_magic_numbers: 8,
        }
    }
}

/// Form complexity thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    /// `ngModel` bindings tolerated in one template-driven form.
    pub max_ng_model_bindings: usize,
    /// Nested form group depth tolerated.
    pub max_group_depth: usize,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            max_ng_model_bindings: 10,
            max_group_depth: 4,
        }
    }
}

/// Store and state-shape thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Lines above which a store file counts as massive.
    pub max_store_lines: usize,
    /// Nesting depth tolerated in a state interface.
    pub max_state_depth: usize,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            max_store_lines: 300,
            max_state_depth: 4,
        }
    }
}

/// Performance-rule thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Component line count above which a missing OnPush strategy escalates.
    pub onpush_line_threshold: usize,
    /// Manual `detectChanges()` calls tolerated per artifact.
    pub max_detect_changes: usize,
    /// Inline template line count above which extraction is suggested.
    pub max_inline_template_lines: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            onpush_line_threshold: 150,
            max_detect_changes: 3,
            max_inline_template_lines: 40,
        }
    }
}

/// Routing thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Route nesting depth tolerated in a route table.
    pub max_route_depth: usize,
    /// Path segments that mark a route as privileged and guard-worthy.
    pub privileged_path_markers: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_route_depth: 3,
            privileged_path_markers: vec![
                "admin".into(),
                "settings".into(),
                "account".into(),
                "billing".into(),
            ],
        }
    }
}

/// The full configuration surface consumed by rules.
///
/// Construct with [`RuleConfig::default`] or deserialize from an embedder's
/// config file; rules receive it by reference and never mutate it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub god_component: GodComponentConfig,
    pub subscription_hell: SubscriptionHellConfig,
    pub bundle_budget: BundleBudgetConfig,
    pub template: TemplateConfig,
    pub injection: InjectionConfig,
    pub typescript: TypeScriptConfig,
    pub forms: FormsConfig,
    pub state: StateConfig,
    pub performance: PerformanceConfig,
    pub routing: RoutingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let cfg = RuleConfig::default();
        assert_eq!(cfg.god_component.max_imports, 20);
        assert_eq!(cfg.god_component.max_imports_critical, 30);
        assert_eq!(cfg.god_component.max_lines, 400);
        assert_eq!(cfg.god_component.max_lines_critical, 500);
        assert_eq!(cfg.subscription_hell.max_depth, 1);
        assert_eq!(cfg.bundle_budget.min_bytes, 512_000);
    }

    #[test]
    fn partial_toml_overrides_keep_other_defaults() {
        let cfg: RuleConfig = toml::from_str(
            r#"
            [god_component]
            max_imports = 12

            [template]
            max_function_calls = 2
            "#,
        )
        .unwrap();

        assert_eq!(cfg.god_component.max_imports, 12);
        assert_eq!(cfg.god_component.max_imports_critical, 30);
        assert_eq!(cfg.template.max_function_calls, 2);
        assert_eq!(cfg.template.max_structural_directives, 8);
    }

    #[test]
    fn json_overrides_deserialize() {
        let cfg: RuleConfig =
            serde_json::from_str(r#"{"subscription_hell": {"max_depth": 3}}"#).unwrap();
        assert_eq!(cfg.subscription_hell.max_depth, 3);
        assert_eq!(cfg.state.max_store_lines, 300);
    }
}
