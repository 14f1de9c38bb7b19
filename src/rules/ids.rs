//! Rule identifiers and families
//!
//! Every rule has a closed, typed identity instead of a bare string key.
//! Dispatch and reporting match exhaustively on these enums; the `Custom`
//! variant is the extension point for rules registered by embedders.

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Rule families, used as the reporting category of every finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleCategory {
    TemplateRendering,
    ArchitectureDi,
    Reactivity,
    StateManagement,
    Performance,
    Forms,
    TypeScript,
    Routing,
    Testing,
    Extension,
}

impl RuleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleCategory::TemplateRendering => "template-rendering",
            RuleCategory::ArchitectureDi => "architecture-di",
            RuleCategory::Reactivity => "reactivity",
            RuleCategory::StateManagement => "state-management",
            RuleCategory::Performance => "performance",
            RuleCategory::Forms => "forms",
            RuleCategory::TypeScript => "typescript",
            RuleCategory::Routing => "routing",
            RuleCategory::Testing => "testing",
            RuleCategory::Extension => "extension",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TemplateRule {
    MissingTrackBy,
    TemplateFunctionCalls,
    UnsafeInnerHtml,
    NestedAnchorTags,
    NonDeterministicRendering,
    StructuralDirectiveOverload,
    NgIfForSameElement,
    ComplexTemplateExpression,
    InlineStyleOverload,
    ImageMissingDimensions,
    AnchorTargetBlank,
    DeepComponentNesting,
    TemplateAnyCast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArchitectureRule {
    GodComponent,
    SelfInjectionCycle,
    ConstructorOverInjection,
    HttpInComponent,
    DomManipulation,
    ServiceLocator,
    MissingProvidedIn,
    ComponentInheritance,
    ManualServiceInstantiation,
    LogicHeavyConstructor,
    EmptyLifecycleHook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReactivityRule {
    SubscriptionWithoutCleanup,
    NestedSubscribe,
    EffectWritesState,
    SubjectWithoutComplete,
    ExposedSubject,
    MissingDebounce,
    PromiseStreamMixing,
    AsyncPipeWithSubscribe,
    SignalMutationOutsideUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateRule {
    ReducerStateMutation,
    EffectWithoutErrorHandling,
    StoreSubscribeNoCleanup,
    RedundantEntityStorage,
    SelectorLogicInComponent,
    UntypedActionDispatch,
    MassiveStoreFile,
    NestedStateDepth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PerformanceRule {
    MissingOnPush,
    ManualChangeDetectionOveruse,
    HeavyGetter,
    FullLibraryImport,
    IntervalPolling,
    MissingLazyImage,
    BundleBudgetExceeded,
    FunctionCallInHotPath,
    LargeInlineTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormsRule {
    OversizedTemplateForm,
    MissingFormValidation,
    NestedFormGroupDepth,
    ManualDomValueAccess,
    FormValueChangesLeak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeScriptRule {
    AnyTypeOveruse,
    NonNullAssertionOveruse,
    TsIgnore,
    EmptyInterface,
    ParallelShapeDuplication,
    MagicNumbers,
    UntypedPublicApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoutingRule {
    EagerRouteLoading,
    UnguardedAdminRoute,
    MissingWildcardRoute,
    SnapshotParamBinding,
    DeepRouteNesting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TestingRule {
    AssertionFreeTest,
    FocusedTest,
    DisabledTest,
    MissingAsyncTeardown,
    TestConsoleNoise,
}

/// Typed identity of a detection rule.
///
/// One variant per family; `Custom` carries the stable identifier of an
/// embedder-registered rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleId {
    Template(TemplateRule),
    Architecture(ArchitectureRule),
    Reactivity(ReactivityRule),
    State(StateRule),
    Performance(PerformanceRule),
    Forms(FormsRule),
    TypeScript(TypeScriptRule),
    Routing(RoutingRule),
    Testing(TestingRule),
    Custom(&'static str),
}

impl RuleId {
    /// Stable kebab-case identifier, used in reports and suppression files.
    pub fn as_str(&self) -> &'static str {
        use RuleId::*;
        match self {
            Template(r) => match r {
                TemplateRule::MissingTrackBy => "missing-track-by",
                TemplateRule::TemplateFunctionCalls => "template-function-calls",
                TemplateRule::UnsafeInnerHtml => "unsafe-inner-html",
                TemplateRule::NestedAnchorTags => "nested-anchor-tags",
                TemplateRule::NonDeterministicRendering => "non-deterministic-rendering",
                TemplateRule::StructuralDirectiveOverload => "structural-directive-overload",
                TemplateRule::NgIfForSameElement => "ng-if-for-same-element",
                TemplateRule::ComplexTemplateExpression => "complex-template-expression",
                TemplateRule::InlineStyleOverload => "inline-style-overload",
                TemplateRule::ImageMissingDimensions => "image-missing-dimensions",
                TemplateRule::AnchorTargetBlank => "anchor-target-blank",
                TemplateRule::DeepComponentNesting => "deep-component-nesting",
                TemplateRule::TemplateAnyCast => "template-any-cast",
            },
            Architecture(r) => match r {
                ArchitectureRule::GodComponent => "god-component",
                ArchitectureRule::SelfInjectionCycle => "self-injection-cycle",
                ArchitectureRule::ConstructorOverInjection => "constructor-over-injection",
                ArchitectureRule::HttpInComponent => "http-in-component",
                ArchitectureRule::DomManipulation => "dom-manipulation",
                ArchitectureRule::ServiceLocator => "service-locator",
                ArchitectureRule::MissingProvidedIn => "missing-provided-in",
                ArchitectureRule::ComponentInheritance => "component-inheritance",
                ArchitectureRule::ManualServiceInstantiation => "manual-service-instantiation",
                ArchitectureRule::LogicHeavyConstructor => "logic-heavy-constructor",
                ArchitectureRule::EmptyLifecycleHook => "empty-lifecycle-hook",
            },
            Reactivity(r) => match r {
                ReactivityRule::SubscriptionWithoutCleanup => "subscription-without-cleanup",
                ReactivityRule::NestedSubscribe => "nested-subscribe",
                ReactivityRule::EffectWritesState => "effect-writes-state",
                ReactivityRule::SubjectWithoutComplete => "subject-without-complete",
                ReactivityRule::ExposedSubject => "exposed-subject",
                ReactivityRule::MissingDebounce => "missing-debounce",
                ReactivityRule::PromiseStreamMixing => "promise-stream-mixing",
                ReactivityRule::AsyncPipeWithSubscribe => "async-pipe-with-subscribe",
                ReactivityRule::SignalMutationOutsideUpdate => "signal-mutation-outside-update",
            },
            State(r) => match r {
                StateRule::ReducerStateMutation => "reducer-state-mutation",
                StateRule::EffectWithoutErrorHandling => "effect-without-error-handling",
                StateRule::StoreSubscribeNoCleanup => "store-subscribe-no-cleanup",
                StateRule::RedundantEntityStorage => "redundant-entity-storage",
                StateRule::SelectorLogicInComponent => "selector-logic-in-component",
                StateRule::UntypedActionDispatch => "untyped-action-dispatch",
                StateRule::MassiveStoreFile => "massive-store-file",
                StateRule::NestedStateDepth => "nested-state-depth",
            },
            Performance(r) => match r {
                PerformanceRule::MissingOnPush => "missing-onpush",
                PerformanceRule::ManualChangeDetectionOveruse => "manual-change-detection-overuse",
                PerformanceRule::HeavyGetter => "heavy-getter",
                PerformanceRule::FullLibraryImport => "full-library-import",
                PerformanceRule::IntervalPolling => "interval-polling",
                PerformanceRule::MissingLazyImage => "missing-lazy-image",
                PerformanceRule::BundleBudgetExceeded => "bundle-budget-exceeded",
                PerformanceRule::FunctionCallInHotPath => "function-call-in-hot-path",
                PerformanceRule::LargeInlineTemplate => "large-inline-template",
            },
            Forms(r) => match r {
                FormsRule::OversizedTemplateForm => "oversized-template-form",
                FormsRule::MissingFormValidation => "missing-form-validation",
                FormsRule::NestedFormGroupDepth => "nested-form-group-depth",
                FormsRule::ManualDomValueAccess => "manual-dom-value-access",
                FormsRule::FormValueChangesLeak => "form-value-changes-leak",
            },
            TypeScript(r) => match r {
                TypeScriptRule::AnyTypeOveruse => "any-type-overuse",
                TypeScriptRule::NonNullAssertionOveruse => "non-null-assertion-overuse",
                TypeScriptRule::TsIgnore => "ts-ignore",
                TypeScriptRule::EmptyInterface => "empty-interface",
                TypeScriptRule::ParallelShapeDuplication => "parallel-shape-duplication",
                TypeScriptRule::MagicNumbers => "magic-numbers",
                TypeScriptRule::UntypedPublicApi => "untyped-public-api",
            },
            Routing(r) => match r {
                RoutingRule::EagerRouteLoading => "eager-route-loading",
                RoutingRule::UnguardedAdminRoute => "unguarded-admin-route",
                RoutingRule::MissingWildcardRoute => "missing-wildcard-route",
                RoutingRule::SnapshotParamBinding => "snapshot-param-binding",
                RoutingRule::DeepRouteNesting => "deep-route-nesting",
            },
            Testing(r) => match r {
                TestingRule::AssertionFreeTest => "assertion-free-test",
                TestingRule::FocusedTest => "focused-test",
                TestingRule::DisabledTest => "disabled-test",
                TestingRule::MissingAsyncTeardown => "missing-async-teardown",
                TestingRule::TestConsoleNoise => "test-console-noise",
            },
            Custom(id) => id,
        }
    }

    /// The family this rule reports under.
    pub fn category(&self) -> RuleCategory {
        match self {
            RuleId::Template(_) => RuleCategory::TemplateRendering,
            RuleId::Architecture(_) => RuleCategory::ArchitectureDi,
            RuleId::Reactivity(_) => RuleCategory::Reactivity,
            RuleId::State(_) => RuleCategory::StateManagement,
            RuleId::Performance(_) => RuleCategory::Performance,
            RuleId::Forms(_) => RuleCategory::Forms,
            RuleId::TypeScript(_) => RuleCategory::TypeScript,
            RuleId::Routing(_) => RuleCategory::Routing,
            RuleId::Testing(_) => RuleCategory::Testing,
            RuleId::Custom(_) => RuleCategory::Extension,
        }
    }

    /// All built-in rule identities, in family order.
    pub fn builtin() -> &'static [RuleId] {
        ALL_BUILTIN
    }

    /// Resolve a built-in rule from its kebab-case identifier.
    pub fn parse(s: &str) -> Option<RuleId> {
        ALL_BUILTIN.iter().copied().find(|id| id.as_str() == s)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static ALL_BUILTIN: &[RuleId] = &[
    RuleId::Template(TemplateRule::MissingTrackBy),
    RuleId::Template(TemplateRule::TemplateFunctionCalls),
    RuleId::Template(TemplateRule::UnsafeInnerHtml),
    RuleId::Template(TemplateRule::NestedAnchorTags),
    RuleId::Template(TemplateRule::NonDeterministicRendering),
    RuleId::Template(TemplateRule::StructuralDirectiveOverload),
    RuleId::Template(TemplateRule::NgIfForSameElement),
    RuleId::Template(TemplateRule::ComplexTemplateExpression),
    RuleId::Template(TemplateRule::InlineStyleOverload),
    RuleId::Template(TemplateRule::ImageMissingDimensions),
    RuleId::Template(TemplateRule::AnchorTargetBlank),
    RuleId::Template(TemplateRule::DeepComponentNesting),
    RuleId::Template(TemplateRule::TemplateAnyCast),
    RuleId::Architecture(ArchitectureRule::GodComponent),
    RuleId::Architecture(ArchitectureRule::SelfInjectionCycle),
    RuleId::Architecture(ArchitectureRule::ConstructorOverInjection),
    RuleId::Architecture(ArchitectureRule::HttpInComponent),
    RuleId::Architecture(ArchitectureRule::DomManipulation),
    RuleId::Architecture(ArchitectureRule::ServiceLocator),
    RuleId::Architecture(ArchitectureRule::MissingProvidedIn),
    RuleId::Architecture(ArchitectureRule::ComponentInheritance),
    RuleId::Architecture(ArchitectureRule::ManualServiceInstantiation),
    RuleId::Architecture(ArchitectureRule::LogicHeavyConstructor),
    RuleId::Architecture(ArchitectureRule::EmptyLifecycleHook),
    RuleId::Reactivity(ReactivityRule::SubscriptionWithoutCleanup),
    RuleId::Reactivity(ReactivityRule::NestedSubscribe),
    RuleId::Reactivity(ReactivityRule::EffectWritesState),
    RuleId::Reactivity(ReactivityRule::SubjectWithoutComplete),
    RuleId::Reactivity(ReactivityRule::ExposedSubject),
    RuleId::Reactivity(ReactivityRule::MissingDebounce),
    RuleId::Reactivity(ReactivityRule::PromiseStreamMixing),
    RuleId::Reactivity(ReactivityRule::AsyncPipeWithSubscribe),
    RuleId::Reactivity(ReactivityRule::SignalMutationOutsideUpdate),
    RuleId::State(StateRule::ReducerStateMutation),
    RuleId::State(StateRule::EffectWithoutErrorHandling),
    RuleId::State(StateRule::StoreSubscribeNoCleanup),
    RuleId::State(StateRule::RedundantEntityStorage),
    RuleId::State(StateRule::SelectorLogicInComponent),
    RuleId::State(StateRule::UntypedActionDispatch),
    RuleId::State(StateRule::MassiveStoreFile),
    RuleId::State(StateRule::NestedStateDepth),
    RuleId::Performance(PerformanceRule::MissingOnPush),
    RuleId::Performance(PerformanceRule::ManualChangeDetectionOveruse),
    RuleId::Performance(PerformanceRule::HeavyGetter),
    RuleId::Performance(PerformanceRule::FullLibraryImport),
    RuleId::Performance(PerformanceRule::IntervalPolling),
    RuleId::Performance(PerformanceRule::MissingLazyImage),
    RuleId::Performance(PerformanceRule::BundleBudgetExceeded),
    RuleId::Performance(PerformanceRule::FunctionCallInHotPath),
    RuleId::Performance(PerformanceRule::LargeInlineTemplate),
    RuleId::Forms(FormsRule::OversizedTemplateForm),
    RuleId::Forms(FormsRule::MissingFormValidation),
    RuleId::Forms(FormsRule::NestedFormGroupDepth),
    RuleId::Forms(FormsRule::ManualDomValueAccess),
    RuleId::Forms(FormsRule::FormValueChangesLeak),
    RuleId::TypeScript(TypeScriptRule::AnyTypeOveruse),
    RuleId::TypeScript(TypeScriptRule::NonNullAssertionOveruse),
    RuleId::TypeScript(TypeScriptRule::TsIgnore),
    RuleId::TypeScript(TypeScriptRule::EmptyInterface),
    RuleId::TypeScript(TypeScriptRule::ParallelShapeDuplication),
    RuleId::TypeScript(TypeScriptRule::MagicNumbers),
    RuleId::TypeScript(TypeScriptRule::UntypedPublicApi),
    RuleId::Routing(RoutingRule::EagerRouteLoading),
    RuleId::Routing(RoutingRule::UnguardedAdminRoute),
    RuleId::Routing(RoutingRule::MissingWildcardRoute),
    RuleId::Routing(RoutingRule::SnapshotParamBinding),
    RuleId::Routing(RoutingRule::DeepRouteNesting),
    RuleId::Testing(TestingRule::AssertionFreeTest),
    RuleId::Testing(TestingRule::FocusedTest),
    RuleId::Testing(TestingRule::DisabledTest),
    RuleId::Testing(TestingRule::MissingAsyncTeardown),
    RuleId::Testing(TestingRule::TestConsoleNoise),
];

impl Serialize for RuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RuleId::parse(&s).ok_or_else(|| D::Error::custom(format!("unknown rule id: {s}")))
    }
}

impl Serialize for RuleCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleCategory {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        const ALL: &[RuleCategory] = &[
            RuleCategory::TemplateRendering,
            RuleCategory::ArchitectureDi,
            RuleCategory::Reactivity,
            RuleCategory::StateManagement,
            RuleCategory::Performance,
            RuleCategory::Forms,
            RuleCategory::TypeScript,
            RuleCategory::Routing,
            RuleCategory::Testing,
            RuleCategory::Extension,
        ];
        ALL.iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| D::Error::custom(format!("unknown rule category: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn builtin_ids_are_unique() {
        let mut seen = FxHashSet::default();
        for id in RuleId::builtin() {
            assert!(seen.insert(id.as_str()), "duplicate rule id: {id}");
        }
    }

    #[test]
    fn parse_round_trips() {
        for id in RuleId::builtin() {
            assert_eq!(RuleId::parse(id.as_str()), Some(*id));
        }
        assert_eq!(RuleId::parse("no-such-rule"), None);
    }

    #[test]
    fn custom_ids_report_extension_category() {
        let id = RuleId::Custom("team-naming-convention");
        assert_eq!(id.category(), RuleCategory::Extension);
        assert_eq!(id.as_str(), "team-naming-convention");
    }

    #[test]
    fn serde_uses_kebab_case_ids() {
        let id = RuleId::Template(TemplateRule::MissingTrackBy);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"missing-track-by\"");
        let back: RuleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
