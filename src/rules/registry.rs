//! Rule registry
//!
//! A static table from artifact kind to the ordered list of rules that run
//! for it. Registration order is part of the engine's stable output order,
//! so the defaults below only ever append.
//!
//! The registry is plain data built by a composition root; tests construct
//! fresh instances with exactly the rules they need.

use crate::models::ArtifactKind;
use crate::rules::architecture::*;
use crate::rules::base::Rule;
use crate::rules::forms::*;
use crate::rules::performance::*;
use crate::rules::reactivity::*;
use crate::rules::routing::*;
use crate::rules::state::*;
use crate::rules::template_rules::*;
use crate::rules::testing::*;
use crate::rules::typescript::*;
use std::sync::Arc;

/// Ordered rule lists per artifact kind. `Directive` resolves to the
/// component list; `Config` and `Other` run nothing.
#[derive(Default)]
pub struct RuleRegistry {
    component: Vec<Arc<dyn Rule>>,
    template: Vec<Arc<dyn Rule>>,
    service: Vec<Arc<dyn Rule>>,
    store: Vec<Arc<dyn Rule>>,
    routing: Vec<Arc<dyn Rule>>,
    test: Vec<Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Empty registry; pair with [`RuleRegistry::register`] for custom setups.
    pub fn new() -> Self {
        Self::default()
    }

    /// The full built-in rule set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        // Shared instances; the same rule may serve several kinds.
        let self_injection: Arc<dyn Rule> = Arc::new(SelfInjectionCycleRule);
        let over_injection: Arc<dyn Rule> = Arc::new(ConstructorOverInjectionRule);
        let dom_manipulation: Arc<dyn Rule> = Arc::new(DomManipulationRule);
        let service_locator: Arc<dyn Rule> = Arc::new(ServiceLocatorRule);
        let manual_service: Arc<dyn Rule> = Arc::new(ManualServiceInstantiationRule);
        let heavy_constructor: Arc<dyn Rule> = Arc::new(LogicHeavyConstructorRule);
        let leaked_subscription: Arc<dyn Rule> = Arc::new(SubscriptionWithoutCleanupRule);
        let nested_subscribe: Arc<dyn Rule> = Arc::new(NestedSubscribeRule);
        let subject_no_complete: Arc<dyn Rule> = Arc::new(SubjectWithoutCompleteRule);
        let exposed_subject: Arc<dyn Rule> = Arc::new(ExposedSubjectRule);
        let promise_mixing: Arc<dyn Rule> = Arc::new(PromiseStreamMixingRule);
        let full_import: Arc<dyn Rule> = Arc::new(FullLibraryImportRule);
        let interval_polling: Arc<dyn Rule> = Arc::new(IntervalPollingRule);
        let untyped_dispatch: Arc<dyn Rule> = Arc::new(UntypedActionDispatchRule);
        let any_overuse: Arc<dyn Rule> = Arc::new(AnyTypeOveruseRule);
        let non_null: Arc<dyn Rule> = Arc::new(NonNullAssertionOveruseRule);
        let ts_ignore: Arc<dyn Rule> = Arc::new(TsIgnoreRule);
        let empty_interface: Arc<dyn Rule> = Arc::new(EmptyInterfaceRule);
        let shape_duplication: Arc<dyn Rule> = Arc::new(ParallelShapeDuplicationRule);
        let magic_numbers: Arc<dyn Rule> = Arc::new(MagicNumbersRule);
        let untyped_api: Arc<dyn Rule> = Arc::new(UntypedPublicApiRule);

        let typescript_set = [
            &any_overuse,
            &non_null,
            &ts_ignore,
            &empty_interface,
            &shape_duplication,
            &magic_numbers,
            &untyped_api,
        ];

        // Components and directives.
        registry.component = vec![
            Arc::new(GodComponentRule),
            Arc::clone(&self_injection),
            Arc::clone(&over_injection),
            Arc::new(HttpInComponentRule),
            Arc::clone(&dom_manipulation),
            Arc::clone(&service_locator),
            Arc::new(ComponentInheritanceRule),
            Arc::clone(&manual_service),
            Arc::clone(&heavy_constructor),
            Arc::new(EmptyLifecycleHookRule),
            Arc::clone(&leaked_subscription),
            Arc::clone(&nested_subscribe),
            Arc::new(EffectWritesStateRule),
            Arc::clone(&subject_no_complete),
            Arc::clone(&exposed_subject),
            Arc::new(MissingDebounceRule),
            Arc::clone(&promise_mixing),
            Arc::new(AsyncPipeWithSubscribeRule),
            Arc::new(SignalMutationOutsideUpdateRule),
            Arc::new(StoreSubscribeNoCleanupRule),
            Arc::new(SelectorLogicInComponentRule),
            Arc::clone(&untyped_dispatch),
            Arc::new(MissingOnPushRule),
            Arc::new(ManualChangeDetectionOveruseRule),
            Arc::new(HeavyGetterRule),
            Arc::clone(&full_import),
            Arc::clone(&interval_polling),
            Arc::new(LargeInlineTemplateRule),
            Arc::new(NestedFormGroupDepthRule),
            Arc::new(ManualDomValueAccessRule),
            Arc::new(FormValueChangesLeakRule),
            Arc::new(SnapshotParamBindingRule),
        ];
        for rule in typescript_set {
            registry.component.push(Arc::clone(rule));
        }

        // Templates.
        registry.template = vec![
            Arc::new(MissingTrackByRule),
            Arc::new(TemplateFunctionCallsRule),
            Arc::new(UnsafeInnerHtmlRule),
            Arc::new(NestedAnchorTagsRule),
            Arc::new(NonDeterministicRenderingRule),
            Arc::new(StructuralDirectiveOverloadRule),
            Arc::new(NgIfForSameElementRule),
            Arc::new(ComplexTemplateExpressionRule),
            Arc::new(InlineStyleOverloadRule),
            Arc::new(ImageMissingDimensionsRule),
            Arc::new(AnchorTargetBlankRule),
            Arc::new(DeepComponentNestingRule),
            Arc::new(TemplateAnyCastRule),
            Arc::new(MissingLazyImageRule),
            Arc::new(BundleBudgetExceededRule),
            Arc::new(FunctionCallInHotPathRule),
            Arc::new(OversizedTemplateFormRule),
            Arc::new(MissingFormValidationRule),
        ];

        // Services (and pipes).
        registry.service = vec![
            Arc::clone(&self_injection),
            Arc::clone(&over_injection),
            Arc::clone(&dom_manipulation),
            Arc::clone(&service_locator),
            Arc::new(MissingProvidedInRule),
            Arc::clone(&manual_service),
            Arc::clone(&heavy_constructor),
            Arc::clone(&leaked_subscription),
            Arc::clone(&nested_subscribe),
            Arc::clone(&subject_no_complete),
            Arc::clone(&exposed_subject),
            Arc::clone(&promise_mixing),
            Arc::clone(&full_import),
            Arc::clone(&interval_polling),
        ];
        for rule in typescript_set {
            registry.service.push(Arc::clone(rule));
        }

        // Stores.
        registry.store = vec![
            Arc::new(ReducerStateMutationRule),
            Arc::new(EffectWithoutErrorHandlingRule),
            Arc::new(RedundantEntityStorageRule),
            Arc::clone(&untyped_dispatch),
            Arc::new(MassiveStoreFileRule),
            Arc::new(NestedStateDepthRule),
            Arc::clone(&nested_subscribe),
            Arc::clone(&subject_no_complete),
            Arc::clone(&full_import),
        ];
        for rule in typescript_set {
            registry.store.push(Arc::clone(rule));
        }

        // Routing tables.
        registry.routing = vec![
            Arc::new(EagerRouteLoadingRule),
            Arc::new(UnguardedAdminRouteRule),
            Arc::new(MissingWildcardRouteRule),
            Arc::new(SnapshotParamBindingRule),
            Arc::new(DeepRouteNestingRule),
            Arc::clone(&any_overuse),
            Arc::clone(&ts_ignore),
        ];

        // Specs.
        registry.test = vec![
            Arc::new(AssertionFreeTestRule),
            Arc::new(FocusedTestRule),
            Arc::new(DisabledTestRule),
            Arc::new(MissingAsyncTeardownRule),
            Arc::new(TestConsoleNoiseRule),
        ];

        registry
    }

    /// Append a rule for one kind. The extension point for embedder rules
    /// (typically with a `RuleId::Custom` identity).
    pub fn register(&mut self, kind: ArtifactKind, rule: Arc<dyn Rule>) {
        match kind {
            ArtifactKind::Component | ArtifactKind::Directive => self.component.push(rule),
            ArtifactKind::Template => self.template.push(rule),
            ArtifactKind::Service => self.service.push(rule),
            ArtifactKind::Store => self.store.push(rule),
            ArtifactKind::Routing => self.routing.push(rule),
            ArtifactKind::Test => self.test.push(rule),
            ArtifactKind::Config | ArtifactKind::Other => {}
        }
    }

    /// The ordered rules applicable to `kind`.
    pub fn rules_for(&self, kind: ArtifactKind) -> &[Arc<dyn Rule>] {
        match kind {
            ArtifactKind::Component | ArtifactKind::Directive => &self.component,
            ArtifactKind::Template => &self.template,
            ArtifactKind::Service => &self.service,
            ArtifactKind::Store => &self.store,
            ArtifactKind::Routing => &self.routing,
            ArtifactKind::Test => &self.test,
            ArtifactKind::Config | ArtifactKind::Other => &[],
        }
    }

    /// Total rule registrations across all kinds (shared rules count once
    /// per kind they serve).
    pub fn len(&self) -> usize {
        self.component.len()
            + self.template.len()
            + self.service.len()
            + self.store.len()
            + self.routing.len()
            + self.test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
