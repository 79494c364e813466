//! Long-lived render engine. Holds the catalog, registries, hooks and
//! configuration shared by every request; per-request state lives in
//! [`RenderSession`].

use std::sync::Arc;

use adrotate_conditions::ConditionEvaluator;
use adrotate_core::{AppConfig, Catalog, HookRegistry, PlacementTypeRegistry, RequestContext};
use adrotate_selection::WeightedSelector;
use tracing::info;

use crate::session::RenderSession;
use crate::types::AdTypeRegistry;

pub struct Engine {
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) ad_types: AdTypeRegistry,
    pub(crate) placement_types: PlacementTypeRegistry,
    pub(crate) conditions: ConditionEvaluator,
    pub(crate) hooks: Arc<HookRegistry>,
    pub(crate) config: AppConfig,
}

impl Engine {
    /// Engine with the built-in ad types, placement types and conditions.
    pub fn new(catalog: Arc<dyn Catalog>, config: AppConfig) -> Self {
        info!(
            prefix = %config.frontend_prefix,
            seeded = config.selection.seed.is_some(),
            "render engine initialized"
        );
        Self {
            catalog,
            ad_types: AdTypeRegistry::with_defaults(),
            placement_types: PlacementTypeRegistry::with_defaults(),
            conditions: ConditionEvaluator::with_defaults(),
            hooks: Arc::new(HookRegistry::new()),
            config,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_conditions(mut self, conditions: ConditionEvaluator) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_ad_types(mut self, ad_types: AdTypeRegistry) -> Self {
        self.ad_types = ad_types;
        self
    }

    pub fn with_placement_types(mut self, placement_types: PlacementTypeRegistry) -> Self {
        self.placement_types = placement_types;
        self
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn placement_types(&self) -> &PlacementTypeRegistry {
        &self.placement_types
    }

    /// Start a request. The selector is seeded from `selection.seed` when
    /// configured, otherwise from OS entropy.
    pub fn session(&self, ctx: RequestContext) -> RenderSession<'_> {
        let selector = WeightedSelector::from_seed_option(self.config.selection.seed);
        RenderSession::new(self, ctx, selector)
    }

    pub fn session_with_selector(
        &self,
        ctx: RequestContext,
        selector: WeightedSelector,
    ) -> RenderSession<'_> {
        RenderSession::new(self, ctx, selector)
    }
}
