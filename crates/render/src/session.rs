//! Request-scoped render state and the public invocation surface.

use adrotate_core::{EntityId, Placement, RenderArgs, RenderMethod, RequestContext};
use adrotate_selection::WeightedSelector;
use chrono::{FixedOffset, Offset, Utc};
use serde_json::json;
use tracing::{debug, warn};

use crate::engine::Engine;
use crate::stats::StatsCollector;

/// One page render. Owns the request context, the stats collector, the
/// random source and the wrapper id sequence; nothing here outlives the
/// request.
pub struct RenderSession<'e> {
    pub(crate) engine: &'e Engine,
    pub(crate) ctx: RequestContext,
    pub(crate) selector: WeightedSelector,
    pub(crate) stats: StatsCollector,
    wrapper_seq: u32,
}

impl<'e> RenderSession<'e> {
    pub(crate) fn new(engine: &'e Engine, ctx: RequestContext, selector: WeightedSelector) -> Self {
        Self {
            engine,
            ctx,
            selector,
            stats: StatsCollector::new(),
            wrapper_seq: 0,
        }
    }

    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.stats
    }

    pub fn into_stats(self) -> StatsCollector {
        self.stats
    }

    /// Render an ad by id. `override_type` swaps the ad type for this call.
    pub fn render_ad(&mut self, id: EntityId, override_type: Option<&str>, args: RenderArgs) -> String {
        let args = args.entry(id.to_string(), RenderMethod::Ad);
        if let Some(output) = self.short_circuit(&args) {
            return output;
        }
        let Some(mut ad) = self.engine.catalog.read_ad(id) else {
            debug!(ad_id = id, "ad not found");
            return String::new();
        };
        ad.props_mut().attach_hooks(self.engine.hooks.clone());
        if let Some(type_tag) = override_type.filter(|t| !t.is_empty()) {
            ad.props_mut().set_override("type", json!(type_tag));
        }
        self.compose_ad(&ad, args)
    }

    /// Render a group by id. `override_type` swaps the rotation type.
    pub fn render_group(&mut self, id: EntityId, override_type: Option<&str>, args: RenderArgs) -> String {
        let args = args.entry(id.to_string(), RenderMethod::Group);
        if let Some(output) = self.short_circuit(&args) {
            return output;
        }
        let Some(mut group) = self.engine.catalog.read_group(id) else {
            debug!(group_id = id, "group not found");
            return String::new();
        };
        group.props_mut().attach_hooks(self.engine.hooks.clone());
        if let Some(type_tag) = override_type.filter(|t| !t.is_empty()) {
            group.props_mut().set_override("type", json!(type_tag));
        }
        self.compose_group(&group, args)
    }

    /// Render a placement by slug, or by numeric id when no slug matches.
    pub fn render_placement(&mut self, id_or_slug: &str, args: RenderArgs) -> String {
        let engine = self.engine;
        let catalog = engine.catalog.as_ref();
        let placement = catalog.read_placement_by_slug(id_or_slug).or_else(|| {
            id_or_slug
                .parse::<EntityId>()
                .ok()
                .and_then(|id| catalog.read_placement(id))
        });
        match placement {
            Some(placement) => self.render_placement_entity(placement, args),
            None => {
                debug!(placement = id_or_slug, "placement not found");
                String::new()
            }
        }
    }

    pub(crate) fn render_placement_entity(&mut self, mut placement: Placement, args: RenderArgs) -> String {
        let args = args.entry(placement.slug(), RenderMethod::Placement);
        if let Some(output) = self.short_circuit(&args) {
            return output;
        }
        placement.props_mut().attach_hooks(self.engine.hooks.clone());
        self.compose_placement(&placement, args)
    }

    /// Checks shared by every entry point: global kill switches, an explicit
    /// output override and the nesting depth limit.
    fn short_circuit(&self, args: &RenderArgs) -> Option<String> {
        if let Some(switch) = self.ctx.disabled_by(&self.engine.config.disable) {
            debug!(switch, id = ?args.id, "ads disabled for this request");
            return Some(String::new());
        }
        if let Some(output) = &args.override_output {
            return Some(output.clone());
        }
        if args.depth > self.engine.config.render.max_depth {
            warn!(id = ?args.id, depth = args.depth, "render depth limit reached");
            return Some(String::new());
        }
        None
    }

    pub(crate) fn next_wrapper_id(&mut self) -> String {
        self.wrapper_seq += 1;
        format!("{}{}", self.engine.config.frontend_prefix, self.wrapper_seq)
    }

    pub(crate) fn site_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.engine.config.site.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }
}
