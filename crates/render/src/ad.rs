//! Ad composition: eligibility gate, body, wrapper, post-processing.

use std::cell::OnceCell;
use std::sync::Arc;

use adrotate_core::types::EntityStatus;
use adrotate_core::{Ad, EntityKind, EntitySummary, Override, RenderArgs, RenderMethod};
use tracing::debug;

use crate::session::RenderSession;
use crate::types::AdType;
use crate::wrapper::{edit_bar, label_markup, label_text, Wrapper, WrapperInput, CLEARFIX};

/// Render-scoped view of an ad. The wrapper and label are computed on first
/// use and dropped with the render.
struct AdRender<'a> {
    ad: &'a Ad,
    args: RenderArgs,
    ad_type: Arc<dyn AdType>,
    wrapper: OnceCell<Wrapper>,
    label: OnceCell<Option<String>>,
}

impl<'a> AdRender<'a> {
    fn new(ad: &'a Ad, args: RenderArgs, ad_type: Arc<dyn AdType>) -> Self {
        Self {
            ad,
            args,
            ad_type,
            wrapper: OnceCell::new(),
            label: OnceCell::new(),
        }
    }

    fn wrapper_input(&self) -> WrapperInput {
        let ad = self.ad;
        let sized = ad.add_wrapper_sizes() && self.ad_type.has_size();
        WrapperInput {
            position: ad.position(),
            margin: ad.margin(),
            width: if sized { ad.width() } else { 0 },
            height: if sized { ad.height() } else { 0 },
            wrapper_id: ad.wrapper_id(),
            wrapper_class: ad.wrapper_class(),
        }
    }

    fn wrapper(&self, next_id: impl FnOnce() -> String) -> &Wrapper {
        self.wrapper.get_or_init(|| {
            let mut wrapper = Wrapper::build(&self.wrapper_input(), &self.args);
            if !wrapper.is_empty() && wrapper.id.is_none() {
                wrapper.id = Some(next_id());
            }
            wrapper
        })
    }

    fn label(&self, text: impl FnOnce(&RenderArgs) -> Option<String>) -> Option<&str> {
        self.label.get_or_init(|| text(&self.args)).as_deref()
    }

    /// Children only get wrappers when the parent re-enables them.
    fn uses_wrapper(&self) -> bool {
        self.args.is_top_level || self.args.child_wrappers
    }
}

/// Label, edit bar, body, optionally inside the wrapper, then clearfix.
pub(crate) fn assemble(
    wrapper: Option<&Wrapper>,
    label: Option<&str>,
    edit: Option<String>,
    body: &str,
    clearfix: bool,
) -> String {
    let mut inner = String::new();
    if let Some(label) = label {
        inner.push_str(label);
    }
    if let Some(edit) = edit {
        inner.push_str(&edit);
    }
    inner.push_str(body);

    let mut output = match wrapper {
        Some(wrapper) if wrapper.is_needed() => wrapper.wrap(&inner),
        _ => inner,
    };
    if clearfix {
        output.push_str(CLEARFIX);
    }
    output
}

/// Edit affordance: editors only, top-level renders through a real
/// placement, never inside shortcode embeds.
pub(crate) fn shows_edit_bar(session: &RenderSession<'_>, args: &RenderArgs) -> bool {
    session.ctx.visitor.can_edit
        && args.is_top_level
        && args.placement_id.is_some()
        && args.method != Some(RenderMethod::Shortcode)
}

impl RenderSession<'_> {
    pub(crate) fn compose_ad(&mut self, ad: &Ad, args: RenderArgs) -> String {
        let summary = ad.summary();

        if args.is_self_reference(EntityKind::Ad) {
            debug!(ad_id = %summary.id, "ad embedded in itself, skipped");
            return String::new();
        }
        if let Override::Replace(output) = self.engine.hooks.override_output(&summary, &args) {
            return output;
        }

        let debug_mode = self.debug_enabled(ad, &args);
        if !debug_mode && !self.can_display_ad(ad, &summary) {
            return String::new();
        }

        let ad_type = self.engine.ad_types.resolve(&ad.type_tag());
        let render = AdRender::new(ad, args, ad_type);

        let mut body_args = render.args.clone();
        if body_args.stats_parent.is_none() {
            body_args.stats_parent = Some(summary.key());
        }
        let mut body = render.ad_type.clone().render_body(ad, self, &body_args);
        if debug_mode {
            body = format!("{}{body}", self.debug_panel(ad));
        }
        if body.trim().is_empty() {
            debug!(ad_id = %summary.id, type_tag = %ad.type_tag(), "ad produced no output");
            self.stats.discard(&summary, render.args.stats_parent.as_deref());
            return String::new();
        }

        let output = if render.uses_wrapper() {
            let engine = self.engine;
            let config = &engine.config;
            let label = render
                .label(|args| label_text(config, args))
                .map(|text| label_markup(config, text));
            let edit = shows_edit_bar(self, &render.args)
                .then(|| ad.id().map(|id| edit_bar(config, id)))
                .flatten();
            let clearfix = render.args.is_top_level && render.args.placement_clearfix;
            let wrapper = render.wrapper(|| self.next_wrapper_id());
            assemble(Some(wrapper), label.as_deref(), edit, &body, clearfix)
        } else {
            body
        };

        let output = self.engine.hooks.filter_output(output, &summary, &render.args);
        if output.is_empty() {
            self.stats.discard(&summary, render.args.stats_parent.as_deref());
        } else {
            debug!(ad_id = %summary.id, parent = ?render.args.stats_parent, "ad rendered");
            self.stats.record(&summary, render.args.stats_parent.as_deref());
        }
        output
    }

    /// Debug mode forces display unless turned off globally or for this call.
    fn debug_enabled(&self, ad: &Ad, args: &RenderArgs) -> bool {
        ad.debug_mode() && self.engine.config.render.debug_output && !args.suppress_debug
    }

    /// Status, expiry, weekday, display and visitor conditions, then the
    /// `can_display` hooks.
    pub(crate) fn can_display_ad(&self, ad: &Ad, summary: &EntitySummary) -> bool {
        let eligible = self.ad_eligibility(ad).map_or(true, |reason| {
            debug!(ad_id = %summary.id, reason, "ad not eligible");
            false
        });
        self.engine.hooks.can_display(eligible, summary, &self.ctx)
    }

    /// First failing check, if any.
    pub(crate) fn ad_eligibility(&self, ad: &Ad) -> Option<&'static str> {
        let ctx = &self.ctx;
        let conditions = &self.engine.conditions;
        if ad.status() != EntityStatus::Publish {
            Some("status")
        } else if ad.is_expired_at(ctx.now) {
            Some("expired")
        } else if !ad.runs_on(ctx.now, self.site_offset()) {
            Some("weekday")
        } else if !conditions.check_display_conditions(&ad.display_conditions(), ctx) {
            Some("display_conditions")
        } else if !conditions.check_visitor_conditions(&ad.visitor_conditions(), ad.mobile_rule(), ctx) {
            Some("visitor_conditions")
        } else {
            None
        }
    }
}
