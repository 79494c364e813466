//! Group composition: select members, render them as children, wrap the
//! concatenated output.

use std::collections::HashMap;

use adrotate_core::{Ad, EntityId, EntityKind, Group, Override, RenderArgs, RenderMethod};
use tracing::debug;

use crate::ad::{assemble, shows_edit_bar};
use crate::session::RenderSession;
use crate::wrapper::{edit_bar, label_markup, label_text, Wrapper, WrapperInput};

impl RenderSession<'_> {
    pub(crate) fn compose_group(&mut self, group: &Group, args: RenderArgs) -> String {
        let summary = group.summary();

        if args.is_self_reference(EntityKind::Group) {
            debug!(group_id = %summary.id, "group embedded in itself, skipped");
            return String::new();
        }
        // Checked once for the whole selection, before any member renders.
        if let Override::Replace(output) = self.engine.hooks.override_output(&summary, &args) {
            return output;
        }

        let engine = self.engine;
        let mut members: HashMap<EntityId, Ad> = HashMap::new();
        let order = self.selector.select(&group.group_type(), &group.ad_weights(), |id| {
            match engine.catalog.read_ad(id) {
                Some(ad) => {
                    members.insert(id, ad);
                    true
                }
                None => false,
            }
        });
        if order.is_empty() {
            debug!(group_id = %summary.id, "group has nothing to rotate");
            return String::new();
        }

        let mut child = args.child();
        child.child_wrappers =
            args.child_wrappers || group.option("child_wrappers").as_bool().unwrap_or(false);
        child.stats_parent = Some(args.stats_parent.clone().unwrap_or_else(|| summary.key()));

        let limit = group.ad_count();
        let mut shown = 0;
        let mut parts = Vec::new();
        for id in order {
            if !limit.allows(shown) {
                break;
            }
            let Some(mut ad) = members.remove(&id) else {
                continue;
            };
            ad.props_mut().attach_hooks(engine.hooks.clone());
            let output = self.compose_ad(&ad, child.clone().entry(id.to_string(), RenderMethod::Ad));
            if !output.is_empty() {
                parts.push(output);
                shown += 1;
            }
        }

        let body = parts.concat();
        if body.is_empty() {
            debug!(group_id = %summary.id, "no group member rendered");
            self.stats.discard(&summary, args.stats_parent.as_deref());
            return String::new();
        }

        let output = if args.is_top_level || args.child_wrappers {
            let config = &engine.config;
            let label = label_text(config, &args).map(|text| label_markup(config, &text));
            let edit = shows_edit_bar(self, &args)
                .then(|| group.id().map(|id| edit_bar(config, id)))
                .flatten();
            let mut wrapper = Wrapper::build(&WrapperInput::default(), &args);
            if !wrapper.is_empty() {
                wrapper.id = Some(self.next_wrapper_id());
            }
            let clearfix = args.is_top_level && args.placement_clearfix;
            assemble(Some(&wrapper), label.as_deref(), edit, &body, clearfix)
        } else {
            body
        };

        let output = engine.hooks.filter_output(output, &summary, &args);
        if output.is_empty() {
            self.stats.discard(&summary, args.stats_parent.as_deref());
        } else {
            debug!(group_id = %summary.id, shown, parent = ?args.stats_parent, "group rendered");
            self.stats.record(&summary, args.stats_parent.as_deref());
        }
        output
    }
}
