//! Placement composition: resolve the bound item, check it against the
//! placement type, pass placement-scoped arguments down and delegate.

use adrotate_core::{
    Ad, EntityKind, Group, ItemKind, ItemRef, LabelMode, Override, Placement, RenderArgs,
};
use tracing::{debug, warn};

use crate::session::RenderSession;

/// The entity a placement resolved to for this render.
enum ResolvedItem {
    Ad(Ad),
    Group(Group),
}

impl ResolvedItem {
    fn type_tag(&self) -> String {
        match self {
            ResolvedItem::Ad(ad) => ad.type_tag(),
            ResolvedItem::Group(group) => group.group_type().as_str().to_string(),
        }
    }
}

impl RenderSession<'_> {
    pub(crate) fn compose_placement(&mut self, placement: &Placement, args: RenderArgs) -> String {
        let summary = placement.summary();
        let engine = self.engine;

        if args.is_self_reference(EntityKind::Placement) {
            debug!(placement = %summary.id, "placement embedded in itself, skipped");
            return String::new();
        }
        let Some(placement_type) = engine.placement_types.get(&placement.type_tag()) else {
            warn!(placement = %summary.id, type_tag = %placement.type_tag(), "unknown placement type");
            return String::new();
        };
        if let Override::Replace(output) = engine.hooks.override_output(&summary, &args) {
            return output;
        }

        let ctx = &self.ctx;
        let display_ok = engine
            .conditions
            .check_display_conditions(&placement.display_conditions(), ctx);
        let visitor_ok = display_ok
            && engine.conditions.check_visitor_conditions(
                &placement.visitor_conditions(),
                placement.mobile_rule(),
                ctx,
            );
        if !visitor_ok {
            debug!(placement = %summary.id, display_ok, "placement conditions not met");
            return String::new();
        }

        let Some(item) = placement.item() else {
            debug!(placement = %summary.id, "placement has no item");
            return String::new();
        };
        let Some(resolved) = self.resolve_item(item) else {
            debug!(placement = %summary.id, %item, "placement item not found");
            return String::new();
        };
        let item_type = resolved.type_tag();
        if !placement_type.is_entity_allowed(item.kind, &item_type) {
            warn!(
                placement = %summary.id,
                %item,
                item_type = %item_type,
                "item not allowed for placement type"
            );
            return String::new();
        }

        let options = placement.options();
        let mut child = args.clone();
        child.id = Some(item.id.to_string());
        child.placement_id = Some(placement.slug());
        child.placement_type = Some(placement_type.name.clone());
        child.placement_position = options.position.or(args.placement_position);
        child.placement_clearfix = args.placement_clearfix || options.clearfix;
        child
            .wrapper_classes
            .push(format!("{}{}", engine.config.frontend_prefix, placement.slug()));
        child.wrapper_classes.extend(options.classes);
        child.wrapper_attributes.extend(options.attributes);
        child.ad_label = if !placement_type.supports_label {
            LabelMode::Disabled
        } else if args.ad_label != LabelMode::Default {
            args.ad_label
        } else {
            options.ad_label
        };
        child.stats_parent = Some(args.stats_parent.clone().unwrap_or_else(|| summary.key()));

        let output = match resolved {
            ResolvedItem::Ad(mut ad) => {
                ad.props_mut().attach_hooks(engine.hooks.clone());
                self.compose_ad(&ad, child)
            }
            ResolvedItem::Group(mut group) => {
                group.props_mut().attach_hooks(engine.hooks.clone());
                self.compose_group(&group, child)
            }
        };
        if output.is_empty() {
            self.stats.discard(&summary, args.stats_parent.as_deref());
            return output;
        }

        let output = engine.hooks.filter_output(output, &summary, &args);
        if output.is_empty() {
            self.stats.discard(&summary, args.stats_parent.as_deref());
        } else {
            debug!(placement = %summary.id, %item, "placement rendered");
            self.stats.record(&summary, args.stats_parent.as_deref());
        }
        output
    }

    fn resolve_item(&self, item: ItemRef) -> Option<ResolvedItem> {
        let catalog = self.engine.catalog.as_ref();
        match item.kind {
            ItemKind::Ad => catalog.read_ad(item.id).map(ResolvedItem::Ad),
            ItemKind::Group => catalog.read_group(item.id).map(ResolvedItem::Group),
        }
    }
}
