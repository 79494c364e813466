use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::info;

use crate::args::LabelMode;
use crate::condition::{Condition, MobileRule};
use crate::error::{AdError, AdResult};
use crate::props::Props;
use crate::types::{EntityId, EntityKind, EntitySummary, ItemKind, ItemRef, Position};

/// Where in-content injection splices output relative to the matched tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InjectAt {
    Before,
    #[default]
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionOptions {
    pub position: InjectAt,
    pub tag: String,
    /// 1-based occurrence of `tag`.
    pub index: usize,
    /// Append to the content when it has fewer matching tags.
    pub fallback_append: bool,
}

impl Default for InjectionOptions {
    fn default() -> Self {
        Self {
            position: InjectAt::After,
            tag: "p".to_string(),
            index: 1,
            fallback_append: false,
        }
    }
}

/// Placement-specific render options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementOptions {
    pub ad_label: LabelMode,
    pub position: Option<Position>,
    pub clearfix: bool,
    pub classes: Vec<String>,
    pub attributes: IndexMap<String, String>,
    pub injection: InjectionOptions,
}

/// Named slot bound to exactly one ad or group.
#[derive(Debug, Clone)]
pub struct Placement {
    props: Props,
}

fn defaults() -> Map<String, Value> {
    let defaults = json!({
        "slug": "",
        "title": "",
        "type": "default",
        "item": null,
        "display_conditions": [],
        "visitor_conditions": [],
        "mobile": null,
        "options": {},
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Placement {
    pub fn new(type_tag: &str, slug: &str) -> Self {
        let mut placement = Self {
            props: Props::new(EntityKind::Placement, defaults()),
        };
        placement.props.set("type", json!(type_tag));
        placement.props.set("slug", json!(slug));
        placement
    }

    pub fn from_storage(id: EntityId, data: Map<String, Value>) -> Self {
        Self {
            props: Props::hydrate(EntityKind::Placement, id, defaults(), data),
        }
    }

    pub fn id(&self) -> Option<EntityId> {
        self.props.id()
    }

    pub fn props(&self) -> &Props {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut Props {
        &mut self.props
    }

    /// Public identifier; falls back to the numeric id.
    pub fn slug(&self) -> String {
        match self.props.get_str("slug") {
            slug if !slug.is_empty() => slug,
            _ => self.id().map(|id| id.to_string()).unwrap_or_default(),
        }
    }

    pub fn summary(&self) -> EntitySummary {
        EntitySummary {
            kind: EntityKind::Placement,
            id: self.slug(),
            type_tag: self.type_tag(),
            title: self.title(),
        }
    }

    pub fn title(&self) -> String {
        self.props.get_str("title")
    }

    pub fn set_title(&mut self, title: &str) {
        self.props.set("title", json!(title));
    }

    pub fn type_tag(&self) -> String {
        self.props.get_str("type")
    }

    /// Bound item. A malformed stored reference reads as unbound.
    pub fn item(&self) -> Option<ItemRef> {
        self.props.get_as("item")
    }

    /// Bind without allow-list validation; for building fresh placements.
    pub fn with_item(mut self, item: ItemRef) -> Self {
        self.props.set("item", json!(item.to_string()));
        self
    }

    /// Rebind the placement. Fails, leaving the current item in place, when
    /// the item is already bound or its type is not allowed here.
    pub fn update_item(
        &mut self,
        item: ItemRef,
        item_type: &str,
        types: &PlacementTypeRegistry,
    ) -> AdResult<()> {
        if self.item() == Some(item) {
            return Err(AdError::SameItem {
                placement: self.slug(),
                item: item.to_string(),
            });
        }

        let placement_type = types
            .get(&self.type_tag())
            .ok_or_else(|| AdError::UnknownPlacementType(self.type_tag()))?;
        if !placement_type.is_entity_allowed(item.kind, item_type) {
            return Err(AdError::DisallowedItem {
                placement_type: placement_type.name.clone(),
                item: item.to_string(),
                item_type: item_type.to_string(),
            });
        }

        info!(placement = %self.slug(), %item, "placement item updated");
        self.props.set("item", json!(item.to_string()));
        Ok(())
    }

    pub fn display_conditions(&self) -> Vec<Condition> {
        self.props.get_as("display_conditions").unwrap_or_default()
    }

    pub fn set_display_conditions(&mut self, conditions: Vec<Condition>) {
        self.props
            .set("display_conditions", serde_json::to_value(conditions).unwrap_or_default());
    }

    pub fn visitor_conditions(&self) -> Vec<Condition> {
        self.props.get_as("visitor_conditions").unwrap_or_default()
    }

    pub fn set_visitor_conditions(&mut self, conditions: Vec<Condition>) {
        self.props
            .set("visitor_conditions", serde_json::to_value(conditions).unwrap_or_default());
    }

    pub fn mobile_rule(&self) -> Option<MobileRule> {
        self.props.get_as("mobile")
    }

    pub fn options(&self) -> PlacementOptions {
        self.props.get_as("options").unwrap_or_default()
    }

    pub fn set_options(&mut self, options: &PlacementOptions) {
        self.props
            .set("options", serde_json::to_value(options).unwrap_or_default());
    }
}

/// Declares which items a placement type accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementType {
    pub name: String,
    pub title: String,
    pub allowed_items: Vec<ItemKind>,
    /// `None` accepts every ad type.
    pub allowed_ad_types: Option<Vec<String>>,
    /// `None` accepts every group type.
    pub allowed_group_types: Option<Vec<String>>,
    pub supports_injection: bool,
    pub supports_label: bool,
}

impl PlacementType {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            allowed_items: vec![ItemKind::Ad, ItemKind::Group],
            allowed_ad_types: None,
            allowed_group_types: None,
            supports_injection: false,
            supports_label: true,
        }
    }

    pub fn ads_only(mut self) -> Self {
        self.allowed_items = vec![ItemKind::Ad];
        self
    }

    pub fn ad_types(mut self, types: &[&str]) -> Self {
        self.allowed_ad_types = Some(types.iter().map(|t| t.to_string()).collect());
        self
    }

    pub fn injection(mut self) -> Self {
        self.supports_injection = true;
        self
    }

    pub fn without_label(mut self) -> Self {
        self.supports_label = false;
        self
    }

    pub fn is_entity_allowed(&self, kind: ItemKind, item_type: &str) -> bool {
        if !self.allowed_items.contains(&kind) {
            return false;
        }
        let allowed = match kind {
            ItemKind::Ad => &self.allowed_ad_types,
            ItemKind::Group => &self.allowed_group_types,
        };
        allowed
            .as_ref()
            .map_or(true, |types| types.iter().any(|t| t == item_type))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlacementTypeRegistry {
    types: HashMap<String, PlacementType>,
}

impl PlacementTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in placement types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PlacementType::new("default", "Manual Placement"));
        registry.register(
            PlacementType::new("header", "Header Code")
                .ads_only()
                .ad_types(&["plain"])
                .without_label(),
        );
        registry.register(PlacementType::new("footer", "Footer Code").without_label());
        registry.register(PlacementType::new("post_top", "Before Content"));
        registry.register(PlacementType::new("post_bottom", "After Content"));
        registry.register(PlacementType::new("post_content", "Content").injection());
        registry.register(PlacementType::new("sidebar_widget", "Sidebar Widget"));
        registry
    }

    pub fn register(&mut self, placement_type: PlacementType) {
        self.types.insert(placement_type.name.clone(), placement_type);
    }

    pub fn get(&self, name: &str) -> Option<&PlacementType> {
        self.types.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_item_rejects_disallowed_kind() {
        let types = PlacementTypeRegistry::with_defaults();
        let mut placement = Placement::new("header", "head").with_item(ItemRef::ad(1));

        let err = placement
            .update_item(ItemRef::group(2), "default", &types)
            .unwrap_err();
        assert!(matches!(err, AdError::DisallowedItem { .. }));
        assert_eq!(placement.item(), Some(ItemRef::ad(1)));
    }

    #[test]
    fn test_update_item_rejects_disallowed_ad_type() {
        let types = PlacementTypeRegistry::with_defaults();
        let mut placement = Placement::new("header", "head").with_item(ItemRef::ad(1));

        let err = placement
            .update_item(ItemRef::ad(3), "image", &types)
            .unwrap_err();
        assert!(matches!(err, AdError::DisallowedItem { .. }));
        assert!(placement.update_item(ItemRef::ad(3), "plain", &types).is_ok());
        assert_eq!(placement.item(), Some(ItemRef::ad(3)));
    }

    #[test]
    fn test_update_item_rejects_same_item() {
        let types = PlacementTypeRegistry::with_defaults();
        let mut placement = Placement::new("default", "manual").with_item(ItemRef::group(4));
        let err = placement
            .update_item(ItemRef::group(4), "default", &types)
            .unwrap_err();
        assert!(matches!(err, AdError::SameItem { .. }));
    }

    #[test]
    fn test_update_item_unknown_type() {
        let types = PlacementTypeRegistry::with_defaults();
        let mut placement = Placement::new("popup", "layer");
        let err = placement
            .update_item(ItemRef::ad(1), "plain", &types)
            .unwrap_err();
        assert!(matches!(err, AdError::UnknownPlacementType(_)));
        assert!(placement.item().is_none());
    }

    #[test]
    fn test_stored_options() {
        let data = json!({
            "slug": "in-article",
            "type": "post_content",
            "item": "group_2",
            "options": {"clearfix": true, "injection": {"position": "before", "index": 3}},
        })
        .as_object()
        .cloned()
        .unwrap();
        let placement = Placement::from_storage(11, data);
        assert_eq!(placement.item(), Some(ItemRef::group(2)));
        let options = placement.options();
        assert!(options.clearfix);
        assert_eq!(options.injection.position, InjectAt::Before);
        assert_eq!(options.injection.index, 3);
        assert_eq!(options.injection.tag, "p");
        assert_eq!(placement.summary().key(), "placement_in-article");
    }

    #[test]
    fn test_malformed_item_reads_as_unbound() {
        let data = json!({"item": "widget_3"}).as_object().cloned().unwrap();
        assert!(Placement::from_storage(1, data).item().is_none());
    }
}
