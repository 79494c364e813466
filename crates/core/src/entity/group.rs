use serde_json::{json, Map, Value};

use crate::config::SelectionConfig;
use crate::props::{PropContext, Props};
use crate::types::{AdCount, AdWeights, EntityId, EntityKind, EntitySummary};

/// Rotation strategy of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupType {
    /// Weighted random draw without replacement.
    Default,
    /// Weight descending, ties shuffled.
    Ordered,
    /// Provided by an extension; rotates like `Default`.
    Other(String),
}

impl GroupType {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "" | "default" => GroupType::Default,
            "ordered" => GroupType::Ordered,
            other => GroupType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GroupType::Default => "default",
            GroupType::Ordered => "ordered",
            GroupType::Other(tag) => tag,
        }
    }
}

/// Named collection of ads sharing rotation logic.
#[derive(Debug, Clone)]
pub struct Group {
    props: Props,
}

fn defaults() -> Map<String, Value> {
    let defaults = json!({
        "name": "",
        "type": "default",
        "ad_count": 1,
        "options": {},
        "ad_weights": {},
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Group {
    pub fn new() -> Self {
        Self {
            props: Props::new(EntityKind::Group, defaults()),
        }
    }

    pub fn from_storage(id: EntityId, data: Map<String, Value>) -> Self {
        Self {
            props: Props::hydrate(EntityKind::Group, id, defaults(), data),
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

    pub fn summary(&self) -> EntitySummary {
        EntitySummary {
            kind: EntityKind::Group,
            id: self.id().map(|id| id.to_string()).unwrap_or_default(),
            type_tag: self.group_type().as_str().to_string(),
            title: self.name(),
        }
    }

    pub fn name(&self) -> String {
        self.props.get_str("name")
    }

    pub fn set_name(&mut self, name: &str) {
        self.props.set("name", json!(name.trim()));
    }

    pub fn group_type(&self) -> GroupType {
        GroupType::from_tag(&self.props.get_str("type"))
    }

    pub fn set_group_type(&mut self, group_type: GroupType) {
        self.props.set("type", json!(group_type.as_str()));
    }

    /// Malformed values fall back to a single ad.
    pub fn ad_count(&self) -> AdCount {
        self.props.get_as("ad_count").unwrap_or_default()
    }

    pub fn set_ad_count(&mut self, count: AdCount) {
        self.props
            .set("ad_count", serde_json::to_value(count).unwrap_or_default());
    }

    pub fn options(&self) -> Map<String, Value> {
        match self.props.get("options", PropContext::View) {
            Value::Object(options) => options,
            _ => Map::new(),
        }
    }

    pub fn option(&self, key: &str) -> Value {
        self.options().remove(key).unwrap_or(Value::Null)
    }

    pub fn set_option(&mut self, key: &str, value: Value) {
        let mut options = match self.props.get("options", PropContext::Edit) {
            Value::Object(options) => options,
            _ => Map::new(),
        };
        options.insert(key.to_string(), value);
        self.props.set("options", Value::Object(options));
    }

    pub fn ad_weights(&self) -> AdWeights {
        self.props.get_as("ad_weights").unwrap_or_default()
    }

    fn store_weights(&mut self, weights: &AdWeights) {
        self.props
            .replace("ad_weights", serde_json::to_value(weights).unwrap_or_default());
    }

    /// Add (or re-weight) a member. Missing weights use the configured
    /// default; all weights are clamped to the configured maximum.
    pub fn add_ad(&mut self, ad_id: EntityId, weight: Option<u32>, selection: &SelectionConfig) {
        let weight = weight
            .unwrap_or(selection.default_weight)
            .min(selection.max_weight);
        let mut weights = self.ad_weights();
        weights.insert(ad_id, weight);
        self.store_weights(&weights);
    }

    /// Removing the last ad leaves an empty group behind.
    pub fn remove_ad(&mut self, ad_id: EntityId) -> bool {
        let mut weights = self.ad_weights();
        let removed = weights.remove(ad_id).is_some();
        if removed {
            self.store_weights(&weights);
        }
        removed
    }

    pub fn has_ad(&self, ad_id: EntityId) -> bool {
        self.ad_weights().contains(ad_id)
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_changes() {
        let selection = SelectionConfig::default();
        let mut group = Group::new();
        group.add_ad(4, None, &selection);
        group.add_ad(2, Some(40), &selection);
        group.add_ad(9, Some(0), &selection);

        let weights = group.ad_weights();
        assert_eq!(weights.ids().collect::<Vec<_>>(), vec![4, 2, 9]);
        assert_eq!(weights.get(4), Some(5));
        assert_eq!(weights.get(2), Some(10), "clamped to max weight");
        assert_eq!(weights.get(9), Some(0));

        assert!(group.remove_ad(2));
        assert!(!group.remove_ad(2));
        assert_eq!(group.ad_weights().ids().collect::<Vec<_>>(), vec![4, 9]);

        group.remove_ad(4);
        group.remove_ad(9);
        assert!(group.ad_weights().is_empty());
    }

    #[test]
    fn test_hydrated_group() {
        let data = json!({
            "name": "Sidebar rotation",
            "type": "ordered",
            "ad_count": "all",
            "ad_weights": {"12": 3, "7": 8},
        })
        .as_object()
        .cloned()
        .unwrap();
        let group = Group::from_storage(5, data);
        assert_eq!(group.group_type(), GroupType::Ordered);
        assert_eq!(group.ad_count(), AdCount::All);
        assert_eq!(group.ad_weights().ids().collect::<Vec<_>>(), vec![12, 7]);
        assert_eq!(group.summary().key(), "group_5");
    }

    #[test]
    fn test_removal_survives_apply_changes() {
        let data = json!({"ad_weights": {"1": 5, "2": 5}}).as_object().cloned().unwrap();
        let mut group = Group::from_storage(3, data);
        assert!(group.remove_ad(1));
        group.props_mut().apply_changes();
        assert_eq!(group.props().data()["ad_weights"], json!({"2": 5}));
    }

    #[test]
    fn test_extension_type_is_preserved() {
        let mut group = Group::new();
        group.set_group_type(GroupType::from_tag("slider"));
        assert_eq!(group.group_type(), GroupType::Other("slider".to_string()));
        assert_eq!(group.summary().type_tag, "slider");
    }
}
