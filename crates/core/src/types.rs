use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::AdError;

/// Storage identifier of an ad, group or placement.
pub type EntityId = u64;

/// Kinds of entity a placement may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Ad,
    Group,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Ad => "ad",
            ItemKind::Group => "group",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference from a placement to the ad or group it displays.
///
/// Persisted as `"ad_<id>"` / `"group_<id>"`; parsed once at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemRef {
    pub kind: ItemKind,
    pub id: EntityId,
}

impl ItemRef {
    pub fn ad(id: EntityId) -> Self {
        Self {
            kind: ItemKind::Ad,
            id,
        }
    }

    pub fn group(id: EntityId) -> Self {
        Self {
            kind: ItemKind::Group,
            id,
        }
    }
}

impl FromStr for ItemRef {
    type Err = AdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, id) = s
            .split_once('_')
            .ok_or_else(|| AdError::InvalidItemRef(s.to_string()))?;
        let kind = match prefix {
            "ad" => ItemKind::Ad,
            "group" => ItemKind::Group,
            _ => return Err(AdError::InvalidItemRef(s.to_string())),
        };
        let id = id
            .parse::<EntityId>()
            .map_err(|_| AdError::InvalidItemRef(s.to_string()))?;
        Ok(Self { kind, id })
    }
}

impl TryFrom<String> for ItemRef {
    type Error = AdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ItemRef> for String {
    fn from(item: ItemRef) -> Self {
        item.to_string()
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.id)
    }
}

/// Every renderable entity kind, used for hook subjects and stats keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Ad,
    Group,
    Placement,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Ad => "ad",
            EntityKind::Group => "group",
            EntityKind::Placement => "placement",
        }
    }
}

impl From<ItemKind> for EntityKind {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Ad => EntityKind::Ad,
            ItemKind::Group => EntityKind::Group,
        }
    }
}

/// What hooks and stats see of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntitySummary {
    pub kind: EntityKind,
    pub id: String,
    pub type_tag: String,
    pub title: String,
}

impl EntitySummary {
    /// Stats key, e.g. `ad_12` or `placement_header`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.kind.as_str(), self.id)
    }
}

/// Float/alignment hint for the wrapper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    None,
    Left,
    Right,
    Center,
    Clearfix,
}

impl Position {
    /// Unknown and empty input fall back to `None`.
    pub fn from_str_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Position::Left,
            "right" => Position::Right,
            "center" => Position::Center,
            "clearfix" => Position::Clearfix,
            _ => Position::None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::None => "none",
            Position::Left => "left",
            Position::Right => "right",
            Position::Center => "center",
            Position::Clearfix => "clearfix",
        }
    }
}

/// Per-side wrapper margin in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Margin {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Margin {
    pub fn is_empty(&self) -> bool {
        self.top == 0 && self.right == 0 && self.bottom == 0 && self.left == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    #[default]
    Publish,
    Draft,
    Pending,
    Private,
    Trash,
}

impl EntityStatus {
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "publish" => EntityStatus::Publish,
            "pending" => EntityStatus::Pending,
            "private" => EntityStatus::Private,
            "trash" => EntityStatus::Trash,
            _ => EntityStatus::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityStatus::Publish => "publish",
            EntityStatus::Draft => "draft",
            EntityStatus::Pending => "pending",
            EntityStatus::Private => "private",
            EntityStatus::Trash => "trash",
        }
    }
}

/// Number of group members to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAdCount", into = "RawAdCount")]
pub enum AdCount {
    Limit(usize),
    All,
}

impl Default for AdCount {
    fn default() -> Self {
        AdCount::Limit(1)
    }
}

impl AdCount {
    pub fn allows(&self, shown: usize) -> bool {
        match self {
            AdCount::All => true,
            AdCount::Limit(max) => shown < *max,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawAdCount {
    Number(usize),
    Text(String),
}

impl TryFrom<RawAdCount> for AdCount {
    type Error = String;

    fn try_from(raw: RawAdCount) -> Result<Self, Self::Error> {
        match raw {
            RawAdCount::Number(n) => Ok(AdCount::Limit(n)),
            RawAdCount::Text(text) if text == "all" => Ok(AdCount::All),
            RawAdCount::Text(text) => text
                .trim()
                .parse()
                .map(AdCount::Limit)
                .map_err(|_| format!("invalid ad count: {text:?}")),
        }
    }
}

impl From<AdCount> for RawAdCount {
    fn from(count: AdCount) -> Self {
        match count {
            AdCount::Limit(n) => RawAdCount::Number(n),
            AdCount::All => RawAdCount::Text("all".to_string()),
        }
    }
}

/// Ordered ad id → weight map. Insertion order is the draw order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdWeights(IndexMap<EntityId, u32>);

impl AdWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: EntityId, weight: u32) {
        self.0.insert(id, weight);
    }

    /// Removes while keeping the order of the remaining entries.
    pub fn remove(&mut self, id: EntityId) -> Option<u32> {
        self.0.shift_remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<u32> {
        self.0.get(&id).copied()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.0.values().map(|w| u64::from(*w)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, u32)> + '_ {
        self.0.iter().map(|(id, w)| (*id, *w))
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.0.keys().copied()
    }
}

impl FromIterator<(EntityId, u32)> for AdWeights {
    fn from_iter<T: IntoIterator<Item = (EntityId, u32)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_ref_parse() {
        let item: ItemRef = "ad_12".parse().unwrap();
        assert_eq!(item, ItemRef::ad(12));
        assert_eq!(item.to_string(), "ad_12");

        let group: ItemRef = "group_3".parse().unwrap();
        assert_eq!(group.kind, ItemKind::Group);
        assert_eq!(group.id, 3);
    }

    #[test]
    fn test_item_ref_rejects_bad_shapes() {
        for raw in ["", "ad", "ad_", "ad_x", "slot_4", "12"] {
            assert!(
                matches!(raw.parse::<ItemRef>(), Err(AdError::InvalidItemRef(_))),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_item_ref_serde() {
        let json = serde_json::to_string(&ItemRef::group(7)).unwrap();
        assert_eq!(json, "\"group_7\"");
        let back: ItemRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ItemRef::group(7));
        assert!(serde_json::from_str::<ItemRef>("\"widget_1\"").is_err());
    }

    #[test]
    fn test_position_lossy() {
        assert_eq!(Position::from_str_lossy(""), Position::None);
        assert_eq!(Position::from_str_lossy("Center"), Position::Center);
        assert_eq!(Position::from_str_lossy("diagonal"), Position::None);
    }

    #[test]
    fn test_ad_count_serde() {
        let all: AdCount = serde_json::from_str("\"all\"").unwrap();
        assert_eq!(all, AdCount::All);
        let three: AdCount = serde_json::from_str("3").unwrap();
        assert_eq!(three, AdCount::Limit(3));
        let coerced: AdCount = serde_json::from_str("\"2\"").unwrap();
        assert_eq!(coerced, AdCount::Limit(2));
        assert!(serde_json::from_str::<AdCount>("\"some\"").is_err());
        assert!(AdCount::All.allows(1000));
        assert!(!AdCount::Limit(2).allows(2));
    }

    #[test]
    fn test_ad_weights_keep_order_on_remove() {
        let mut weights: AdWeights = [(3, 1), (1, 2), (2, 3)].into_iter().collect();
        weights.remove(1);
        assert_eq!(weights.ids().collect::<Vec<_>>(), vec![3, 2]);
        assert_eq!(weights.total(), 4);

        let json = serde_json::to_string(&weights).unwrap();
        assert_eq!(json, r#"{"3":1,"2":3}"#);
    }
}
