//! Per-request record of what was actually rendered.
//!
//! Top-level entities accumulate a `count`. Entities rendered inside another
//! one are catalogued once under that parent's `childs` and never counted.

use adrotate_core::{EntityKind, EntitySummary};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsEntry {
    pub kind: Option<EntityKind>,
    pub id: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub title: String,
    pub count: u32,
    pub childs: IndexMap<String, EntitySummary>,
}

impl StatsEntry {
    fn describe(&mut self, subject: &EntitySummary) {
        self.kind = Some(subject.kind);
        self.id.clone_from(&subject.id);
        self.type_tag.clone_from(&subject.type_tag);
        self.title.clone_from(&subject.title);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct StatsCollector {
    entries: IndexMap<String, StatsEntry>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rendered entity. With a parent key the entity is catalogued
    /// under the parent; the parent entry is created on demand because
    /// children finish rendering before their parent does.
    pub fn record(&mut self, subject: &EntitySummary, parent: Option<&str>) {
        match parent {
            Some(parent) if parent != subject.key() => {
                self.entries
                    .entry(parent.to_string())
                    .or_default()
                    .childs
                    .entry(subject.key())
                    .or_insert_with(|| subject.clone());
            }
            _ => {
                let entry = self.entries.entry(subject.key()).or_default();
                entry.describe(subject);
                entry.count += 1;
            }
        }
    }

    /// Undo the on-demand parent entry when the subject ends up rendering
    /// nothing, so its children are not left under an uncounted parent.
    pub fn discard(&mut self, subject: &EntitySummary, parent: Option<&str>) {
        if parent.is_some_and(|parent| parent != subject.key()) {
            return;
        }
        let key = subject.key();
        if self.entries.get(&key).is_some_and(|e| e.count == 0) {
            self.entries.shift_remove(&key);
        }
    }

    pub fn get(&self, key: &str) -> Option<&StatsEntry> {
        self.entries.get(key)
    }

    pub fn count(&self, key: &str) -> u32 {
        self.entries.get(key).map_or(0, |e| e.count)
    }

    pub fn has_child(&self, parent: &str, child: &str) -> bool {
        self.entries
            .get(parent)
            .is_some_and(|e| e.childs.contains_key(child))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &StatsEntry)> {
        self.entries.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(kind: EntityKind, id: &str) -> EntitySummary {
        EntitySummary {
            kind,
            id: id.to_string(),
            type_tag: "default".to_string(),
            title: format!("{} {id}", kind.as_str()),
        }
    }

    #[test]
    fn test_top_level_counts() {
        let mut stats = StatsCollector::new();
        let ad = summary(EntityKind::Ad, "4");
        stats.record(&ad, None);
        stats.record(&ad, None);
        assert_eq!(stats.count("ad_4"), 2);
        assert_eq!(stats.get("ad_4").map(|e| e.title.as_str()), Some("ad 4"));
    }

    #[test]
    fn test_children_are_catalogued_not_counted() {
        let mut stats = StatsCollector::new();
        let ad = summary(EntityKind::Ad, "4");
        let placement = summary(EntityKind::Placement, "sidebar");

        stats.record(&ad, Some("placement_sidebar"));
        stats.record(&placement, None);
        stats.record(&ad, Some("placement_sidebar"));
        stats.record(&placement, None);

        assert_eq!(stats.count("placement_sidebar"), 2);
        assert_eq!(stats.count("ad_4"), 0);
        assert!(stats.get("ad_4").is_none());
        assert!(stats.has_child("placement_sidebar", "ad_4"));
        assert_eq!(stats.get("placement_sidebar").map(|e| e.childs.len()), Some(1));
    }

    #[test]
    fn test_json_shape() {
        let mut stats = StatsCollector::new();
        stats.record(&summary(EntityKind::Ad, "1"), Some("group_2"));
        stats.record(&summary(EntityKind::Group, "2"), None);

        let json = stats.to_json();
        assert_eq!(json["group_2"]["count"], 1);
        assert_eq!(json["group_2"]["kind"], "group");
        assert_eq!(json["group_2"]["childs"]["ad_1"]["id"], "1");
    }

    #[test]
    fn test_discard_blank_parent() {
        let mut stats = StatsCollector::new();
        let ad = summary(EntityKind::Ad, "1");
        let group = summary(EntityKind::Group, "2");

        stats.record(&ad, Some("group_2"));
        stats.discard(&group, None);
        assert!(stats.get("group_2").is_none());
        assert!(stats.is_empty());

        stats.record(&ad, Some("group_2"));
        stats.record(&group, None);
        stats.discard(&group, None);
        assert_eq!(stats.count("group_2"), 1);
        assert!(stats.has_child("group_2", "ad_1"));
    }

    #[test]
    fn test_discard_ignores_nested_subject() {
        let mut stats = StatsCollector::new();
        let ad = summary(EntityKind::Ad, "1");
        stats.record(&ad, Some("placement_top"));
        stats.discard(&summary(EntityKind::Group, "2"), Some("placement_top"));
        assert!(stats.has_child("placement_top", "ad_1"));
    }

    #[test]
    fn test_reset() {
        let mut stats = StatsCollector::new();
        stats.record(&summary(EntityKind::Ad, "1"), None);
        stats.reset();
        assert!(stats.is_empty());
    }
}
