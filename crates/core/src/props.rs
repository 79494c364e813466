//! Attribute container shared by ads, groups and placements.
//!
//! Reads resolve transient overrides first, then pending changes, then
//! committed data, then the declared defaults.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::hooks::HookRegistry;
use crate::types::{EntityId, EntityKind};

/// Read context. Only `View` reads pass through prop filter hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropContext {
    View,
    Edit,
}

#[derive(Clone)]
pub struct Props {
    kind: EntityKind,
    id: Option<EntityId>,
    defaults: Map<String, Value>,
    data: Map<String, Value>,
    changes: Map<String, Value>,
    overrides: Map<String, Value>,
    /// Pending changes that replace the committed value instead of merging.
    replaced: HashSet<String>,
    object_read: bool,
    hooks: Option<Arc<HookRegistry>>,
}

impl Props {
    /// Fresh, never persisted container.
    pub fn new(kind: EntityKind, defaults: Map<String, Value>) -> Self {
        Self {
            kind,
            id: None,
            defaults,
            data: Map::new(),
            changes: Map::new(),
            overrides: Map::new(),
            replaced: HashSet::new(),
            object_read: false,
            hooks: None,
        }
    }

    /// Container hydrated from storage; later writes are tracked as changes.
    pub fn hydrate(
        kind: EntityKind,
        id: EntityId,
        defaults: Map<String, Value>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            id: Some(id),
            data,
            object_read: true,
            ..Self::new(kind, defaults)
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn id(&self) -> Option<EntityId> {
        self.id
    }

    pub fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    pub fn attach_hooks(&mut self, hooks: Arc<HookRegistry>) {
        self.hooks = Some(hooks);
    }

    pub fn mark_read(&mut self) {
        self.object_read = true;
    }

    pub fn is_read(&self) -> bool {
        self.object_read
    }

    pub fn get(&self, prop: &str, context: PropContext) -> Value {
        let value = self
            .overrides
            .get(prop)
            .or_else(|| self.changes.get(prop))
            .or_else(|| self.data.get(prop))
            .or_else(|| self.defaults.get(prop))
            .cloned()
            .unwrap_or(Value::Null);

        match (context, &self.hooks) {
            (PropContext::View, Some(hooks)) => hooks.filter_prop(self.kind, self.id, prop, value),
            _ => value,
        }
    }

    pub fn set(&mut self, prop: &str, value: Value) {
        if !self.object_read {
            self.data.insert(prop.to_string(), value);
            return;
        }

        let committed = self.data.get(prop).or_else(|| self.defaults.get(prop));
        if committed == Some(&value) {
            self.changes.remove(prop);
        } else {
            self.changes.insert(prop.to_string(), value);
        }
    }

    /// Like [`Props::set`], but `apply_changes` swaps the whole value in
    /// instead of merging it. For maps that lose keys.
    pub fn replace(&mut self, prop: &str, value: Value) {
        self.set(prop, value);
        if self.changes.contains_key(prop) {
            self.replaced.insert(prop.to_string());
        } else {
            self.replaced.remove(prop);
        }
    }

    /// Remove a prop everywhere; reads fall back to the default.
    pub fn unset(&mut self, prop: &str) {
        self.data.remove(prop);
        self.changes.remove(prop);
        self.overrides.remove(prop);
        self.replaced.remove(prop);
    }

    /// Merge pending changes into committed data. Called by storage after a
    /// successful write.
    pub fn apply_changes(&mut self) {
        let replaced = std::mem::take(&mut self.replaced);
        for (prop, change) in std::mem::take(&mut self.changes) {
            match self.data.get_mut(&prop) {
                Some(current) if replaced.contains(&prop) => *current = change,
                Some(current) => merge_values(current, change),
                None => {
                    self.data.insert(prop, change);
                }
            }
        }
    }

    pub fn changes(&self) -> &Map<String, Value> {
        &self.changes
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Committed data, without pending changes or overrides.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Per-render value that shadows everything else and is never persisted.
    pub fn set_override(&mut self, prop: &str, value: Value) {
        self.overrides.insert(prop.to_string(), value);
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    pub fn get_str(&self, prop: &str) -> String {
        match self.get(prop, PropContext::View) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn get_u32(&self, prop: &str) -> u32 {
        coerce_u64(&self.get(prop, PropContext::View))
            .map(|n| n.min(u64::from(u32::MAX)) as u32)
            .unwrap_or(0)
    }

    pub fn get_u64(&self, prop: &str) -> u64 {
        coerce_u64(&self.get(prop, PropContext::View)).unwrap_or(0)
    }

    pub fn get_bool(&self, prop: &str) -> bool {
        match self.get(prop, PropContext::View) {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            Value::String(s) => matches!(s.as_str(), "1" | "true" | "yes" | "on"),
            _ => false,
        }
    }

    /// Decode a structured prop. Malformed data reads as `None`.
    pub fn get_as<T: DeserializeOwned>(&self, prop: &str) -> Option<T> {
        let value = self.get(prop, PropContext::View);
        if value.is_null() {
            return None;
        }
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                debug!(kind = self.kind.as_str(), id = ?self.id, prop, error = %e, "malformed prop");
                None
            }
        }
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Props")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("data", &self.data)
            .field("changes", &self.changes)
            .field("overrides", &self.overrides)
            .field("object_read", &self.object_read)
            .finish()
    }
}

/// Numeric coercion for loosely typed stored values ("300", 300.0, 300).
pub fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| *f >= 0.0).map(|f| f as u64),
        Value::Bool(b) => Some(u64::from(*b)),
        _ => None,
    }
}

/// Signed variant of [`coerce_u64`]; fractions truncate toward zero.
pub fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

/// Deep merge: objects merge key by key, everything else is replaced.
pub fn merge_values(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> Map<String, Value> {
        json!({"position": "none", "width": 0, "output": {"class": "", "margin": {"top": 0}}})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn stored() -> Props {
        let data = json!({"width": 300, "output": {"class": "a", "margin": {"top": 5}}})
            .as_object()
            .cloned()
            .unwrap();
        Props::hydrate(EntityKind::Ad, 9, defaults(), data)
    }

    #[test]
    fn test_fresh_writes_go_to_data() {
        let mut props = Props::new(EntityKind::Ad, defaults());
        props.set("width", json!(120));
        assert!(!props.has_changes());
        assert_eq!(props.data()["width"], json!(120));
        assert_eq!(props.get("position", PropContext::Edit), json!("none"));
    }

    #[test]
    fn test_read_priority() {
        let mut props = stored();
        assert_eq!(props.get_u32("width"), 300);

        props.set("width", json!(400));
        assert_eq!(props.get_u32("width"), 400);
        assert_eq!(props.data()["width"], json!(300));

        props.set_override("width", json!(500));
        assert_eq!(props.get_u32("width"), 500);
        props.clear_overrides();
        assert_eq!(props.get_u32("width"), 400);
    }

    #[test]
    fn test_unchanged_write_is_not_dirty() {
        let mut props = stored();
        props.set("width", json!(300));
        assert!(!props.has_changes());

        props.set("position", json!("none"));
        assert!(!props.has_changes(), "default value is not a change");

        props.set("width", json!(301));
        assert!(props.has_changes());
        props.set("width", json!(300));
        assert!(!props.has_changes(), "reverting drops the pending change");
    }

    #[test]
    fn test_apply_changes_deep_merges() {
        let mut props = stored();
        props.set("output", json!({"margin": {"left": 3}}));
        props.apply_changes();

        assert!(!props.has_changes());
        assert_eq!(
            props.data()["output"],
            json!({"class": "a", "margin": {"top": 5, "left": 3}})
        );
    }

    #[test]
    fn test_replace_drops_removed_keys() {
        let mut props = stored();
        props.replace("output", json!({"class": "b"}));
        props.apply_changes();
        assert_eq!(props.data()["output"], json!({"class": "b"}));

        props.set("output", json!({"margin": {"top": 1}}));
        props.apply_changes();
        assert_eq!(props.data()["output"], json!({"class": "b", "margin": {"top": 1}}));
    }

    #[test]
    fn test_unset_falls_back_to_default() {
        let mut props = stored();
        props.set("width", json!(10));
        props.unset("width");
        assert_eq!(props.get_u32("width"), 0);
    }

    #[test]
    fn test_view_reads_pass_hooks_edit_reads_do_not() {
        let mut hooks = HookRegistry::new();
        hooks.add_prop_filter(EntityKind::Ad, "position", |_, _| json!("left"));
        let mut props = stored();
        props.attach_hooks(Arc::new(hooks));

        assert_eq!(props.get("position", PropContext::View), json!("left"));
        assert_eq!(props.get("position", PropContext::Edit), json!("none"));
    }

    #[test]
    fn test_coercion() {
        assert_eq!(coerce_u64(&json!("250")), Some(250));
        assert_eq!(coerce_u64(&json!(12.7)), Some(12));
        assert_eq!(coerce_u64(&json!(-1)), None);
        assert_eq!(coerce_u64(&json!("wide")), None);
    }

    #[test]
    fn test_get_as_malformed_is_none() {
        let mut props = stored();
        props.set("output", json!("not an object"));
        #[derive(serde::Deserialize)]
        #[allow(dead_code)]
        struct Output {
            class: String,
        }
        assert!(props.get_as::<Output>("output").is_none());
    }
}
