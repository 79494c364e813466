//! Extension points. Each hook is an ordered list of middleware invoked
//! synchronously in registration order.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::args::RenderArgs;
use crate::context::RequestContext;
use crate::types::{EntityKind, EntitySummary};

/// Result of an output-override hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Override {
    /// Keep rendering. Distinct from `Replace(String::new())`, which is a
    /// legitimate empty override.
    NoOverride,
    Replace(String),
}

pub type PropFilterFn = Box<dyn Fn(Value, Option<u64>) -> Value + Send + Sync>;
pub type CanDisplayFn = Box<dyn Fn(bool, &EntitySummary, &RequestContext) -> bool + Send + Sync>;
pub type OverrideFn = Box<dyn Fn(&EntitySummary, &RenderArgs) -> Override + Send + Sync>;
pub type OutputFilterFn = Box<dyn Fn(String, &EntitySummary, &RenderArgs) -> String + Send + Sync>;

#[derive(Default)]
pub struct HookRegistry {
    prop_filters: HashMap<String, Vec<PropFilterFn>>,
    can_display: Vec<CanDisplayFn>,
    override_output: Vec<OverrideFn>,
    output_filters: Vec<OutputFilterFn>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform `prop` of every `kind` entity on view-context reads.
    pub fn add_prop_filter<F>(&mut self, kind: EntityKind, prop: &str, filter: F)
    where
        F: Fn(Value, Option<u64>) -> Value + Send + Sync + 'static,
    {
        self.prop_filters
            .entry(prop_hook_name(kind, prop))
            .or_default()
            .push(Box::new(filter));
    }

    pub fn filter_prop(&self, kind: EntityKind, id: Option<u64>, prop: &str, value: Value) -> Value {
        match self.prop_filters.get(&prop_hook_name(kind, prop)) {
            Some(filters) => filters.iter().fold(value, |acc, filter| filter(acc, id)),
            None => value,
        }
    }

    /// Final say on eligibility after the built-in checks ran.
    pub fn add_can_display<F>(&mut self, hook: F)
    where
        F: Fn(bool, &EntitySummary, &RequestContext) -> bool + Send + Sync + 'static,
    {
        self.can_display.push(Box::new(hook));
    }

    pub fn can_display(&self, eligible: bool, subject: &EntitySummary, ctx: &RequestContext) -> bool {
        self.can_display
            .iter()
            .fold(eligible, |acc, hook| hook(acc, subject, ctx))
    }

    /// Pre-empt rendering entirely, e.g. to serve cached output.
    pub fn add_override<F>(&mut self, hook: F)
    where
        F: Fn(&EntitySummary, &RenderArgs) -> Override + Send + Sync + 'static,
    {
        self.override_output.push(Box::new(hook));
    }

    /// The first hook returning `Replace` wins; later hooks are not called.
    pub fn override_output(&self, subject: &EntitySummary, args: &RenderArgs) -> Override {
        for hook in &self.override_output {
            if let Override::Replace(output) = hook(subject, args) {
                return Override::Replace(output);
            }
        }
        Override::NoOverride
    }

    pub fn add_output_filter<F>(&mut self, filter: F)
    where
        F: Fn(String, &EntitySummary, &RenderArgs) -> String + Send + Sync + 'static,
    {
        self.output_filters.push(Box::new(filter));
    }

    pub fn filter_output(&self, output: String, subject: &EntitySummary, args: &RenderArgs) -> String {
        self.output_filters
            .iter()
            .fold(output, |acc, filter| filter(acc, subject, args))
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("prop_filters", &self.prop_filters.keys().collect::<Vec<_>>())
            .field("can_display", &self.can_display.len())
            .field("override_output", &self.override_output.len())
            .field("output_filters", &self.output_filters.len())
            .finish()
    }
}

fn prop_hook_name(kind: EntityKind, prop: &str) -> String {
    format!("{}.{}", kind.as_str(), prop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn subject() -> EntitySummary {
        EntitySummary {
            kind: EntityKind::Ad,
            id: "1".to_string(),
            type_tag: "plain".to_string(),
            title: "Banner".to_string(),
        }
    }

    #[test]
    fn test_prop_filters_run_in_order() {
        let mut hooks = HookRegistry::new();
        hooks.add_prop_filter(EntityKind::Ad, "content", |v, _| {
            json!(format!("{}-a", v.as_str().unwrap_or_default()))
        });
        hooks.add_prop_filter(EntityKind::Ad, "content", |v, _| {
            json!(format!("{}-b", v.as_str().unwrap_or_default()))
        });

        let out = hooks.filter_prop(EntityKind::Ad, Some(1), "content", json!("x"));
        assert_eq!(out, json!("x-a-b"));
        // other kinds are untouched
        let group = hooks.filter_prop(EntityKind::Group, Some(1), "content", json!("x"));
        assert_eq!(group, json!("x"));
    }

    #[test]
    fn test_first_override_wins() {
        let mut hooks = HookRegistry::new();
        hooks.add_override(|_, _| Override::NoOverride);
        hooks.add_override(|_, _| Override::Replace(String::new()));
        hooks.add_override(|_, _| Override::Replace("late".to_string()));

        let result = hooks.override_output(&subject(), &RenderArgs::new());
        assert_eq!(result, Override::Replace(String::new()));
    }

    #[test]
    fn test_can_display_folds() {
        let mut hooks = HookRegistry::new();
        let ctx = RequestContext::default();
        assert!(hooks.can_display(true, &subject(), &ctx));

        hooks.add_can_display(|eligible, s, _| eligible && s.type_tag != "plain");
        assert!(!hooks.can_display(true, &subject(), &ctx));
    }
}
