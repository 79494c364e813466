//! Condition chain evaluation with short-circuit OR connectors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use adrotate_core::{Condition, MobileRule, RequestContext};
use tracing::debug;

use crate::{display, visitor};

/// Predicate for one condition type.
pub type ConditionFn = Arc<dyn Fn(&Condition, &RequestContext) -> bool + Send + Sync>;

/// Walk a condition list in order.
///
/// * An `or` condition is skipped while the previous result is `true`.
/// * A `false` result ends the walk with `false`, unless the next condition
///   is `or`-connected and may still rescue it.
/// * A list that runs to the end is `true`; an empty list is `true`.
pub fn evaluate_chain<F>(conditions: &[Condition], mut check: F) -> bool
where
    F: FnMut(&Condition) -> bool,
{
    let mut last_result = false;
    let mut iter = conditions.iter().peekable();

    while let Some(condition) = iter.next() {
        if last_result && condition.is_or() {
            continue;
        }

        let result = check(condition);
        last_result = result;

        if !result {
            match iter.peek() {
                Some(next) if next.is_or() => {}
                _ => return false,
            }
        }
    }
    true
}

/// Strategy map from condition type to predicate.
#[derive(Clone, Default)]
pub struct ConditionSet {
    strategies: HashMap<String, ConditionFn>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, kind: &str, predicate: F)
    where
        F: Fn(&Condition, &RequestContext) -> bool + Send + Sync + 'static,
    {
        self.strategies.insert(kind.to_string(), Arc::new(predicate));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.strategies.contains_key(kind)
    }

    /// Unknown condition types pass; they usually belong to a feature module
    /// that is not loaded.
    pub fn check(&self, condition: &Condition, ctx: &RequestContext) -> bool {
        match self.strategies.get(&condition.kind) {
            Some(predicate) => predicate(condition, ctx),
            None => {
                debug!(condition_type = %condition.kind, "unknown condition type, treated as passing");
                true
            }
        }
    }

    pub fn evaluate(&self, conditions: &[Condition], ctx: &RequestContext) -> bool {
        evaluate_chain(conditions, |condition| self.check(condition, ctx))
    }
}

impl fmt::Debug for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.strategies.keys().collect();
        kinds.sort();
        f.debug_struct("ConditionSet").field("types", &kinds).finish()
    }
}

/// Display (page) and visitor condition families.
#[derive(Debug, Clone, Default)]
pub struct ConditionEvaluator {
    display: ConditionSet,
    visitor: ConditionSet,
}

impl ConditionEvaluator {
    /// Evaluator without any condition types; every condition passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator with the built-in display and visitor condition types.
    pub fn with_defaults() -> Self {
        let mut evaluator = Self::new();
        display::register_defaults(&mut evaluator.display);
        visitor::register_defaults(&mut evaluator.visitor);
        evaluator
    }

    pub fn register_display<F>(&mut self, kind: &str, predicate: F)
    where
        F: Fn(&Condition, &RequestContext) -> bool + Send + Sync + 'static,
    {
        self.display.register(kind, predicate);
    }

    pub fn register_visitor<F>(&mut self, kind: &str, predicate: F)
    where
        F: Fn(&Condition, &RequestContext) -> bool + Send + Sync + 'static,
    {
        self.visitor.register(kind, predicate);
    }

    pub fn check_display_conditions(&self, conditions: &[Condition], ctx: &RequestContext) -> bool {
        self.display.evaluate(conditions, ctx)
    }

    /// The mobile rule is a hard veto applied after the list.
    pub fn check_visitor_conditions(
        &self,
        conditions: &[Condition],
        mobile: Option<MobileRule>,
        ctx: &RequestContext,
    ) -> bool {
        if !self.visitor.evaluate(conditions, ctx) {
            return false;
        }
        match mobile {
            Some(MobileRule::Only) => ctx.visitor.is_mobile,
            Some(MobileRule::No) => !ctx.visitor.is_mobile,
            None => true,
        }
    }
}
