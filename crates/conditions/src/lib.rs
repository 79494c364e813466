//! Condition evaluation. Decides whether content is eligible for the
//! current page and visitor.

pub mod display;
pub mod engine;
pub mod predicates;
pub mod visitor;

pub use engine::{evaluate_chain, ConditionEvaluator, ConditionFn, ConditionSet};
