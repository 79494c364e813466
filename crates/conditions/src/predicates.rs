//! Operator helpers shared by the built-in condition types.

use adrotate_core::Condition;
use regex::RegexBuilder;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOperator {
    Contain,
    Start,
    End,
    Match,
    Regex,
}

/// Split an operator such as `start_not` into its base and negation.
/// Missing or unknown operators mean `contain`.
pub fn parse_string_operator(operator: Option<&str>) -> (StringOperator, bool) {
    let raw = operator.unwrap_or("contain");
    let (base, negated) = match raw.strip_suffix("_not") {
        Some(base) => (base, true),
        None => (raw, false),
    };
    let op = match base {
        "start" => StringOperator::Start,
        "end" => StringOperator::End,
        "match" => StringOperator::Match,
        "regex" => StringOperator::Regex,
        _ => StringOperator::Contain,
    };
    (op, negated)
}

/// Compare `actual` against the condition's string value. Matching is
/// case-insensitive except for `regex`. An empty expected value passes.
pub fn check_string(actual: &str, condition: &Condition) -> bool {
    let expected = match &condition.value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    if expected.is_empty() {
        return true;
    }
    compare_strings(actual, condition.operator.as_deref(), &expected)
}

pub fn compare_strings(actual: &str, operator: Option<&str>, expected: &str) -> bool {
    let (op, negated) = parse_string_operator(operator);
    let actual_lower = actual.to_lowercase();
    let expected_lower = expected.to_lowercase();

    let matched = match op {
        StringOperator::Contain => actual_lower.contains(&expected_lower),
        StringOperator::Start => actual_lower.starts_with(&expected_lower),
        StringOperator::End => actual_lower.ends_with(&expected_lower),
        StringOperator::Match => actual_lower == expected_lower,
        StringOperator::Regex => {
            match RegexBuilder::new(expected).size_limit(1 << 20).build() {
                Ok(re) => re.is_match(actual),
                Err(e) => {
                    warn!(pattern = expected, error = %e, "invalid regex in condition, ignored");
                    return true;
                }
            }
        }
    };
    matched != negated
}

/// Flatten a condition value into comparable string keys.
pub fn value_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(scalar_key).collect(),
        other => scalar_key(other).into_iter().collect(),
    }
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Apply the `is` / `is_not` operator to a match result.
pub fn apply_operator(condition: &Condition, matched: bool) -> bool {
    if condition.is_positive() {
        matched
    } else {
        !matched
    }
}

/// `is`/`is_not` check of an optional scalar against the condition's list.
pub fn check_in_list(actual: Option<String>, condition: &Condition) -> bool {
    let list = value_list(&condition.value);
    let matched = actual.is_some_and(|actual| list.iter().any(|item| *item == actual));
    apply_operator(condition, matched)
}
