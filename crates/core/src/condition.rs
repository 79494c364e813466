//! Condition data attached to ads and placements. Evaluation lives in
//! `adrotate-conditions`.

use serde::{Deserialize, Serialize};

/// How a condition joins the one before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default)]
    pub connector: Connector,
}

impl Condition {
    pub fn new(kind: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            value,
            operator: None,
            connector: Connector::And,
        }
    }

    pub fn operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    pub fn or(mut self) -> Self {
        self.connector = Connector::Or;
        self
    }

    pub fn is_or(&self) -> bool {
        self.connector == Connector::Or
    }

    /// `true` unless the operator is a negation (`is_not`, `contain_not`, ...).
    pub fn is_positive(&self) -> bool {
        !self
            .operator
            .as_deref()
            .is_some_and(|op| op == "is_not" || op.ends_with("_not"))
    }
}

/// Hard mobile veto evaluated after the visitor condition list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobileRule {
    Only,
    No,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_condition_deserialize_defaults() {
        let condition: Condition =
            serde_json::from_value(json!({"type": "loggedin", "operator": "is"})).unwrap();
        assert_eq!(condition.kind, "loggedin");
        assert_eq!(condition.connector, Connector::And);
        assert!(condition.value.is_null());
        assert!(condition.is_positive());
    }

    #[test]
    fn test_negated_operators() {
        let base = Condition::new("referrer_url", json!("example.com"));
        assert!(!base.clone().operator("is_not").is_positive());
        assert!(!base.clone().operator("contain_not").is_positive());
        assert!(base.operator("start").is_positive());
    }
}
