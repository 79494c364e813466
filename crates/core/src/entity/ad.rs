use chrono::{DateTime, Datelike, FixedOffset, Utc};
use serde_json::{json, Map, Value};

use crate::condition::{Condition, MobileRule};
use crate::props::{coerce_i64, PropContext, Props};
use crate::types::{EntityId, EntityKind, EntityStatus, EntitySummary, Margin, Position};

/// A single renderable unit.
#[derive(Debug, Clone)]
pub struct Ad {
    props: Props,
}

fn defaults() -> Map<String, Value> {
    let defaults = json!({
        "title": "",
        "type": "plain",
        "status": "publish",
        "content": "",
        "url": "",
        "width": 0,
        "height": 0,
        "position": "none",
        "margin": {"top": 0, "right": 0, "bottom": 0, "left": 0},
        "wrapper_id": "",
        "wrapper_class": "",
        "add_wrapper_sizes": false,
        "expiry_date": 0,
        "weekdays": [],
        "display_conditions": [],
        "visitor_conditions": [],
        "mobile": null,
        "debugmode": false,
        "allow_php": false,
        "allow_shortcodes": false,
        "options": {},
    });
    match defaults {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl Ad {
    pub fn new() -> Self {
        Self {
            props: Props::new(EntityKind::Ad, defaults()),
        }
    }

    pub fn from_storage(id: EntityId, data: Map<String, Value>) -> Self {
        Self {
            props: Props::hydrate(EntityKind::Ad, id, defaults(), data),
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
            kind: EntityKind::Ad,
            id: self.id().map(|id| id.to_string()).unwrap_or_default(),
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

    /// Empty input falls back to `plain`.
    pub fn set_type(&mut self, type_tag: &str) {
        let type_tag = match type_tag.trim() {
            "" => "plain",
            other => other,
        };
        self.props.set("type", json!(type_tag));
    }

    pub fn status(&self) -> EntityStatus {
        EntityStatus::from_str_lossy(&self.props.get_str("status"))
    }

    pub fn set_status(&mut self, status: EntityStatus) {
        self.props.set("status", json!(status.as_str()));
    }

    pub fn content(&self) -> String {
        self.props.get_str("content")
    }

    pub fn set_content(&mut self, content: &str) {
        self.props.set("content", json!(content));
    }

    /// Click-through URL.
    pub fn url(&self) -> String {
        self.props.get_str("url")
    }

    pub fn set_url(&mut self, url: &str) {
        self.props.set("url", json!(url.trim()));
    }

    pub fn width(&self) -> u32 {
        self.props.get_u32("width")
    }

    pub fn set_width(&mut self, width: u32) {
        self.props.set("width", json!(width));
    }

    pub fn height(&self) -> u32 {
        self.props.get_u32("height")
    }

    pub fn set_height(&mut self, height: u32) {
        self.props.set("height", json!(height));
    }

    pub fn position(&self) -> Position {
        Position::from_str_lossy(&self.props.get_str("position"))
    }

    pub fn set_position(&mut self, position: Position) {
        self.props.set("position", json!(position.as_str()));
    }

    /// Normalizing setter for raw input; empty or unknown becomes `none`.
    pub fn set_position_str(&mut self, position: &str) {
        self.set_position(Position::from_str_lossy(position));
    }

    /// Each side is coerced on its own; missing or unparsable sides are 0.
    pub fn margin(&self) -> Margin {
        let margin = self.props.get("margin", PropContext::View);
        let side = |name: &str| {
            margin
                .get(name)
                .and_then(coerce_i64)
                .map_or(0, |v| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
        };
        Margin {
            top: side("top"),
            right: side("right"),
            bottom: side("bottom"),
            left: side("left"),
        }
    }

    pub fn set_margin(&mut self, margin: Margin) {
        self.props.set(
            "margin",
            json!({"top": margin.top, "right": margin.right, "bottom": margin.bottom, "left": margin.left}),
        );
    }

    pub fn wrapper_id(&self) -> String {
        self.props.get_str("wrapper_id")
    }

    pub fn set_wrapper_id(&mut self, id: &str) {
        self.props.set("wrapper_id", json!(id.trim()));
    }

    pub fn wrapper_class(&self) -> String {
        self.props.get_str("wrapper_class")
    }

    pub fn set_wrapper_class(&mut self, class: &str) {
        self.props.set("wrapper_class", json!(class.trim()));
    }

    pub fn add_wrapper_sizes(&self) -> bool {
        self.props.get_bool("add_wrapper_sizes")
    }

    pub fn set_add_wrapper_sizes(&mut self, enabled: bool) {
        self.props.set("add_wrapper_sizes", json!(enabled));
    }

    /// Unix timestamp; 0 means the ad never expires.
    pub fn expiry(&self) -> i64 {
        self.props.get_u64("expiry_date").min(i64::MAX as u64) as i64
    }

    pub fn set_expiry(&mut self, timestamp: i64) {
        self.props.set("expiry_date", json!(timestamp.max(0)));
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let expiry = self.expiry();
        expiry > 0 && expiry <= now.timestamp()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Allowed weekdays, 0 = Sunday. Empty means every day.
    pub fn weekdays(&self) -> Vec<u32> {
        self.props
            .get_as::<Vec<u32>>("weekdays")
            .unwrap_or_default()
            .into_iter()
            .filter(|d| *d < 7)
            .collect()
    }

    pub fn set_weekdays(&mut self, days: &[u32]) {
        let mut days: Vec<u32> = days.iter().copied().filter(|d| *d < 7).collect();
        days.sort_unstable();
        days.dedup();
        self.props.set("weekdays", json!(days));
    }

    /// Weekday restriction, evaluated in the site's timezone.
    pub fn runs_on(&self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        let days = self.weekdays();
        days.is_empty() || days.contains(&now.with_timezone(&offset).weekday().num_days_from_sunday())
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

    pub fn set_mobile_rule(&mut self, rule: Option<MobileRule>) {
        self.props.set("mobile", serde_json::to_value(rule).unwrap_or_default());
    }

    pub fn debug_mode(&self) -> bool {
        self.props.get_bool("debugmode")
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.props.set("debugmode", json!(enabled));
    }

    /// Stored for round-trips with the editor only. No ad type executes
    /// embedded code, so plain content renders verbatim whatever this says.
    pub fn allow_php(&self) -> bool {
        self.props.get_bool("allow_php")
    }

    pub fn set_allow_php(&mut self, enabled: bool) {
        self.props.set("allow_php", json!(enabled));
    }

    pub fn allow_shortcodes(&self) -> bool {
        self.props.get_bool("allow_shortcodes")
    }

    pub fn set_allow_shortcodes(&mut self, enabled: bool) {
        self.props.set("allow_shortcodes", json!(enabled));
    }

    /// Type-specific option, e.g. `group_id` for group ads.
    pub fn option(&self, key: &str) -> Value {
        match self.props.get("options", PropContext::View) {
            Value::Object(mut options) => options.remove(key).unwrap_or(Value::Null),
            _ => Value::Null,
        }
    }

    pub fn set_option(&mut self, key: &str, value: Value) {
        let mut options = match self.props.get("options", PropContext::Edit) {
            Value::Object(options) => options,
            _ => Map::new(),
        };
        options.insert(key.to_string(), value);
        self.props.set("options", Value::Object(options));
    }
}

impl Default for Ad {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_ad_defaults() {
        let ad = Ad::new();
        assert!(ad.id().is_none());
        assert_eq!(ad.type_tag(), "plain");
        assert_eq!(ad.position(), Position::None);
        assert_eq!(ad.status(), EntityStatus::Publish);
        assert!(ad.margin().is_empty());
        assert!(ad.display_conditions().is_empty());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut ad = Ad::new();

        ad.set_expiry(0);
        assert!(!ad.is_expired_at(now));

        ad.set_expiry(now.timestamp() + 1);
        assert!(!ad.is_expired_at(now));

        ad.set_expiry(now.timestamp());
        assert!(ad.is_expired_at(now));

        ad.set_expiry(now.timestamp() - 1);
        assert!(ad.is_expired_at(now));
    }

    #[test]
    fn test_setters_normalize() {
        let mut ad = Ad::new();
        ad.set_position_str("");
        assert_eq!(ad.position(), Position::None);
        ad.set_position_str(" Right ");
        assert_eq!(ad.position(), Position::Right);

        ad.set_type("");
        assert_eq!(ad.type_tag(), "plain");

        ad.set_expiry(-50);
        assert_eq!(ad.expiry(), 0);

        ad.set_weekdays(&[5, 1, 9, 1]);
        assert_eq!(ad.weekdays(), vec![1, 5]);
    }

    #[test]
    fn test_hydrated_values_are_coerced() {
        let data = serde_json::json!({"width": "300", "height": 250.0, "position": "CENTER"})
            .as_object()
            .cloned()
            .unwrap();
        let ad = Ad::from_storage(4, data);
        assert_eq!(ad.width(), 300);
        assert_eq!(ad.height(), 250);
        assert_eq!(ad.position(), Position::Center);
    }

    #[test]
    fn test_allow_php_persists() {
        let data = serde_json::json!({"allow_php": "1"}).as_object().cloned().unwrap();
        let mut ad = Ad::from_storage(4, data);
        assert!(ad.allow_php());
        ad.set_allow_php(false);
        assert!(!ad.allow_php());
        assert_eq!(ad.props().get("allow_php", PropContext::Edit), serde_json::json!(false));
    }

    #[test]
    fn test_margin_sides_coerced_individually() {
        let data = serde_json::json!({"margin": {"top": "10", "right": -4, "bottom": 2.0, "left": "x"}})
            .as_object()
            .cloned()
            .unwrap();
        let ad = Ad::from_storage(4, data);
        assert_eq!(
            ad.margin(),
            Margin {
                top: 10,
                right: -4,
                bottom: 2,
                left: 0
            }
        );

        let mut ad = Ad::new();
        ad.set_margin(Margin {
            top: 1,
            right: 2,
            bottom: 3,
            left: 4,
        });
        assert_eq!(ad.margin().left, 4);
    }

    #[test]
    fn test_weekday_in_site_timezone() {
        // Sunday 23:30 UTC is Monday 01:30 at UTC+2
        let now = Utc.with_ymd_and_hms(2024, 6, 2, 23, 30, 0).unwrap();
        let mut ad = Ad::new();
        ad.set_weekdays(&[1]);
        let utc = FixedOffset::east_opt(0).unwrap();
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert!(!ad.runs_on(now, utc));
        assert!(ad.runs_on(now, plus_two));
    }

    #[test]
    fn test_options_roundtrip() {
        let mut ad = Ad::new();
        ad.set_option("group_id", json!(3));
        assert_eq!(ad.option("group_id"), json!(3));
        assert!(ad.option("missing").is_null());
    }
}
