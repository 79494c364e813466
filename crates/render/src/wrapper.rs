//! Wrapper element, label, edit bar and clearfix around a rendered body.

use adrotate_core::config::AppConfig;
use adrotate_core::types::Margin;
use adrotate_core::{LabelMode, Position, RenderArgs};
use indexmap::IndexMap;

/// Entity-side inputs of the wrapper. Groups use the empty default.
#[derive(Debug, Clone, Default)]
pub struct WrapperInput {
    pub position: Position,
    pub margin: Margin,
    /// Already zero unless the ad type has a size and sizes are enabled.
    pub width: u32,
    pub height: u32,
    pub wrapper_id: String,
    pub wrapper_class: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrapper {
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub styles: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
}

impl Wrapper {
    /// Assemble the attribute set. Placement classes and attributes apply to
    /// top-level renders only; a placement position wins over the entity's.
    pub fn build(input: &WrapperInput, args: &RenderArgs) -> Self {
        let mut wrapper = Wrapper::default();
        let position = args.placement_position.unwrap_or(input.position);

        match position {
            Position::Left => wrapper.style("float", "left"),
            Position::Right => wrapper.style("float", "right"),
            Position::Center => {
                wrapper.style("margin-left", "auto");
                wrapper.style("margin-right", "auto");
                if input.width == 0 {
                    wrapper.style("text-align", "center");
                }
            }
            Position::Clearfix => wrapper.style("clear", "both"),
            Position::None => {}
        }

        let margin = &input.margin;
        let sides = [
            ("margin-top", margin.top, true),
            ("margin-right", margin.right, position != Position::Center),
            ("margin-bottom", margin.bottom, true),
            ("margin-left", margin.left, position != Position::Center),
        ];
        for (prop, value, applies) in sides {
            if applies && value != 0 {
                wrapper.style(prop, &format!("{value}px"));
            }
        }

        if input.width > 0 {
            wrapper.style("width", &format!("{}px", input.width));
        }
        if input.height > 0 {
            wrapper.style("height", &format!("{}px", input.height));
        }

        wrapper
            .classes
            .extend(input.wrapper_class.split_whitespace().map(str::to_string));

        if args.is_top_level {
            for class in &args.wrapper_classes {
                if !class.is_empty() && !wrapper.classes.contains(class) {
                    wrapper.classes.push(class.clone());
                }
            }
            wrapper.attributes.extend(
                args.wrapper_attributes
                    .iter()
                    .filter(|(name, _)| !matches!(name.as_str(), "id" | "class" | "style"))
                    .map(|(k, v)| (k.clone(), v.clone())),
            );
        }

        if !input.wrapper_id.trim().is_empty() {
            wrapper.id = Some(input.wrapper_id.trim().to_string());
        }
        wrapper
    }

    fn style(&mut self, prop: &str, value: &str) {
        self.styles.insert(prop.to_string(), value.to_string());
    }

    /// No classes, styles or attributes.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.styles.is_empty() && self.attributes.is_empty()
    }

    /// Whether an element is emitted at all.
    pub fn is_needed(&self) -> bool {
        !self.is_empty() || self.id.is_some()
    }

    pub fn open_tag(&self) -> String {
        let mut tag = String::from("<div");
        if let Some(id) = &self.id {
            tag.push_str(&format!(r#" id="{}""#, escape_html(id)));
        }
        if !self.classes.is_empty() {
            tag.push_str(&format!(r#" class="{}""#, escape_html(&self.classes.join(" "))));
        }
        if !self.styles.is_empty() {
            let style = self
                .styles
                .iter()
                .map(|(prop, value)| format!("{prop}: {value};"))
                .collect::<Vec<_>>()
                .join(" ");
            tag.push_str(&format!(r#" style="{}""#, escape_html(&style)));
        }
        for (name, value) in &self.attributes {
            tag.push_str(&format!(r#" {}="{}""#, escape_html(name), escape_html(value)));
        }
        tag.push('>');
        tag
    }

    pub fn wrap(&self, inner: &str) -> String {
        format!("{}{inner}</div>", self.open_tag())
    }
}

/// Label text for a top-level render, if one is shown.
pub fn label_text(config: &AppConfig, args: &RenderArgs) -> Option<String> {
    if !args.is_top_level {
        return None;
    }
    let enabled = match args.ad_label {
        LabelMode::Enabled => true,
        LabelMode::Disabled => false,
        LabelMode::Default => config.label.enabled,
    };
    (enabled && !config.label.text.trim().is_empty()).then(|| config.label.text.clone())
}

pub fn label_markup(config: &AppConfig, text: &str) -> String {
    format!(
        r#"<div class="{}adlabel">{}</div>"#,
        config.frontend_prefix,
        escape_html(text)
    )
}

pub fn edit_bar(config: &AppConfig, id: u64) -> String {
    format!(
        r#"<div class="{prefix}edit-bar"><a href="{url}" class="{prefix}edit-link">Edit</a></div>"#,
        prefix = config.frontend_prefix,
        url = escape_html(&config.edit_url(id)),
    )
}

pub const CLEARFIX: &str = r#"<br style="clear: both; display: block; float: none;"/>"#;

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_level() -> RenderArgs {
        RenderArgs::new()
    }

    #[test]
    fn test_empty_input_builds_empty_wrapper() {
        let wrapper = Wrapper::build(&WrapperInput::default(), &top_level());
        assert!(wrapper.is_empty());
        assert!(!wrapper.is_needed());
    }

    #[test]
    fn test_explicit_id_alone_needs_wrapper() {
        let input = WrapperInput {
            wrapper_id: "hero".to_string(),
            ..WrapperInput::default()
        };
        let wrapper = Wrapper::build(&input, &top_level());
        assert!(wrapper.is_empty());
        assert!(wrapper.is_needed());
        assert_eq!(wrapper.wrap("x"), r#"<div id="hero">x</div>"#);
    }

    #[test]
    fn test_position_styles() {
        let left = WrapperInput {
            position: Position::Left,
            ..WrapperInput::default()
        };
        assert_eq!(
            Wrapper::build(&left, &top_level()).open_tag(),
            r#"<div style="float: left;">"#
        );

        let clearfix = WrapperInput {
            position: Position::Clearfix,
            ..WrapperInput::default()
        };
        assert_eq!(
            Wrapper::build(&clearfix, &top_level()).styles.get("clear").map(String::as_str),
            Some("both")
        );
    }

    #[test]
    fn test_center_ignores_horizontal_margins() {
        let input = WrapperInput {
            position: Position::Center,
            margin: Margin {
                top: 5,
                right: 10,
                bottom: 0,
                left: 10,
            },
            ..WrapperInput::default()
        };
        let wrapper = Wrapper::build(&input, &top_level());
        assert_eq!(wrapper.styles.get("margin-left").map(String::as_str), Some("auto"));
        assert_eq!(wrapper.styles.get("margin-right").map(String::as_str), Some("auto"));
        assert_eq!(wrapper.styles.get("margin-top").map(String::as_str), Some("5px"));
        assert_eq!(wrapper.styles.get("text-align").map(String::as_str), Some("center"));

        let sized = WrapperInput {
            width: 300,
            ..input
        };
        let wrapper = Wrapper::build(&sized, &top_level());
        assert!(wrapper.styles.get("text-align").is_none());
        assert_eq!(wrapper.styles.get("width").map(String::as_str), Some("300px"));
    }

    #[test]
    fn test_placement_overrides_and_top_level_only() {
        let mut args = top_level();
        args.placement_position = Some(Position::Right);
        args.wrapper_classes = vec!["adrotate-sidebar".to_string()];
        args.wrapper_attributes.insert("data-slot".to_string(), "1".to_string());
        args.wrapper_attributes.insert("style".to_string(), "color: red".to_string());

        let input = WrapperInput {
            position: Position::Left,
            wrapper_class: "promo  wide".to_string(),
            ..WrapperInput::default()
        };
        let wrapper = Wrapper::build(&input, &args);
        assert_eq!(wrapper.styles.get("float").map(String::as_str), Some("right"));
        assert_eq!(wrapper.classes, vec!["promo", "wide", "adrotate-sidebar"]);
        assert_eq!(wrapper.attributes.len(), 1);

        args.is_top_level = false;
        let nested = Wrapper::build(&input, &args);
        assert_eq!(nested.classes, vec!["promo", "wide"]);
        assert!(nested.attributes.is_empty());
    }

    #[test]
    fn test_label_modes() {
        let mut config = AppConfig::default();
        let mut args = top_level();
        assert_eq!(label_text(&config, &args), None);

        config.label.enabled = true;
        assert_eq!(label_text(&config, &args).as_deref(), Some("Advertisements"));

        args.ad_label = LabelMode::Disabled;
        assert_eq!(label_text(&config, &args), None);

        config.label.enabled = false;
        args.ad_label = LabelMode::Enabled;
        assert!(label_text(&config, &args).is_some());

        args.is_top_level = false;
        assert_eq!(label_text(&config, &args), None);
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#039;");
        let label = label_markup(&AppConfig::default(), "Ads & more");
        assert_eq!(label, r#"<div class="adrotate-adlabel">Ads &amp; more</div>"#);
    }
}
