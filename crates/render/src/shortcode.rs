//! `[the_ad id="…"]`, `[the_ad_group id="…"]` and `[the_ad_placement id="…"]`
//! embeds inside ad content.

use std::sync::LazyLock;

use adrotate_core::{EntityId, EntityKind, RenderArgs};
use regex::{Captures, Regex};
use tracing::debug;

use crate::session::RenderSession;

static SHORTCODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\[(the_ad|the_ad_group|the_ad_placement)\s+id=["']?([^"'\]\s]+)["']?[^\]]*\]"#)
        .expect("valid shortcode pattern")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shortcode {
    Ad(EntityId),
    Group(EntityId),
    Placement(String),
}

impl Shortcode {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let id = caps.get(2)?.as_str();
        match caps.get(1)?.as_str() {
            "the_ad" => id.parse().ok().map(Shortcode::Ad),
            "the_ad_group" => id.parse().ok().map(Shortcode::Group),
            "the_ad_placement" => Some(Shortcode::Placement(id.to_string())),
            _ => None,
        }
    }
}

/// Embeds found in `content`, in order.
pub fn parse_shortcodes(content: &str) -> Vec<Shortcode> {
    SHORTCODE
        .captures_iter(content)
        .filter_map(|caps| Shortcode::from_captures(&caps))
        .collect()
}

impl RenderSession<'_> {
    /// Replace every embed with its rendered output. Nested renders carry
    /// the current entity as breadcrumb so an entity cannot embed itself.
    pub fn expand_shortcodes(&mut self, content: &str, args: &RenderArgs, parent: EntityKind) -> String {
        if !SHORTCODE.is_match(content) {
            return content.to_string();
        }
        SHORTCODE
            .replace_all(content, |caps: &Captures<'_>| {
                let nested = args.nested(parent);
                match Shortcode::from_captures(caps) {
                    Some(Shortcode::Ad(id)) => self.render_ad(id, None, nested),
                    Some(Shortcode::Group(id)) => self.render_group(id, None, nested),
                    Some(Shortcode::Placement(slug)) => self.render_placement(&slug, nested),
                    None => {
                        debug!(shortcode = &caps[0], "malformed shortcode removed");
                        String::new()
                    }
                }
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_shortcodes() {
        let content = r#"before [the_ad id="12"] mid [the_ad_group id=3] [the_ad_placement id='sidebar' align="left"] [other id="1"]"#;
        assert_eq!(
            parse_shortcodes(content),
            vec![
                Shortcode::Ad(12),
                Shortcode::Group(3),
                Shortcode::Placement("sidebar".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_numeric_ad_id_is_ignored() {
        assert!(parse_shortcodes(r#"[the_ad id="abc"]"#).is_empty());
    }
}
