//! Ad type strategies: how each kind of ad produces its body.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use adrotate_core::props::coerce_u64;
use adrotate_core::{Ad, EntityKind, RenderArgs};
use serde::Deserialize;
use tracing::debug;

use crate::session::RenderSession;
use crate::wrapper::escape_html;

pub trait AdType: Send + Sync {
    fn name(&self) -> &str;

    /// Human readable label for listings and debug output.
    fn title(&self) -> &str;

    /// Whether width and height apply to this type's wrapper.
    fn has_size(&self) -> bool {
        false
    }

    fn render_body(&self, ad: &Ad, session: &mut RenderSession<'_>, args: &RenderArgs) -> String;
}

/// Raw content, shortcodes expanded when the ad allows it.
#[derive(Debug, Default)]
pub struct PlainType;

impl AdType for PlainType {
    fn name(&self) -> &str {
        "plain"
    }

    fn title(&self) -> &str {
        "Plain Text and Code"
    }

    fn has_size(&self) -> bool {
        true
    }

    fn render_body(&self, ad: &Ad, session: &mut RenderSession<'_>, args: &RenderArgs) -> String {
        let content = ad.content();
        if ad.allow_shortcodes() {
            session.expand_shortcodes(&content, args, EntityKind::Ad)
        } else {
            content
        }
    }
}

/// Rich content: paragraphs are formatted and shortcodes always expanded.
#[derive(Debug, Default)]
pub struct ContentType;

impl AdType for ContentType {
    fn name(&self) -> &str {
        "content"
    }

    fn title(&self) -> &str {
        "Rich Content"
    }

    fn render_body(&self, ad: &Ad, session: &mut RenderSession<'_>, args: &RenderArgs) -> String {
        let formatted = autop(&ad.content());
        session.expand_shortcodes(&formatted, args, EntityKind::Ad)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImagePayload {
    url: String,
    alt: String,
    title: String,
}

/// Image from a JSON payload, linked to the ad url when one is set.
#[derive(Debug, Default)]
pub struct ImageType;

impl AdType for ImageType {
    fn name(&self) -> &str {
        "image"
    }

    fn title(&self) -> &str {
        "Image Ad"
    }

    fn has_size(&self) -> bool {
        true
    }

    fn render_body(&self, ad: &Ad, _session: &mut RenderSession<'_>, _args: &RenderArgs) -> String {
        let payload: ImagePayload = match serde_json::from_str(&ad.content()) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(ad_id = ?ad.id(), error = %e, "image payload unreadable, nothing rendered");
                return String::new();
            }
        };
        if payload.url.is_empty() {
            return String::new();
        }

        let mut img = format!(
            r#"<img src="{}" alt="{}""#,
            escape_html(&payload.url),
            escape_html(&payload.alt)
        );
        if !payload.title.is_empty() {
            img.push_str(&format!(r#" title="{}""#, escape_html(&payload.title)));
        }
        push_size(&mut img, ad);
        img.push_str("/>");
        link(&ad.url(), img)
    }
}

/// Placeholder image for testing placements.
#[derive(Debug, Default)]
pub struct DummyType;

impl AdType for DummyType {
    fn name(&self) -> &str {
        "dummy"
    }

    fn title(&self) -> &str {
        "Dummy"
    }

    fn has_size(&self) -> bool {
        true
    }

    fn render_body(&self, ad: &Ad, _session: &mut RenderSession<'_>, _args: &RenderArgs) -> String {
        let mut img = String::from(r#"<img src="/assets/dummy.jpg" alt="""#);
        if ad.width() == 0 && ad.height() == 0 {
            img.push_str(r#" width="300" height="250""#);
        } else {
            push_size(&mut img, ad);
        }
        img.push_str("/>");
        link(&ad.url(), img)
    }
}

/// Renders the group named by the `group_id` option.
#[derive(Debug, Default)]
pub struct GroupAdType;

impl AdType for GroupAdType {
    fn name(&self) -> &str {
        "group"
    }

    fn title(&self) -> &str {
        "Ad Group"
    }

    fn render_body(&self, ad: &Ad, session: &mut RenderSession<'_>, args: &RenderArgs) -> String {
        match coerce_u64(&ad.option("group_id")) {
            Some(group_id) => session.render_group(group_id, None, args.nested(EntityKind::Ad)),
            None => {
                debug!(ad_id = ?ad.id(), "group ad without group_id");
                String::new()
            }
        }
    }
}

/// Fallback for type tags nobody registered.
#[derive(Debug, Default)]
pub struct UnknownType;

impl AdType for UnknownType {
    fn name(&self) -> &str {
        "unknown"
    }

    fn title(&self) -> &str {
        "Unknown type"
    }

    fn render_body(&self, ad: &Ad, _session: &mut RenderSession<'_>, _args: &RenderArgs) -> String {
        debug!(ad_id = ?ad.id(), type_tag = %ad.type_tag(), "unknown ad type, nothing rendered");
        String::new()
    }
}

#[derive(Clone)]
pub struct AdTypeRegistry {
    types: HashMap<String, Arc<dyn AdType>>,
    unknown: Arc<dyn AdType>,
}

impl Default for AdTypeRegistry {
    fn default() -> Self {
        Self {
            types: HashMap::new(),
            unknown: Arc::new(UnknownType),
        }
    }
}

impl AdTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PlainType);
        registry.register(ContentType);
        registry.register(ImageType);
        registry.register(DummyType);
        registry.register(GroupAdType);
        registry
    }

    pub fn register<T: AdType + 'static>(&mut self, ad_type: T) {
        self.types.insert(ad_type.name().to_string(), Arc::new(ad_type));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.types.contains_key(tag)
    }

    /// Strategy for a type tag; unregistered tags get the unknown type.
    pub fn resolve(&self, tag: &str) -> Arc<dyn AdType> {
        self.types
            .get(tag)
            .cloned()
            .unwrap_or_else(|| self.unknown.clone())
    }
}

impl fmt::Debug for AdTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.types.keys().collect();
        names.sort();
        f.debug_struct("AdTypeRegistry").field("types", &names).finish()
    }
}

fn push_size(img: &mut String, ad: &Ad) {
    if ad.width() > 0 {
        img.push_str(&format!(r#" width="{}""#, ad.width()));
    }
    if ad.height() > 0 {
        img.push_str(&format!(r#" height="{}""#, ad.height()));
    }
}

fn link(url: &str, inner: String) -> String {
    if url.trim().is_empty() {
        inner
    } else {
        format!(r#"<a href="{}">{inner}</a>"#, escape_html(url.trim()))
    }
}

const BLOCK_TAGS: &[&str] = &[
    "<p", "<div", "<ul", "<ol", "<table", "<h1", "<h2", "<h3", "<h4", "<h5", "<h6", "<blockquote",
    "<pre", "<figure", "<section", "[",
];

/// Blank-line separated blocks become paragraphs; single newlines inside a
/// paragraph become line breaks. Blocks that already start with a block
/// element or a shortcode are left alone.
pub fn autop(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(format_block(&current));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(format_block(&current));
    }
    blocks.join("\n")
}

fn format_block(lines: &[&str]) -> String {
    let block = lines.join("\n");
    let lower = block.trim_start().to_ascii_lowercase();
    if BLOCK_TAGS.iter().any(|tag| lower.starts_with(tag)) {
        block
    } else {
        format!("<p>{}</p>", lines.join("<br />\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_unknown() {
        let registry = AdTypeRegistry::with_defaults();
        assert!(registry.contains("plain"));
        assert_eq!(registry.resolve("image").name(), "image");
        let unknown = registry.resolve("flash");
        assert_eq!(unknown.title(), "Unknown type");
        assert!(!unknown.has_size());
    }

    #[test]
    fn test_sized_types() {
        let registry = AdTypeRegistry::with_defaults();
        let sized: Vec<&str> = ["plain", "content", "image", "dummy", "group"]
            .into_iter()
            .filter(|tag| registry.resolve(tag).has_size())
            .collect();
        assert_eq!(sized, vec!["plain", "image", "dummy"]);
    }

    #[test]
    fn test_autop() {
        assert_eq!(autop("Hello\nworld\n\nSecond"), "<p>Hello<br />\nworld</p>\n<p>Second</p>");
        assert_eq!(autop("<div>kept</div>\n\n[the_ad id=\"2\"]"), "<div>kept</div>\n[the_ad id=\"2\"]");
        assert_eq!(autop("  \n\n "), "");
    }
}
