//! Content injection for `post_top`, `post_bottom` and `post_content`
//! placements.

use adrotate_core::entity::{InjectAt, InjectionOptions};
use adrotate_core::RenderArgs;
use regex::Regex;
use tracing::{debug, warn};

use crate::session::RenderSession;

impl RenderSession<'_> {
    /// Render every content placement and splice the output into `content`.
    pub fn inject_content(&mut self, content: &str) -> String {
        let engine = self.engine;
        let catalog = engine.catalog.as_ref();
        let mut output = content.to_string();

        for placement in catalog.placements_by_type("post_content") {
            let injection = placement.options().injection;
            let slug = placement.slug();
            let ad = self.render_placement_entity(placement, RenderArgs::new());
            if ad.is_empty() {
                continue;
            }
            match inject_at(&output, &ad, &injection) {
                Some(injected) => output = injected,
                None => debug!(placement = %slug, tag = %injection.tag, "not enough tags to inject"),
            }
        }

        for placement in catalog.placements_by_type("post_top") {
            let ad = self.render_placement_entity(placement, RenderArgs::new());
            output.insert_str(0, &ad);
        }
        for placement in catalog.placements_by_type("post_bottom") {
            let ad = self.render_placement_entity(placement, RenderArgs::new());
            output.push_str(&ad);
        }
        output
    }
}

/// Insert before the opening or after the closing n-th `tag`. `None` when
/// the content has too few tags and appending is not allowed.
pub fn inject_at(content: &str, insertion: &str, options: &InjectionOptions) -> Option<String> {
    let tag = sanitize_tag(&options.tag);
    let pattern = match options.position {
        InjectAt::Before => format!(r"(?i)<{tag}(?:\s[^>]*)?>"),
        InjectAt::After => format!(r"(?i)</{tag}\s*>"),
    };
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(tag = %tag, error = %e, "invalid injection tag");
            return None;
        }
    };

    let index = options.index.max(1);
    let offset = re.find_iter(content).nth(index - 1).map(|m| match options.position {
        InjectAt::Before => m.start(),
        InjectAt::After => m.end(),
    });

    match offset {
        Some(offset) => {
            let mut injected = String::with_capacity(content.len() + insertion.len());
            injected.push_str(&content[..offset]);
            injected.push_str(insertion);
            injected.push_str(&content[offset..]);
            Some(injected)
        }
        None if options.fallback_append => Some(format!("{content}{insertion}")),
        None => None,
    }
}

/// Tag names are limited to ASCII alphanumerics; anything else means `p`.
fn sanitize_tag(tag: &str) -> String {
    let tag = tag.trim().to_ascii_lowercase();
    if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) {
        tag
    } else {
        "p".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POST: &str = "<p>One</p><P class=\"x\">Two</P><h2>Head</h2><p>Three</p>";

    fn options(position: InjectAt, tag: &str, index: usize) -> InjectionOptions {
        InjectionOptions {
            position,
            tag: tag.to_string(),
            index,
            fallback_append: false,
        }
    }

    #[test]
    fn test_after_nth_paragraph() {
        let out = inject_at(POST, "[AD]", &options(InjectAt::After, "p", 2));
        assert_eq!(
            out.as_deref(),
            Some("<p>One</p><P class=\"x\">Two</P>[AD]<h2>Head</h2><p>Three</p>")
        );
    }

    #[test]
    fn test_before_heading() {
        let out = inject_at(POST, "[AD]", &options(InjectAt::Before, "h2", 1));
        assert_eq!(
            out.as_deref(),
            Some("<p>One</p><P class=\"x\">Two</P>[AD]<h2>Head</h2><p>Three</p>")
        );
    }

    #[test]
    fn test_before_does_not_match_longer_tags() {
        let content = "<pre>code</pre><p>text</p>";
        let out = inject_at(content, "[AD]", &options(InjectAt::Before, "p", 1));
        assert_eq!(out.as_deref(), Some("<pre>code</pre>[AD]<p>text</p>"));
    }

    #[test]
    fn test_too_few_tags() {
        let mut opts = options(InjectAt::After, "p", 9);
        assert_eq!(inject_at(POST, "[AD]", &opts), None);

        opts.fallback_append = true;
        assert_eq!(inject_at(POST, "[AD]", &opts), Some(format!("{POST}[AD]")));
    }

    #[test]
    fn test_sanitize_tag() {
        assert_eq!(sanitize_tag(" H2 "), "h2");
        assert_eq!(sanitize_tag("p><script"), "p");
        assert_eq!(sanitize_tag(""), "p");
    }
}
