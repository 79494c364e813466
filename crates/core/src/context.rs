//! Request-scoped snapshot handed down the render call chain.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DisableConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default = "Utc::now")]
    pub now: DateTime<Utc>,
    #[serde(default)]
    pub page: PageContext,
    #[serde(default)]
    pub visitor: VisitorContext,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            page: PageContext::default(),
            visitor: VisitorContext::default(),
        }
    }
}

impl RequestContext {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    /// Name of the first global kill switch matching this request.
    pub fn disabled_by(&self, disable: &DisableConfig) -> Option<&'static str> {
        let flags = &self.page.flags;
        if disable.all {
            Some("all")
        } else if disable.not_found && flags.is_404 {
            Some("not_found")
        } else if disable.archives && flags.is_archive {
            Some("archives")
        } else if disable.secondary_queries && !flags.is_main_query {
            Some("secondary_queries")
        } else if disable.feeds && flags.is_feed {
            Some("feeds")
        } else if disable.rest_api && flags.is_rest_api {
            Some("rest_api")
        } else {
            None
        }
    }
}

/// What is being viewed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PageContext {
    pub post_id: Option<u64>,
    pub post_type: Option<String>,
    pub author_id: Option<u64>,
    /// Taxonomy name → term ids attached to the current post.
    pub terms: HashMap<String, Vec<u64>>,
    /// Taxonomy archive being listed, as `(taxonomy, term_id)`.
    pub archive: Option<(String, u64)>,
    pub request_uri: String,
    pub page_template: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub flags: QueryFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFlags {
    pub is_front_page: bool,
    pub is_singular: bool,
    pub is_archive: bool,
    pub is_search: bool,
    pub is_404: bool,
    pub is_attachment: bool,
    pub is_main_query: bool,
    pub is_feed: bool,
    pub is_rest_api: bool,
}

impl Default for QueryFlags {
    fn default() -> Self {
        Self {
            is_front_page: false,
            is_singular: false,
            is_archive: false,
            is_search: false,
            is_404: false,
            is_attachment: false,
            is_main_query: true,
            is_feed: false,
            is_rest_api: false,
        }
    }
}

impl QueryFlags {
    /// Names of the page-kind flags that are currently set.
    pub fn active(&self) -> Vec<&'static str> {
        [
            ("is_front_page", self.is_front_page),
            ("is_singular", self.is_singular),
            ("is_archive", self.is_archive),
            ("is_search", self.is_search),
            ("is_404", self.is_404),
            ("is_attachment", self.is_attachment),
            ("is_feed", self.is_feed),
            ("is_rest_api", self.is_rest_api),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// Who is viewing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorContext {
    pub is_mobile: bool,
    pub is_logged_in: bool,
    pub roles: Vec<String>,
    /// Viewer may edit ads; enables the frontend edit affordance.
    pub can_edit: bool,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub browser_language: Option<String>,
    pub cookies: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_query_defaults_true() {
        let ctx: RequestContext = serde_json::from_str("{}").unwrap();
        assert!(ctx.page.flags.is_main_query);
        assert!(ctx.page.flags.active().is_empty());
    }

    #[test]
    fn test_disabled_by() {
        let mut ctx = RequestContext::default();
        let mut disable = DisableConfig::default();
        assert_eq!(ctx.disabled_by(&disable), None);

        disable.feeds = true;
        assert_eq!(ctx.disabled_by(&disable), None);
        ctx.page.flags.is_feed = true;
        assert_eq!(ctx.disabled_by(&disable), Some("feeds"));

        disable.all = true;
        assert_eq!(ctx.disabled_by(&disable), Some("all"));
    }
}
