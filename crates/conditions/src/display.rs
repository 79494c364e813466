//! Built-in display conditions, evaluated against the page being viewed.

use adrotate_core::{Condition, RequestContext};
use chrono::Duration;
use serde::Deserialize;
use tracing::warn;

use crate::engine::ConditionSet;
use crate::predicates::{apply_operator, check_in_list, check_string, value_list};

pub fn register_defaults(set: &mut ConditionSet) {
    set.register("posttypes", post_types);
    set.register("postids", post_ids);
    set.register("author", author);
    set.register("taxonomy", taxonomy);
    set.register("archive", archive);
    set.register("general", general);
    set.register("request_uri", request_uri);
    set.register("page_template", page_template);
    set.register("content_age", content_age);
}

fn post_types(condition: &Condition, ctx: &RequestContext) -> bool {
    check_in_list(ctx.page.post_type.clone(), condition)
}

fn post_ids(condition: &Condition, ctx: &RequestContext) -> bool {
    check_in_list(ctx.page.post_id.map(|id| id.to_string()), condition)
}

fn author(condition: &Condition, ctx: &RequestContext) -> bool {
    check_in_list(ctx.page.author_id.map(|id| id.to_string()), condition)
}

/// `{"taxonomy": "category", "terms": [3, 9]}`
#[derive(Debug, Deserialize)]
struct TermSelection {
    taxonomy: String,
    #[serde(default)]
    terms: Vec<u64>,
}

fn term_selection(condition: &Condition) -> Option<TermSelection> {
    serde_json::from_value(condition.value.clone()).ok()
}

/// Current post carries one of the terms.
fn taxonomy(condition: &Condition, ctx: &RequestContext) -> bool {
    let Some(selection) = term_selection(condition) else {
        return true;
    };
    let matched = ctx
        .page
        .terms
        .get(&selection.taxonomy)
        .is_some_and(|terms| terms.iter().any(|t| selection.terms.contains(t)));
    apply_operator(condition, matched)
}

/// Current page is the archive of one of the terms.
fn archive(condition: &Condition, ctx: &RequestContext) -> bool {
    let Some(selection) = term_selection(condition) else {
        return true;
    };
    let matched = ctx
        .page
        .archive
        .as_ref()
        .is_some_and(|(tax, term)| *tax == selection.taxonomy && selection.terms.contains(term));
    apply_operator(condition, matched)
}

/// Value lists the page kinds the ad may appear on. Secondary queries are
/// excluded unless `is_main_query` is listed.
fn general(condition: &Condition, ctx: &RequestContext) -> bool {
    let allowed = value_list(&condition.value);
    let flags = &ctx.page.flags;

    if !flags.is_main_query && !allowed.iter().any(|f| f == "is_main_query") {
        return false;
    }

    let active = flags.active();
    active.is_empty() || active.iter().any(|flag| allowed.iter().any(|a| a == flag))
}

fn request_uri(condition: &Condition, ctx: &RequestContext) -> bool {
    check_string(&ctx.page.request_uri, condition)
}

fn page_template(condition: &Condition, ctx: &RequestContext) -> bool {
    check_in_list(ctx.page.page_template.clone(), condition)
}

/// Operator `older_than` / `younger_than`, value in days. Pages without a
/// publish date pass, as do day counts chrono cannot represent.
fn content_age(condition: &Condition, ctx: &RequestContext) -> bool {
    let Some(published_at) = ctx.page.published_at else {
        return true;
    };
    let days = value_list(&condition.value)
        .first()
        .and_then(|d| d.parse::<i64>().ok())
        .unwrap_or(0);
    let Some(limit) = Duration::try_days(days) else {
        warn!(days, "content_age value out of range, ignoring condition");
        return true;
    };
    let age = ctx.now - published_at;
    match condition.operator.as_deref() {
        Some("younger_than") => age < limit,
        _ => age > limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn evaluate(condition: Condition, ctx: &RequestContext) -> bool {
        let mut set = ConditionSet::new();
        register_defaults(&mut set);
        set.evaluate(&[condition], ctx)
    }

    fn article() -> RequestContext {
        let mut ctx = RequestContext::default();
        ctx.page.post_id = Some(42);
        ctx.page.post_type = Some("post".to_string());
        ctx.page.author_id = Some(7);
        ctx.page.terms.insert("category".to_string(), vec![3, 5]);
        ctx.page.flags.is_singular = true;
        ctx.page.request_uri = "/news/launch-day".to_string();
        ctx
    }

    #[test]
    fn test_post_type_and_ids() {
        let ctx = article();
        assert!(evaluate(Condition::new("posttypes", json!(["post", "page"])).operator("is"), &ctx));
        assert!(!evaluate(Condition::new("posttypes", json!(["page"])).operator("is"), &ctx));
        assert!(evaluate(Condition::new("postids", json!([42])).operator("is"), &ctx));
        assert!(!evaluate(Condition::new("postids", json!([42])).operator("is_not"), &ctx));
        assert!(evaluate(Condition::new("author", json!(["7"])), &ctx));
    }

    #[test]
    fn test_taxonomy_terms() {
        let ctx = article();
        let hit = Condition::new("taxonomy", json!({"taxonomy": "category", "terms": [5]}));
        let miss = Condition::new("taxonomy", json!({"taxonomy": "post_tag", "terms": [5]}));
        assert!(evaluate(hit, &ctx));
        assert!(!evaluate(miss.clone(), &ctx));
        assert!(evaluate(miss.operator("is_not"), &ctx));
    }

    #[test]
    fn test_archive() {
        let mut ctx = RequestContext::default();
        ctx.page.archive = Some(("category".to_string(), 3));
        let condition = Condition::new("archive", json!({"taxonomy": "category", "terms": [3]}));
        assert!(evaluate(condition, &ctx));
    }

    #[test]
    fn test_general_flags() {
        let mut ctx = article();
        let singular_only = Condition::new("general", json!(["is_singular"]));
        let archives_only = Condition::new("general", json!(["is_archive"]));
        assert!(evaluate(singular_only.clone(), &ctx));
        assert!(!evaluate(archives_only, &ctx));

        ctx.page.flags.is_main_query = false;
        assert!(!evaluate(singular_only, &ctx));
        let with_secondary = Condition::new("general", json!(["is_singular", "is_main_query"]));
        assert!(evaluate(with_secondary, &ctx));
    }

    #[test]
    fn test_request_uri() {
        let ctx = article();
        let condition = Condition::new("request_uri", json!("/news/")).operator("start");
        assert!(evaluate(condition, &ctx));
    }

    #[test]
    fn test_content_age() {
        let mut ctx = article();
        ctx.page.published_at = Some(ctx.now - Duration::days(10));
        let older = Condition::new("content_age", json!(5)).operator("older_than");
        let younger = Condition::new("content_age", json!(5)).operator("younger_than");
        assert!(evaluate(older, &ctx));
        assert!(!evaluate(younger.clone(), &ctx));

        ctx.page.published_at = None;
        assert!(evaluate(younger, &ctx));
    }

    #[test]
    fn test_content_age_out_of_range_days() {
        let mut ctx = article();
        ctx.page.published_at = Some(ctx.now - Duration::days(10));
        for days in ["200000000000000", "-200000000000000"] {
            let older = Condition::new("content_age", json!(days)).operator("older_than");
            let younger = Condition::new("content_age", json!(days)).operator("younger_than");
            assert!(evaluate(older, &ctx));
            assert!(evaluate(younger, &ctx));
        }
    }
}
