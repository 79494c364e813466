//! Built-in visitor conditions, evaluated against whoever is viewing.

use adrotate_core::{Condition, RequestContext};
use serde::Deserialize;

use crate::engine::ConditionSet;
use crate::predicates::{apply_operator, check_string, compare_strings, value_list};

pub fn register_defaults(set: &mut ConditionSet) {
    set.register("mobile", mobile);
    set.register("loggedin", logged_in);
    set.register("role", role);
    set.register("referrer_url", referrer_url);
    set.register("user_agent", user_agent);
    set.register("cookie", cookie);
    set.register("browser_lang", browser_lang);
}

fn mobile(condition: &Condition, ctx: &RequestContext) -> bool {
    apply_operator(condition, ctx.visitor.is_mobile)
}

fn logged_in(condition: &Condition, ctx: &RequestContext) -> bool {
    apply_operator(condition, ctx.visitor.is_logged_in)
}

fn role(condition: &Condition, ctx: &RequestContext) -> bool {
    let wanted = value_list(&condition.value);
    let matched = ctx.visitor.roles.iter().any(|r| wanted.contains(r));
    apply_operator(condition, matched)
}

fn referrer_url(condition: &Condition, ctx: &RequestContext) -> bool {
    check_string(ctx.visitor.referrer.as_deref().unwrap_or_default(), condition)
}

fn user_agent(condition: &Condition, ctx: &RequestContext) -> bool {
    check_string(ctx.visitor.user_agent.as_deref().unwrap_or_default(), condition)
}

/// `{"name": "consent", "value": "granted"}`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CookieMatch {
    name: String,
    value: String,
}

/// Without an expected value only presence is checked (`is`/`is_not`).
fn cookie(condition: &Condition, ctx: &RequestContext) -> bool {
    let wanted: CookieMatch = serde_json::from_value(condition.value.clone()).unwrap_or_default();
    if wanted.name.is_empty() {
        return true;
    }
    let actual = ctx.visitor.cookies.get(&wanted.name);
    if wanted.value.is_empty() {
        return apply_operator(condition, actual.is_some());
    }
    compare_strings(
        actual.map(String::as_str).unwrap_or_default(),
        condition.operator.as_deref(),
        &wanted.value,
    )
}

/// Compares the primary language subtag, so `de` matches `de-AT`.
fn browser_lang(condition: &Condition, ctx: &RequestContext) -> bool {
    let primary = |tag: &str| {
        tag.split(['-', '_'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    };
    let visitor_lang = ctx.visitor.browser_language.as_deref().map(primary);
    let matched = visitor_lang.is_some_and(|lang| {
        value_list(&condition.value)
            .iter()
            .any(|wanted| primary(wanted.as_str()) == lang)
    });
    apply_operator(condition, matched)
}
