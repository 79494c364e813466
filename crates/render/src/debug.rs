//! Debug panel shown in front of ads that have debug mode enabled.

use adrotate_core::Ad;
use chrono::DateTime;

use crate::session::RenderSession;
use crate::wrapper::escape_html;

const PANEL_STYLE: &str =
    "width: 300px; background: #ffffe0; border: 1px solid #e6db55; padding: 5px; font-size: 12px; text-align: left;";

fn verdict(passed: bool) -> &'static str {
    if passed {
        "passed"
    } else {
        "failed"
    }
}

impl RenderSession<'_> {
    /// Why the ad would or would not show for this request.
    pub(crate) fn debug_panel(&self, ad: &Ad) -> String {
        let ctx = &self.ctx;
        let conditions = &self.engine.conditions;

        let expiry = match ad.expiry() {
            0 => "never".to_string(),
            ts => DateTime::from_timestamp(ts, 0)
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| ts.to_string()),
        };
        let display_ok = conditions.check_display_conditions(&ad.display_conditions(), ctx);
        let visitor_ok =
            conditions.check_visitor_conditions(&ad.visitor_conditions(), ad.mobile_rule(), ctx);

        let lines = [
            format!("Ad ID: {}", ad.id().map(|id| id.to_string()).unwrap_or_default()),
            format!("Type: {}", self.engine.ad_types.resolve(&ad.type_tag()).title()),
            format!("Status: {}", ad.status().as_str()),
            format!("Expiry: {expiry}{}", if ad.is_expired_at(ctx.now) { " (expired)" } else { "" }),
            format!("Weekday: {}", verdict(ad.runs_on(ctx.now, self.site_offset()))),
            format!("Display conditions: {}", verdict(display_ok)),
            format!("Visitor conditions: {}", verdict(visitor_ok)),
            match self.ad_eligibility(ad) {
                Some(reason) => format!("Eligible: no ({reason})"),
                None => "Eligible: yes".to_string(),
            },
        ];
        let body = lines
            .iter()
            .map(|line| escape_html(line))
            .collect::<Vec<_>>()
            .join("<br/>");
        format!(
            r#"<div class="{}debug" style="{PANEL_STYLE}">{body}</div>"#,
            self.engine.config.frontend_prefix
        )
    }
}
