//! HTML pages and their scripts
//!
//! Tenant routes are not registered individually: the router fallback looks
//! the path up in the tenant table and serves the wizard page, or redirects
//! to `/` when no tenant matches.

use audioform_common::tenants::DEFAULT_PATH;
use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::ApiError;
use crate::AppState;

const FORM_HTML: &str = include_str!("../ui/form.html");
const FORM_JS: &str = include_str!("../ui/form.js");
const THANK_YOU_HTML: &str = include_str!("../ui/thank_you.html");
const DASHBOARD_HTML: &str = include_str!("../ui/dashboard.html");
const DASHBOARD_JS: &str = include_str!("../ui/dashboard.js");

/// Escape text for interpolation into HTML content or a quoted attribute
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wizard page for `path`, with the tenant's company filled in
pub fn render_form(path: &str, company: &str) -> String {
    FORM_HTML
        .replace("{{company}}", &escape_html(company))
        .replace("{{path}}", &escape_html(path))
}

/// Router fallback: tenant pages for GET, JSON 404 otherwise
pub async fn tenant_fallback(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    let path = uri.path();
    if method != Method::GET || path.starts_with("/api/") {
        return ApiError::UnknownRoute(path.to_string()).into_response();
    }

    match state.tenants.get(path) {
        Some(tenant) => Html(render_form(&tenant.path, &tenant.company)).into_response(),
        None => {
            debug!("Unknown route {}, redirecting to {}", path, DEFAULT_PATH);
            Redirect::to(DEFAULT_PATH).into_response()
        }
    }
}

/// GET /thank-you
///
/// The page returns to the landing route on its own timer.
pub async fn serve_thank_you(State(state): State<AppState>) -> Html<String> {
    Html(
        THANK_YOU_HTML
            .replace(
                "{{delay_secs}}",
                &state.settings.redirect_delay_secs.to_string(),
            )
            .replace("{{landing}}", &escape_html(&state.settings.landing_path)),
    )
}

/// GET /dashboard
pub async fn serve_dashboard() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// GET /static/form.js
pub async fn serve_form_js() -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/javascript")],
        FORM_JS,
    )
        .into_response()
}

/// GET /static/dashboard.js
pub async fn serve_dashboard_js() -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/javascript")],
        DASHBOARD_JS,
    )
        .into_response()
}
