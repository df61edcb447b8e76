//! Theme preference route handler.
//!
//! The theme flag is the one piece of client state that is purely cosmetic,
//! so it lives in its own long-lived cookie rather than the session: the
//! base template reads it on the client and the toggle below flips it.

use axum::{
    http::{HeaderMap, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use tracing::instrument;

/// Theme cookie name.
pub const THEME_COOKIE_NAME: &str = "je_theme";

/// Cookie lifetime: one year.
const THEME_COOKIE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Flip between the two themes, defaulting to dark on first toggle.
fn next_theme(current: Option<&str>) -> &'static str {
    match current {
        Some("dark") => "light",
        _ => "dark",
    }
}

/// Read a cookie value out of the `Cookie` header.
fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find_map(|(key, value)| (key == name).then_some(value))
}

/// Toggle the theme preference and bounce back to the home page.
#[instrument(skip(headers))]
pub async fn toggle(headers: HeaderMap) -> Response {
    let theme = next_theme(cookie_value(&headers, THEME_COOKIE_NAME));
    let cookie = format!(
        "{THEME_COOKIE_NAME}={theme}; Path=/; Max-Age={THEME_COOKIE_MAX_AGE_SECS}; SameSite=Lax"
    );

    (
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Redirect::to("/"),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_next_theme_flips() {
        assert_eq!(next_theme(Some("dark")), "light");
        assert_eq!(next_theme(Some("light")), "dark");
        assert_eq!(next_theme(None), "dark");
    }

    #[test]
    fn test_cookie_value_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("je_session=abc; je_theme=dark"),
        );
        assert_eq!(cookie_value(&headers, THEME_COOKIE_NAME), Some("dark"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
