//! Route guard: allow or bounce each incoming request based on cookie presence.
//!
//! SYSTEM CONTEXT
//! ==============
//! The guard runs before any per-request session exists, so it only looks at
//! whether a non-empty `pb_auth` cookie was sent. It never decodes the value;
//! the record store rejects stale tokens when a handler actually uses them.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::session::cookie::has_auth_cookie;

/// Path prefixes reachable without a session.
pub const PUBLIC_ROUTES: &[&str] = &["/login", "/auth/callback", "/healthz"];

/// Path prefixes served as static assets.
pub const ASSET_PREFIXES: &[&str] = &["/static/", "/pkg/", "/favicon.ico"];

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Asset,
    Protected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin { original_path: String },
}

/// First match wins: public prefix, then asset path or any `.` in the path.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if PUBLIC_ROUTES.iter().any(|p| path.starts_with(p)) {
        return RouteClass::Public;
    }
    if ASSET_PREFIXES.iter().any(|p| path.starts_with(p)) || path.contains('.') {
        return RouteClass::Asset;
    }
    RouteClass::Protected
}

#[must_use]
pub fn decide(path: &str, cookie_present: bool) -> GuardDecision {
    match classify(path) {
        RouteClass::Public | RouteClass::Asset => GuardDecision::Allow,
        RouteClass::Protected if cookie_present => GuardDecision::Allow,
        RouteClass::Protected => GuardDecision::RedirectToLogin { original_path: path.to_owned() },
    }
}

/// `/login?redirect=<path>` with the path percent-encoded.
#[must_use]
pub fn login_redirect_url(original_path: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(original_path))
}

/// Same-origin absolute path, or `/` for anything else.
#[must_use]
pub fn safe_redirect_target(target: Option<&str>) -> String {
    match target.map(str::trim) {
        Some(t) if t.starts_with('/') && !t.starts_with("//") && !t.contains('\\') => t.to_owned(),
        _ => "/".to_owned(),
    }
}

/// Axum middleware applying [`decide`] to every request.
pub async fn require_session(jar: CookieJar, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    match decide(&path, has_auth_cookie(&jar)) {
        GuardDecision::Allow => next.run(req).await,
        GuardDecision::RedirectToLogin { original_path } => {
            tracing::debug!(path = %original_path, "no session cookie; redirecting to login");
            Redirect::to(&login_redirect_url(&original_path)).into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
