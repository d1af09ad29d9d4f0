//! Auth routes: login page, OAuth redirect flow, logout, session probe, and
//! the per-request auth provider layer.

use std::sync::Arc;

use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::auth::callback::SUCCESS_REDIRECT_DELAY;
use crate::auth::{
    AuthContext, AuthProvider, AuthSnapshot, CallbackOutcome, CallbackParams, CallbackStatus, GOOGLE_PROVIDER,
    resolve_callback,
};
use crate::backend::{AuthError, OAuthGrant};
use crate::guard::{LOGIN_PATH, safe_redirect_target};
use crate::session::SessionStore;
use crate::session::cookie::{has_auth_cookie, session_from_jar};
use crate::session::mirror::{CookieMirror, SharedJar};
use crate::state::AppState;

pub const OAUTH_COOKIE_NAME: &str = "pb_oauth";
const OAUTH_COOKIE_MAX_AGE_MINUTES: i64 = 10;

// =============================================================================
// AUTH PROVIDER LAYER
// =============================================================================

/// Restore the session from `pb_auth`, mirror every change back into the
/// response cookies, and expose a mounted `AuthContext` to handlers.
pub async fn provide_auth(State(state): State<AppState>, jar: CookieJar, mut req: Request, next: Next) -> Response {
    let restored = match session_from_jar(&jar) {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "discarding undecodable auth cookie");
            None
        }
    };
    let stale_cookie = restored.is_none() && has_auth_cookie(&jar);

    let store = SessionStore::restored(Arc::clone(&state.backend), restored);
    let response_jar = SharedJar::new();
    let mirror = CookieMirror::new(Arc::new(response_jar.clone()), state.config.cookie_secure);
    let mirror_subscription = mirror.install(&store);
    if stale_cookie {
        mirror.write(None);
    }

    let provider = AuthProvider::mounted(store);
    req.extensions_mut().insert(provider.context());

    let response = next.run(req).await;

    drop(provider);
    mirror_subscription.unsubscribe();
    (response_jar.snapshot(), response).into_response()
}

// =============================================================================
// PENDING OAUTH STATE
// =============================================================================

/// Flow state carried across the provider round-trip in `pb_oauth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOAuth {
    pub provider: String,
    pub state: String,
    pub code_verifier: String,
    pub redirect: String,
}

impl PendingOAuth {
    /// Cookie value; the jar percent-encodes it on the way out.
    fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }

    fn from_jar(jar: &CookieJar) -> Option<Self> {
        let raw = jar.get(OAUTH_COOKIE_NAME)?.value();
        if raw.is_empty() {
            return None;
        }
        let json = if raw.starts_with('{') { raw.to_owned() } else { urlencoding::decode(raw).ok()?.into_owned() };
        serde_json::from_str(&json).ok()
    }
}

fn oauth_cookie(value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build()
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    redirect: Option<String>,
}

/// `GET /login`: sign-in page, or straight to the target when already signed in.
pub async fn login_page(auth: AuthContext, Query(query): Query<RedirectQuery>) -> Response {
    let target = safe_redirect_target(query.redirect.as_deref());
    if auth.is_authenticated() {
        return Redirect::to(&target).into_response();
    }
    let start = format!("/login/oauth/{GOOGLE_PROVIDER}?redirect={}", urlencoding::encode(&target));
    Html(render_login_page(&start)).into_response()
}

/// `GET /login/oauth/{provider}`: stash flow state, then hand off to the provider.
pub async fn oauth_start(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    let providers = match state.backend.list_auth_providers().await {
        Ok(providers) => providers,
        Err(e) => {
            tracing::error!(error = %e, "auth methods lookup failed");
            return (StatusCode::BAD_GATEWAY, "Sign-in is temporarily unavailable").into_response();
        }
    };
    let Some(method) = providers.into_iter().find(|p| p.name == provider) else {
        return (StatusCode::NOT_FOUND, "Unknown sign-in provider").into_response();
    };

    let pending = PendingOAuth {
        provider: method.name.clone(),
        state: method.state.clone(),
        code_verifier: method.code_verifier.clone(),
        redirect: safe_redirect_target(query.redirect.as_deref()),
    };
    let Some(value) = pending.to_json() else {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to start sign-in").into_response();
    };

    let cookie = oauth_cookie(value, Duration::minutes(OAUTH_COOKIE_MAX_AGE_MINUTES), state.config.cookie_secure);
    let url = method.authorize_url(&state.config.oauth_redirect_url());
    (CookieJar::new().add(cookie), Redirect::to(&url)).into_response()
}

/// `GET /auth/callback`: redeem the code, wait for the session, render the outcome.
pub async fn auth_callback(
    State(state): State<AppState>,
    auth: AuthContext,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let pending = PendingOAuth::from_jar(&jar);
    let target = safe_redirect_target(pending.as_ref().map(|p| p.redirect.as_str()));
    let outcome = complete_oauth(&state, &auth, pending, &params).await;

    let clear = oauth_cookie(String::new(), Duration::ZERO, state.config.cookie_secure);
    (CookieJar::new().add(clear), Html(render_callback_page(&outcome, &target))).into_response()
}

async fn complete_oauth(
    state: &AppState,
    auth: &AuthContext,
    pending: Option<PendingOAuth>,
    params: &CallbackParams,
) -> CallbackOutcome {
    if let Some(error) = params.error.as_deref() {
        let detail = params.error_description.clone().unwrap_or_else(|| error.to_owned());
        let e = AuthError::Cancelled(detail);
        tracing::warn!(error = %e, "provider returned an error");
        return CallbackOutcome::failed();
    }

    if let (Some(code), Some(pending)) = (params.code(), pending) {
        if params.state.as_deref() != Some(pending.state.as_str()) {
            tracing::warn!(provider = %pending.provider, "oauth state mismatch");
            return CallbackOutcome::failed();
        }
        let grant = OAuthGrant {
            code: code.to_owned(),
            code_verifier: pending.code_verifier,
            redirect_url: state.config.oauth_redirect_url(),
        };
        let exchanged = if pending.provider == GOOGLE_PROVIDER {
            auth.login_with_google(&grant).await
        } else {
            auth.login_with_oauth(&pending.provider, &grant).await
        };
        if exchanged.is_err() {
            return CallbackOutcome::errored();
        }
    }

    resolve_callback(auth, params, state.config.callback_delay).await
}

/// `POST /logout`
pub async fn logout(auth: AuthContext) -> Redirect {
    auth.logout();
    Redirect::to(LOGIN_PATH)
}

/// `GET /session`
pub async fn session(auth: AuthContext) -> Json<AuthSnapshot> {
    Json(auth.snapshot())
}

// =============================================================================
// PAGES
// =============================================================================

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_login_page(start_url: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>Sign in</title>\
         <link rel=\"stylesheet\" href=\"/static/app.css\"></head><body>\
         <main class=\"login\"><h1>Parts Inventory</h1>\
         <p>Sign in to manage your gears.</p>\
         <a class=\"button\" href=\"{}\">Continue with Google</a>\
         </main></body></html>",
        escape_html(start_url)
    )
}

fn render_callback_page(outcome: &CallbackOutcome, target: &str) -> String {
    let target = escape_html(target);
    let (refresh, action) = match outcome.status {
        CallbackStatus::Success => (
            format!(
                "<meta http-equiv=\"refresh\" content=\"{:.1};url={target}\">",
                SUCCESS_REDIRECT_DELAY.as_secs_f32()
            ),
            String::new(),
        ),
        CallbackStatus::Error => (String::new(), format!("<a class=\"button\" href=\"{LOGIN_PATH}\">Back to Login</a>")),
        CallbackStatus::Loading => (String::new(), String::new()),
    };
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">{refresh}<title>Signing in</title></head>\
         <body><main class=\"callback\" data-status=\"{}\"><p>{}</p>{action}</main></body></html>",
        outcome.status.as_str(),
        escape_html(outcome.message),
    )
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
