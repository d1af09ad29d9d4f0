use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};

use super::*;
use crate::auth::callback::{ERROR_MESSAGE, FAILED_MESSAGE, SUCCESS_MESSAGE};
use crate::routes::app;
use crate::state::test_helpers::{FakeRecordStore, TestResponse, send, test_app_state};

fn pending(redirect: &str) -> PendingOAuth {
    PendingOAuth {
        provider: "google".into(),
        state: "state-123".into(),
        code_verifier: "verifier-123".into(),
        redirect: redirect.into(),
    }
}

async fn callback(fake: Arc<FakeRecordStore>, query: &str, pending: Option<&PendingOAuth>) -> TestResponse {
    let mut builder = Request::builder().uri(format!("/auth/callback{query}"));
    if let Some(pending) = pending {
        let value = urlencoding::encode(&pending.to_json().unwrap()).into_owned();
        builder = builder.header(header::COOKIE, format!("{OAUTH_COOKIE_NAME}={value}"));
    }
    send(app(test_app_state(fake)), builder.body(Body::empty()).unwrap()).await
}

#[test]
fn escape_html_covers_markup() {
    assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
}

#[test]
fn pending_state_round_trips_through_jar() {
    let value = pending("/gears").to_json().unwrap();
    let jar = CookieJar::new().add(Cookie::new(OAUTH_COOKIE_NAME, value));
    assert_eq!(PendingOAuth::from_jar(&jar), Some(pending("/gears")));
}

// =============================================================================
// oauth start
// =============================================================================

#[tokio::test]
async fn oauth_start_redirects_to_provider() {
    let req = Request::builder().uri("/login/oauth/google?redirect=/gears").body(Body::empty()).unwrap();
    let res = send(app(test_app_state(Arc::new(FakeRecordStore::new()))), req).await;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(
        res.location(),
        Some("https://accounts.example.com/auth?client_id=pb&redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback")
    );
    let cookies = res.set_cookies(OAUTH_COOKIE_NAME);
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].contains("HttpOnly"));
    assert!(cookies[0].contains("Max-Age=600"));
}

#[tokio::test]
async fn oauth_start_unknown_provider_is_not_found() {
    let req = Request::builder().uri("/login/oauth/myspace").body(Body::empty()).unwrap();
    let res = send(app(test_app_state(Arc::new(FakeRecordStore::new()))), req).await;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// callback
// =============================================================================

#[tokio::test]
async fn callback_exchanges_code_and_sets_session_cookie() {
    let fake = Arc::new(FakeRecordStore::new());
    let res = callback(fake.clone(), "?code=abc&state=state-123", Some(&pending("/gears"))).await;

    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains(SUCCESS_MESSAGE));
    assert!(res.body.contains("url=/gears"), "{}", res.body);

    let auth = res.set_cookies("pb_auth");
    assert_eq!(auth.len(), 1);
    assert!(!auth[0].starts_with("pb_auth=;"));
    assert!(res.set_cookies(OAUTH_COOKIE_NAME)[0].contains("Max-Age=0"));

    let grants = fake.grants.lock().unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].0, "google");
    assert_eq!(grants[0].1.code, "abc");
    assert_eq!(grants[0].1.code_verifier, "verifier-123");
    assert_eq!(grants[0].1.redirect_url, "http://localhost:3000/auth/callback");
}

#[tokio::test]
async fn session_cookie_is_encoded_once_on_the_wire() {
    let res = callback(Arc::new(FakeRecordStore::new()), "?code=abc&state=state-123", Some(&pending("/"))).await;

    let header = res.set_cookies("pb_auth").pop().unwrap();
    let value = header.split(';').next().unwrap().strip_prefix("pb_auth=").unwrap();
    let decoded = urlencoding::decode(value).unwrap();
    let json: serde_json::Value = serde_json::from_str(&decoded).unwrap();

    assert_eq!(json["v"], 1);
    assert_eq!(json["token"], "valid-token");
    assert_eq!(json["model"]["id"], "u1");
}

#[tokio::test]
async fn oauth_cookie_is_encoded_once_on_the_wire() {
    let req = Request::builder().uri("/login/oauth/google?redirect=/gears").body(Body::empty()).unwrap();
    let res = send(app(test_app_state(Arc::new(FakeRecordStore::new()))), req).await;

    let header = res.set_cookies(OAUTH_COOKIE_NAME).pop().unwrap();
    let value = header.split(';').next().unwrap().strip_prefix("pb_oauth=").unwrap();
    let decoded: PendingOAuth = serde_json::from_str(&urlencoding::decode(value).unwrap()).unwrap();

    assert_eq!(decoded, pending("/gears"));
}

#[tokio::test]
async fn callback_rejects_state_mismatch() {
    let fake = Arc::new(FakeRecordStore::new());
    let res = callback(fake.clone(), "?code=abc&state=forged", Some(&pending("/"))).await;

    assert!(res.body.contains(FAILED_MESSAGE));
    assert!(res.body.contains("Back to Login"));
    assert!(res.set_cookies("pb_auth").is_empty());
    assert!(fake.grants.lock().unwrap().is_empty());
}

#[tokio::test]
async fn callback_provider_error_fails() {
    let res = callback(Arc::new(FakeRecordStore::new()), "?error=access_denied", Some(&pending("/"))).await;

    assert!(res.body.contains(FAILED_MESSAGE));
}

#[tokio::test]
async fn callback_exchange_failure_is_error() {
    let fake = Arc::new(FakeRecordStore::failing_login(AuthError::Rejected("bad code".into())));
    let res = callback(fake, "?code=abc&state=state-123", Some(&pending("/"))).await;

    assert!(res.body.contains(ERROR_MESSAGE));
    assert!(res.set_cookies("pb_auth").is_empty());
}

#[tokio::test]
async fn callback_without_pending_state_trusts_code() {
    let res = callback(Arc::new(FakeRecordStore::new()), "?code=abc", None).await;

    assert!(res.body.contains(SUCCESS_MESSAGE));
    assert!(res.body.contains("url=/\""), "{}", res.body);
}

#[tokio::test]
async fn callback_without_code_or_session_fails() {
    let res = callback(Arc::new(FakeRecordStore::new()), "", None).await;

    assert!(res.body.contains(FAILED_MESSAGE));
}
