use axum::http::{HeaderMap, HeaderValue, header};

use super::*;
use crate::state::test_helpers::{test_session, test_user};

fn jar_with(cookie_header: &str) -> CookieJar {
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(cookie_header).unwrap());
    CookieJar::from_headers(&headers)
}

// =============================================================================
// payload codec
// =============================================================================

#[test]
fn encode_decode_recovers_session() {
    let session = test_session();
    let encoded = AuthCookie::from_session(&session).encode().unwrap();
    let decoded = AuthCookie::decode(&encoded).unwrap();
    assert_eq!(decoded.into_session(), session);
}

#[test]
fn encoded_value_is_cookie_safe() {
    let encoded = AuthCookie::from_session(&test_session()).encode().unwrap();
    assert!(
        !encoded.contains(['"', ',', ';', ' ', '{']),
        "encoded value must not carry raw JSON punctuation: {encoded}"
    );
}

#[test]
fn wire_shape_has_token_and_model() {
    let encoded = AuthCookie::from_session(&test_session()).encode().unwrap();
    let json: serde_json::Value = serde_json::from_str(&urlencoding::decode(&encoded).unwrap()).unwrap();
    assert_eq!(json["v"], 1);
    assert_eq!(json["token"], "valid-token");
    assert_eq!(json["model"]["id"], "u1");
    assert_eq!(json["model"]["email"], "ada@example.com");
}

#[test]
fn decode_accepts_unversioned_payload() {
    let raw = r#"{"token":"t","model":{"id":"u1","email":"a@b.c"}}"#;
    let cookie = AuthCookie::decode(&urlencoding::encode(raw)).unwrap();
    assert_eq!(cookie.version, 1);
    assert_eq!(cookie.model.id, "u1");
}

#[test]
fn decode_accepts_already_decoded_json() {
    let raw = r#"{"v":1,"token":"t","model":{"id":"u1","email":"a@b.c"}}"#;
    assert_eq!(AuthCookie::decode(raw).unwrap().token, "t");
}

#[test]
fn decode_rejects_bad_values() {
    assert_eq!(AuthCookie::decode("  "), Err(CookieError::Empty));
    assert!(matches!(AuthCookie::decode("not-json"), Err(CookieError::Json(_))));

    let future = urlencoding::encode(r#"{"v":9,"token":"t","model":{"id":"u1"}}"#).into_owned();
    assert_eq!(AuthCookie::decode(&future), Err(CookieError::UnsupportedVersion(9)));

    let no_token = urlencoding::encode(r#"{"v":1,"token":"","model":{"id":"u1"}}"#).into_owned();
    assert_eq!(AuthCookie::decode(&no_token), Err(CookieError::MissingToken));
}

// =============================================================================
// cookie builders
// =============================================================================

#[test]
fn session_cookie_attributes() {
    let cookie = session_cookie(&test_session(), false).unwrap();
    assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    assert_eq!(cookie.max_age(), Some(Duration::seconds(604_800)));
    assert_eq!(cookie.secure(), Some(false));
    assert!(!cookie.value().is_empty());
}

#[test]
fn session_cookie_carries_plain_json() {
    let cookie = session_cookie(&test_session(), false).unwrap();
    let json: serde_json::Value = serde_json::from_str(cookie.value()).unwrap();
    assert_eq!(json["token"], "valid-token");
    assert_eq!(AuthCookie::decode(cookie.value()).unwrap().into_session(), test_session());
}

#[test]
fn cleared_cookie_expires_immediately() {
    let cookie = cleared_cookie(true);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.secure(), Some(true));
}

// =============================================================================
// request jar
// =============================================================================

#[test]
fn jar_without_cookie_has_no_session() {
    let jar = jar_with("theme=dark");
    assert!(!has_auth_cookie(&jar));
    assert_eq!(session_from_jar(&jar), Ok(None));
}

#[test]
fn jar_with_empty_cookie_counts_as_absent() {
    let jar = jar_with("pb_auth=");
    assert!(!has_auth_cookie(&jar));
    assert_eq!(session_from_jar(&jar), Ok(None));
}

#[test]
fn jar_round_trip_through_header() {
    let encoded = AuthCookie::from_session(&test_session()).encode().unwrap();
    let jar = jar_with(&format!("theme=dark; pb_auth={encoded}"));
    assert!(has_auth_cookie(&jar));
    let session = session_from_jar(&jar).unwrap().unwrap();
    assert_eq!(session.user, test_user());
}

#[test]
fn jar_with_garbage_is_present_but_undecodable() {
    let jar = jar_with("pb_auth=garbage");
    assert!(has_auth_cookie(&jar));
    assert!(session_from_jar(&jar).is_err());
}
