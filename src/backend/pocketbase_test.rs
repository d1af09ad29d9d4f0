use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::inventory::BoreType;

fn client_for(server: &MockServer) -> PocketBaseClient {
    PocketBaseClient::new(&server.uri(), BackendTimeouts { request_secs: 5, connect_secs: 2 }).unwrap()
}

fn gear_json(id: &str, quantity: u32) -> serde_json::Value {
    json!({
        "id": id,
        "collectionId": "pbc_gears",
        "name": format!("Gear {id}"),
        "bore_type": "hex",
        "bore_size": "1/2",
        "diametral_pitch": 20,
        "teeth": 48,
        "material": "Aluminum",
        "quantity": quantity,
        "owner": "u1",
        "created": "2025-01-01 00:00:00.000Z",
        "updated": "2025-01-02 00:00:00.000Z"
    })
}

fn grant() -> OAuthGrant {
    OAuthGrant {
        code: "abc".into(),
        code_verifier: "verifier".into(),
        redirect_url: "http://localhost:3000/auth/callback".into(),
    }
}

// =============================================================================
// parsing helpers
// =============================================================================

#[test]
fn parse_auth_methods_current_layout() {
    let body = json!({
        "oauth2": {
            "enabled": true,
            "providers": [{
                "name": "google",
                "displayName": "Google",
                "state": "s1",
                "authURL": "https://accounts.google.com/o/oauth2/auth?client_id=x&redirect_uri=",
                "codeVerifier": "v1",
                "codeChallenge": "c1"
            }]
        }
    });
    let providers = parse_auth_methods(&body.to_string()).unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0].name, "google");
    assert_eq!(providers[0].display_name, "Google");
    assert_eq!(providers[0].code_verifier, "v1");
}

#[test]
fn parse_auth_methods_legacy_layout() {
    let body = json!({
        "usernamePassword": false,
        "authProviders": [{
            "name": "google",
            "state": "s2",
            "authUrl": "https://accounts.google.com/o/oauth2/auth?redirect_uri=",
            "codeVerifier": "v2"
        }]
    });
    let providers = parse_auth_methods(&body.to_string()).unwrap();
    assert_eq!(providers[0].state, "s2");
    assert!(providers[0].auth_url.ends_with("redirect_uri="));
}

#[test]
fn parse_auth_methods_rejects_garbage() {
    assert!(matches!(parse_auth_methods("not json"), Err(NetworkError::Parse(_))));
}

#[test]
fn error_message_prefers_message_field() {
    assert_eq!(error_message(r#"{"status":400,"message":"Failed to authenticate.","data":{}}"#), "Failed to authenticate.");
    assert_eq!(error_message("  bad gateway \n"), "bad gateway");
}

#[test]
fn owner_filter_escapes_quotes() {
    assert_eq!(owner_filter("u1"), r#"owner = "u1""#);
    assert_eq!(owner_filter(r#"a"b"#), r#"owner = "a\"b""#);
}

// =============================================================================
// HTTP round-trips
// =============================================================================

#[tokio::test]
async fn auth_with_oauth2_returns_token_and_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-oauth2"))
        .and(body_json(json!({
            "provider": "google",
            "code": "abc",
            "codeVerifier": "verifier",
            "redirectURL": "http://localhost:3000/auth/callback"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt-token",
            "record": { "id": "u1", "email": "ada@example.com", "name": "Ada", "avatar": "", "collectionId": "_pb_users_auth_" },
            "meta": { "isNew": false }
        })))
        .mount(&server)
        .await;

    let auth = client_for(&server).auth_with_oauth2("google", &grant()).await.unwrap();
    assert_eq!(auth.token, "jwt-token");
    assert_eq!(auth.record.email, "ada@example.com");
    assert_eq!(auth.record.avatar_ref, None);
}

#[tokio::test]
async fn auth_with_oauth2_bad_request_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-oauth2"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "status": 400, "message": "Failed to authenticate.", "data": {} })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).auth_with_oauth2("google", &grant()).await.unwrap_err();
    assert_eq!(err, AuthError::Rejected("Failed to authenticate.".into()));
}

#[tokio::test]
async fn auth_with_oauth2_server_error_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/collections/users/auth-with-oauth2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server).auth_with_oauth2("google", &grant()).await.unwrap_err();
    assert_eq!(err, AuthError::Network(NetworkError::Status { status: 503, message: "maintenance".into() }));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    // Nothing listens on a port that was bound and released.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let uri = format!("http://127.0.0.1:{port}");
    let client = PocketBaseClient::new(&uri, BackendTimeouts { request_secs: 2, connect_secs: 1 }).unwrap();
    let err = client.auth_with_oauth2("google", &grant()).await.unwrap_err();
    assert!(matches!(err, AuthError::Network(NetworkError::Unreachable(_))), "got {err:?}");
}

#[tokio::test]
async fn list_gears_follows_pages_with_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collections/gears/records"))
        .and(header("Authorization", "tok"))
        .and(query_param("page", "1"))
        .and(query_param("filter", r#"owner = "u1""#))
        .and(query_param("sort", "-updated"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1, "perPage": 200, "totalItems": 2, "totalPages": 2,
            "items": [gear_json("g1", 5)]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/collections/gears/records"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 2, "perPage": 200, "totalItems": 2, "totalPages": 2,
            "items": [gear_json("g2", 0)]
        })))
        .mount(&server)
        .await;

    let gears = client_for(&server).list_gears("tok", "u1", "-updated").await.unwrap();
    let ids: Vec<&str> = gears.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, ["g1", "g2"]);
    assert_eq!(gears[0].bore_type, BoreType::Hex);
}

#[tokio::test]
async fn list_gears_expired_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/collections/gears/records"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "status": 401, "message": "The request requires valid record authorization token." })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).list_gears("stale", "u1", "-updated").await.unwrap_err();
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn create_gear_sends_owner_with_form() {
    let server = MockServer::start().await;
    let form = GearFormData { name: "Drive".into(), ..GearFormData::default() };
    Mock::given(method("POST"))
        .and(path("/api/collections/gears/records"))
        .and(body_json(json!({
            "name": "Drive",
            "bore_type": "hex",
            "bore_size": "1/2",
            "diametral_pitch": 20,
            "teeth": 48,
            "material": "Aluminum",
            "quantity": 1,
            "owner": "u1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(gear_json("g9", 1)))
        .mount(&server)
        .await;

    let gear = client_for(&server).create_gear("tok", "u1", &form).await.unwrap();
    assert_eq!(gear.id, "g9");
}

#[tokio::test]
async fn delete_gear_accepts_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/collections/gears/records/g1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    client_for(&server).delete_gear("tok", "g1").await.unwrap();
}
