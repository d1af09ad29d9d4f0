//! PocketBase REST client.
//!
//! Thin HTTP wrapper over the users auth endpoints and the `gears` collection.
//! Response decoding lives in free functions so it can be tested without a
//! server.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{AuthError, AuthRecord, NetworkError, OAuthGrant, OAuthProvider, RecordStore};
use crate::config::BackendTimeouts;
use crate::inventory::{Gear, GearFormData};

const USERS: &str = "users";
const GEARS: &str = "gears";
const PAGE_SIZE: u32 = 200;

// =============================================================================
// CLIENT
// =============================================================================

pub struct PocketBaseClient {
    http: reqwest::Client,
    base_url: String,
}

impl PocketBaseClient {
    /// Build a client for the record store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: BackendTimeouts) -> Result<Self, NetworkError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    fn collection_url(&self, collection: &str, suffix: &str) -> String {
        format!("{}/api/collections/{collection}/{suffix}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, NetworkError> {
        let response = request
            .send()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| NetworkError::Unreachable(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(NetworkError::Status { status, message: error_message(&text) });
        }
        Ok(text)
    }
}

#[async_trait::async_trait]
impl RecordStore for PocketBaseClient {
    async fn list_auth_providers(&self) -> Result<Vec<OAuthProvider>, NetworkError> {
        let text = self
            .send(self.http.get(self.collection_url(USERS, "auth-methods")))
            .await?;
        parse_auth_methods(&text)
    }

    async fn auth_with_oauth2(&self, provider: &str, grant: &OAuthGrant) -> Result<AuthRecord, AuthError> {
        let body = OAuthExchange {
            provider,
            code: &grant.code,
            code_verifier: &grant.code_verifier,
            redirect_url: &grant.redirect_url,
        };
        let request = self
            .http
            .post(self.collection_url(USERS, "auth-with-oauth2"))
            .json(&body);

        match self.send(request).await {
            Ok(text) => serde_json::from_str(&text).map_err(|e| NetworkError::Parse(e.to_string()).into()),
            Err(NetworkError::Status { status: 400 | 401 | 403, message }) => Err(AuthError::Rejected(message)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_gears(&self, token: &str, owner: &str, sort: &str) -> Result<Vec<Gear>, NetworkError> {
        let filter = owner_filter(owner);
        let mut gears = Vec::new();
        let mut page = 1u32;
        loop {
            let request = self
                .http
                .get(self.collection_url(GEARS, "records"))
                .header("Authorization", token)
                .query(&[
                    ("page", page.to_string()),
                    ("perPage", PAGE_SIZE.to_string()),
                    ("filter", filter.clone()),
                    ("sort", sort.to_owned()),
                ]);
            let text = self.send(request).await?;
            let list: ListPage<Gear> = serde_json::from_str(&text).map_err(|e| NetworkError::Parse(e.to_string()))?;
            let last = list.items.is_empty() || list.page >= list.total_pages;
            gears.extend(list.items);
            if last {
                break;
            }
            page += 1;
        }
        Ok(gears)
    }

    async fn create_gear(&self, token: &str, owner: &str, form: &GearFormData) -> Result<Gear, NetworkError> {
        let request = self
            .http
            .post(self.collection_url(GEARS, "records"))
            .header("Authorization", token)
            .json(&OwnedGear { form, owner });
        let text = self.send(request).await?;
        serde_json::from_str(&text).map_err(|e| NetworkError::Parse(e.to_string()))
    }

    async fn update_gear(&self, token: &str, id: &str, form: &GearFormData) -> Result<Gear, NetworkError> {
        let url = self.collection_url(GEARS, &format!("records/{}", urlencoding::encode(id)));
        let request = self.http.patch(url).header("Authorization", token).json(form);
        let text = self.send(request).await?;
        serde_json::from_str(&text).map_err(|e| NetworkError::Parse(e.to_string()))
    }

    async fn delete_gear(&self, token: &str, id: &str) -> Result<(), NetworkError> {
        let url = self.collection_url(GEARS, &format!("records/{}", urlencoding::encode(id)));
        self.send(self.http.delete(url).header("Authorization", token))
            .await?;
        Ok(())
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OAuthExchange<'a> {
    provider: &'a str,
    code: &'a str,
    code_verifier: &'a str,
    #[serde(rename = "redirectURL")]
    redirect_url: &'a str,
}

#[derive(Serialize)]
struct OwnedGear<'a> {
    #[serde(flatten)]
    form: &'a GearFormData,
    owner: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage<T> {
    page: u32,
    total_pages: u32,
    items: Vec<T>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AuthMethods {
    #[serde(default)]
    oauth2: Option<OAuth2Methods>,
    #[serde(default)]
    auth_providers: Vec<OAuthProvider>,
}

#[derive(Deserialize)]
struct OAuth2Methods {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    providers: Vec<OAuthProvider>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// =============================================================================
// PARSING
// =============================================================================

/// Decode the auth-methods payload, accepting both the `oauth2.providers`
/// layout and the older flat `authProviders` list.
pub(crate) fn parse_auth_methods(json: &str) -> Result<Vec<OAuthProvider>, NetworkError> {
    let methods: AuthMethods = serde_json::from_str(json).map_err(|e| NetworkError::Parse(e.to_string()))?;
    match methods.oauth2 {
        Some(oauth2) if oauth2.enabled || !oauth2.providers.is_empty() => Ok(oauth2.providers),
        _ => Ok(methods.auth_providers),
    }
}

/// Best-effort human message from an error body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_owned())
}

/// Record filter restricting a listing to one owner.
pub(crate) fn owner_filter(owner: &str) -> String {
    let escaped = owner.replace('\\', "\\\\").replace('"', "\\\"");
    format!("owner = \"{escaped}\"")
}

#[cfg(test)]
#[path = "pocketbase_test.rs"]
mod tests;
