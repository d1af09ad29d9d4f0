//! Record store types: identities, OAuth metadata, errors, and the client trait.

use serde::{Deserialize, Serialize};

use crate::inventory::{Gear, GearFormData};

// =============================================================================
// ERRORS
// =============================================================================

/// The record store could not be reached or answered with a failure status.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NetworkError {
    /// The HTTP request never produced a response.
    #[error("record store unreachable: {0}")]
    Unreachable(String),

    /// The record store answered with a non-success status.
    #[error("record store returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be decoded.
    #[error("record store response parse failed: {0}")]
    Parse(String),
}

impl NetworkError {
    /// Whether the record store refused the credential attached to the call.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }
}

/// Login failures surfaced to whoever started the OAuth flow.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AuthError {
    /// The user (or provider) abandoned the flow before a code was issued.
    #[error("oauth flow cancelled: {0}")]
    Cancelled(String),

    /// The provider or record store refused the grant.
    #[error("oauth flow rejected: {0}")]
    Rejected(String),

    /// The code exchange could not reach the record store.
    #[error(transparent)]
    Network(#[from] NetworkError),
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Identity record issued by the auth provider. Never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Avatar file name inside the users collection.
    #[serde(rename = "avatar", default, skip_serializing_if = "Option::is_none", deserialize_with = "empty_as_none")]
    pub avatar_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_id: Option<String>,
}

impl UserRecord {
    /// Thumbnail URL for the avatar file, if the record carries one.
    #[must_use]
    pub fn avatar_url(&self, base_url: &str) -> Option<String> {
        let file = self.avatar_ref.as_deref()?;
        let collection = self.collection_id.as_deref().unwrap_or("users");
        Some(format!(
            "{base_url}/api/files/{collection}/{}/{}?thumb=100x100",
            urlencoding::encode(&self.id),
            urlencoding::encode(file)
        ))
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Successful authentication: credential plus the identity it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthRecord {
    pub token: String,
    pub record: UserRecord,
}

// =============================================================================
// OAUTH
// =============================================================================

/// Provider entry advertised by the record store's auth-methods endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthProvider {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub state: String,
    #[serde(rename = "authURL", alias = "authUrl")]
    pub auth_url: String,
    pub code_verifier: String,
}

impl OAuthProvider {
    /// Provider authorization URL with our callback appended as `redirect_uri`.
    ///
    /// The record store hands out URLs ending in `redirect_uri=`.
    #[must_use]
    pub fn authorize_url(&self, redirect_url: &str) -> String {
        let encoded = urlencoding::encode(redirect_url);
        if self.auth_url.ends_with("redirect_uri=") {
            format!("{}{encoded}", self.auth_url)
        } else if self.auth_url.contains('?') {
            format!("{}&redirect_uri={encoded}", self.auth_url)
        } else {
            format!("{}?redirect_uri={encoded}", self.auth_url)
        }
    }
}

/// Authorization code plus the PKCE verifier needed to redeem it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthGrant {
    pub code: String,
    pub code_verifier: String,
    pub redirect_url: String,
}

// =============================================================================
// CLIENT TRAIT
// =============================================================================

/// Everything this service asks of the hosted record store.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// OAuth providers enabled on the users collection.
    async fn list_auth_providers(&self) -> Result<Vec<OAuthProvider>, NetworkError>;

    /// Redeem an authorization code for a session.
    async fn auth_with_oauth2(&self, provider: &str, grant: &OAuthGrant) -> Result<AuthRecord, AuthError>;

    /// Every gear owned by `owner`, ordered by `sort`.
    async fn list_gears(&self, token: &str, owner: &str, sort: &str) -> Result<Vec<Gear>, NetworkError>;

    async fn create_gear(&self, token: &str, owner: &str, form: &GearFormData) -> Result<Gear, NetworkError>;

    async fn update_gear(&self, token: &str, id: &str, form: &GearFormData) -> Result<Gear, NetworkError>;

    async fn delete_gear(&self, token: &str, id: &str) -> Result<(), NetworkError>;
}
