//! `pb_auth` cookie payload and builders.
//!
//! The value is percent-encoded JSON `{"v":1,"token":...,"model":{...}}`.
//! Cookies carry the raw JSON; the single percent-encoding step happens when
//! the jar is written to `Set-Cookie` and is undone when a request is parsed.
//! Payloads without `v` predate versioning and decode as version 1.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::Session;
use crate::backend::UserRecord;

pub const AUTH_COOKIE_NAME: &str = "pb_auth";
/// Seven days.
pub const AUTH_COOKIE_MAX_AGE_SECS: i64 = 604_800;
pub const COOKIE_FORMAT_VERSION: u8 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    #[error("cookie value is empty")]
    Empty,
    #[error("cookie value is not valid percent-encoding: {0}")]
    Encoding(String),
    #[error("cookie payload is not valid JSON: {0}")]
    Json(String),
    #[error("unsupported cookie format version {0}")]
    UnsupportedVersion(u8),
    #[error("cookie payload carries an empty token")]
    MissingToken,
}

/// Serialized `{token, model}` pair carried by the auth cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCookie {
    #[serde(rename = "v", default = "legacy_version")]
    pub version: u8,
    pub token: String,
    pub model: UserRecord,
}

fn legacy_version() -> u8 {
    1
}

impl AuthCookie {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        Self { version: COOKIE_FORMAT_VERSION, token: session.token.clone(), model: session.user.clone() }
    }

    #[must_use]
    pub fn into_session(self) -> Session {
        Session { token: self.token, user: self.model }
    }

    /// Plain JSON payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn to_json(&self) -> Result<String, CookieError> {
        serde_json::to_string(self).map_err(|e| CookieError::Json(e.to_string()))
    }

    /// Percent-encoded JSON, as it appears on the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, CookieError> {
        Ok(urlencoding::encode(&self.to_json()?).into_owned())
    }

    /// Inverse of [`AuthCookie::encode`]. Also accepts a value whose
    /// percent-encoding was already undone by the cookie parser.
    ///
    /// # Errors
    ///
    /// Returns an error for empty, malformed, unversioned-future, or token-less values.
    pub fn decode(raw: &str) -> Result<Self, CookieError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(CookieError::Empty);
        }
        let json = if raw.starts_with('{') {
            raw.to_owned()
        } else {
            urlencoding::decode(raw)
                .map_err(|e| CookieError::Encoding(e.to_string()))?
                .into_owned()
        };
        let cookie: Self = serde_json::from_str(&json).map_err(|e| CookieError::Json(e.to_string()))?;
        if cookie.version != COOKIE_FORMAT_VERSION {
            return Err(CookieError::UnsupportedVersion(cookie.version));
        }
        if cookie.token.is_empty() {
            return Err(CookieError::MissingToken);
        }
        Ok(cookie)
    }
}

/// `pb_auth` cookie mirroring a live session.
///
/// # Errors
///
/// Returns an error if the session cannot be serialized.
pub fn session_cookie(session: &Session, secure: bool) -> Result<Cookie<'static>, CookieError> {
    let value = AuthCookie::from_session(session).to_json()?;
    Ok(Cookie::build((AUTH_COOKIE_NAME, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::seconds(AUTH_COOKIE_MAX_AGE_SECS))
        .build())
}

/// Empty `pb_auth` cookie with `max-age=0`, deleting any stored copy.
#[must_use]
pub fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

/// Whether the request carries a non-empty auth cookie. Contents are not inspected.
#[must_use]
pub fn has_auth_cookie(jar: &CookieJar) -> bool {
    jar.get(AUTH_COOKIE_NAME)
        .is_some_and(|c| !c.value().trim().is_empty())
}

/// Session carried by the request's auth cookie. `Ok(None)` when no cookie is present.
///
/// # Errors
///
/// Returns an error if a cookie is present but cannot be decoded.
pub fn session_from_jar(jar: &CookieJar) -> Result<Option<Session>, CookieError> {
    match jar.get(AUTH_COOKIE_NAME).map(Cookie::value) {
        None | Some("") => Ok(None),
        Some(raw) => AuthCookie::decode(raw).map(|c| Some(c.into_session())),
    }
}

#[cfg(test)]
#[path = "cookie_test.rs"]
mod tests;
