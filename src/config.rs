//! Service configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Parsing goes through a lookup closure so tests can feed a fixed map instead
//! of mutating the process environment.

use std::time::Duration;

pub const DEFAULT_POCKETBASE_URL: &str = "http://127.0.0.1:8090";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:3000";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_CALLBACK_DELAY_MS: u64 = 1000;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_STATIC_DIR: &str = "static";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Record store base URL, without a trailing slash.
    pub pocketbase_url: String,
    /// Externally visible origin of this service.
    pub public_url: String,
    pub port: u16,
    pub cookie_secure: bool,
    /// Wait applied by the OAuth callback page before re-reading the session.
    pub callback_delay: Duration,
    pub timeouts: BackendTimeouts,
    pub static_dir: String,
}

impl AppConfig {
    /// Build typed config from the process environment.
    ///
    /// Optional:
    /// - `POCKETBASE_URL`: default `http://127.0.0.1:8090`
    /// - `PUBLIC_URL`: default `http://localhost:3000`
    /// - `PORT`: default 3000
    /// - `COOKIE_SECURE`: inferred from `PUBLIC_URL` when unset
    /// - `OAUTH_CALLBACK_DELAY_MS`: default 1000
    /// - `BACKEND_TIMEOUT_SECS`: default 10
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 5
    /// - `STATIC_DIR`: default `static`
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build typed config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL variable is not an http(s) URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pocketbase_url = parse_url("POCKETBASE_URL", lookup("POCKETBASE_URL"), DEFAULT_POCKETBASE_URL)?;
        let public_url = parse_url("PUBLIC_URL", lookup("PUBLIC_URL"), DEFAULT_PUBLIC_URL)?;
        let cookie_secure = lookup("COOKIE_SECURE")
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or_else(|| public_url.starts_with("https://"));

        Ok(Self {
            pocketbase_url,
            port: parse_or(lookup("PORT"), DEFAULT_PORT),
            cookie_secure,
            callback_delay: Duration::from_millis(parse_or(
                lookup("OAUTH_CALLBACK_DELAY_MS"),
                DEFAULT_CALLBACK_DELAY_MS,
            )),
            timeouts: BackendTimeouts {
                request_secs: parse_or(lookup("BACKEND_TIMEOUT_SECS"), DEFAULT_BACKEND_TIMEOUT_SECS),
                connect_secs: parse_or(lookup("BACKEND_CONNECT_TIMEOUT_SECS"), DEFAULT_BACKEND_CONNECT_TIMEOUT_SECS),
            },
            static_dir: lookup("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_owned()),
            public_url,
        })
    }

    /// Absolute URL the OAuth provider sends the browser back to.
    #[must_use]
    pub fn oauth_redirect_url(&self) -> String {
        format!("{}/auth/callback", self.public_url)
    }
}

/// Parse a loose boolean flag (`1/true/yes/on`, `0/false/no/off`).
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn parse_url(var: &'static str, raw: Option<String>, default: &str) -> Result<String, ConfigError> {
    let value = raw.unwrap_or_else(|| default.to_owned());
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidUrl { var, value });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
