//! OAuth callback resolution.
//!
//! The code exchange and the context's change listener may race, so after a
//! fixed propagation delay the context is re-read directly. If the session is
//! still absent, a `code` query parameter is taken as a sign the exchange is
//! likely to have succeeded.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AuthContext;

pub const PROCESSING_MESSAGE: &str = "Processing authentication...";
pub const SUCCESS_MESSAGE: &str = "Authentication successful! Redirecting...";
pub const FAILED_MESSAGE: &str = "Authentication failed. Please try again.";
pub const ERROR_MESSAGE: &str = "An error occurred during authentication.";

/// Delay before a success page forwards to its target.
pub const SUCCESS_REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Query string the provider appends to the callback URL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Non-blank authorization code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref().filter(|c| !c.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackStatus {
    Loading,
    Success,
    Error,
}

impl CallbackStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// What the callback page shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackOutcome {
    pub status: CallbackStatus,
    pub message: &'static str,
}

impl CallbackOutcome {
    #[must_use]
    pub fn loading() -> Self {
        Self { status: CallbackStatus::Loading, message: PROCESSING_MESSAGE }
    }

    #[must_use]
    pub fn success() -> Self {
        Self { status: CallbackStatus::Success, message: SUCCESS_MESSAGE }
    }

    #[must_use]
    pub fn failed() -> Self {
        Self { status: CallbackStatus::Error, message: FAILED_MESSAGE }
    }

    /// The exchange itself blew up.
    #[must_use]
    pub fn errored() -> Self {
        Self { status: CallbackStatus::Error, message: ERROR_MESSAGE }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == CallbackStatus::Success
    }
}

/// Wait `delay`, re-read the session, and decide the final page state.
pub async fn resolve_callback(auth: &AuthContext, params: &CallbackParams, delay: Duration) -> CallbackOutcome {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    auth.refresh_user();

    if auth.is_authenticated() {
        return CallbackOutcome::success();
    }
    if params.code().is_some() {
        tracing::debug!("session not yet visible; trusting authorization code");
        return CallbackOutcome::success();
    }
    CallbackOutcome::failed()
}

#[cfg(test)]
#[path = "callback_test.rs"]
mod tests;
