//! Auth context: reactive `{user, isAuthenticated, isLoading}` view over a
//! session store, plus the login/logout/refresh actions.
//!
//! DESIGN
//! ======
//! `AuthProvider` owns the store subscription; `AuthContext` is the cheap
//! clonable handle handed to consumers. The context starts in `Loading`,
//! moves to `Authenticated`/`Unauthenticated` once on mount, then follows
//! every store change until the provider is dropped.
//!
//! The context listener and the cookie mirror are independent subscribers of
//! the same store and share no state, so either may run first.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{Extensions, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::backend::{AuthError, OAuthGrant, UserRecord};
use crate::session::{SessionStore, Subscription};

pub const GOOGLE_PROVIDER: &str = "google";

/// The context was requested outside an auth provider's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("auth context used outside an auth provider")]
pub struct ConfigurationError;

impl IntoResponse for ConfigurationError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "handler mounted without auth provider layer");
        (StatusCode::INTERNAL_SERVER_ERROR, "auth provider not configured").into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthStatus {
    Loading,
    Authenticated,
    Unauthenticated,
}

/// Raw local state tracked by the context.
#[derive(Clone, Debug, Default)]
pub struct AuthState {
    pub user: Option<UserRecord>,
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn status(&self) -> AuthStatus {
        match (&self.user, self.loading) {
            (_, true) => AuthStatus::Loading,
            (Some(_), false) => AuthStatus::Authenticated,
            (None, false) => AuthStatus::Unauthenticated,
        }
    }
}

/// Serializable view handed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
    pub user: Option<UserRecord>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

// =============================================================================
// CONTEXT
// =============================================================================

#[derive(Clone)]
pub struct AuthContext {
    store: SessionStore,
    state: Arc<Mutex<AuthState>>,
}

impl AuthContext {
    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_user(&self, user: Option<UserRecord>) {
        self.lock().user = user;
    }

    /// Context installed by the enclosing provider.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` when no provider placed a context in `extensions`.
    pub fn from_extensions(extensions: &Extensions) -> Result<Self, ConfigurationError> {
        extensions.get::<Self>().cloned().ok_or(ConfigurationError)
    }

    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        self.lock().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().user.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    #[must_use]
    pub fn status(&self) -> AuthStatus {
        self.lock().status()
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        let state = self.lock();
        AuthSnapshot { user: state.user.clone(), is_authenticated: state.user.is_some(), is_loading: state.loading }
    }

    /// Session store backing this context.
    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Redeem a Google authorization code. The local user is updated from the
    /// returned record without waiting for the store's change event.
    ///
    /// # Errors
    ///
    /// Returns the underlying `AuthError` unchanged; local state is untouched.
    pub async fn login_with_google(&self, grant: &OAuthGrant) -> Result<UserRecord, AuthError> {
        self.login_with_oauth(GOOGLE_PROVIDER, grant).await
    }

    /// Provider-agnostic form of [`AuthContext::login_with_google`].
    ///
    /// # Errors
    ///
    /// Returns the underlying `AuthError` unchanged; local state is untouched.
    pub async fn login_with_oauth(&self, provider: &str, grant: &OAuthGrant) -> Result<UserRecord, AuthError> {
        match self.store.login_with_oauth(provider, grant).await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(user)
            }
            Err(e) => {
                tracing::error!(error = %e, %provider, "oauth login failed");
                Err(e)
            }
        }
    }

    /// Clear the session and drop the local user.
    pub fn logout(&self) {
        self.store.clear();
        self.set_user(None);
    }

    /// Re-read the store synchronously, for flows whose change event may not
    /// have reached this context yet.
    pub fn refresh_user(&self) {
        self.set_user(self.store.current_user());
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ConfigurationError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_extensions(&parts.extensions)
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Owner of an `AuthContext` and its store subscription.
pub struct AuthProvider {
    context: AuthContext,
    subscription: Option<Subscription>,
}

impl AuthProvider {
    /// Unmounted provider; its context reports `Loading`.
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        let state = AuthState { user: None, loading: true };
        Self { context: AuthContext { store, state: Arc::new(Mutex::new(state)) }, subscription: None }
    }

    /// Load the current user and start following store changes. Idempotent.
    pub fn mount(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        {
            let mut state = self.context.lock();
            state.user = self.context.store.current_user();
            state.loading = false;
        }
        let state = Arc::clone(&self.context.state);
        self.subscription = Some(self.context.store.on_change(move |session| {
            let mut state = state.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            state.user = session.map(|s| s.user.clone());
        }));
    }

    /// Shorthand for `new` followed by `mount`.
    #[must_use]
    pub fn mounted(store: SessionStore) -> Self {
        let mut provider = Self::new(store);
        provider.mount();
        provider
    }

    #[must_use]
    pub fn context(&self) -> AuthContext {
        self.context.clone()
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
