//! Session store adapter.
//!
//! ARCHITECTURE
//! ============
//! `SessionStore` is the single owner of the current `Session`. Everything
//! else (the cookie mirror, the auth context) holds a clone of the handle and
//! observes changes through an explicit listener list.
//!
//! Listeners are invoked outside the state lock, once per mutation, in the
//! order mutations happen. A listener must not mutate the store it observes.

pub mod cookie;
pub mod mirror;

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::backend::{AuthError, OAuthGrant, RecordStore, UserRecord};

/// Authenticated identity plus the credential issued for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserRecord,
}

type Listener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

struct StoreInner {
    session: Option<Session>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
}

/// Shared handle to the session owned by one client scope.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<StoreInner>>,
    backend: Arc<dyn RecordStore>,
}

impl SessionStore {
    /// Empty (logged-out) store.
    #[must_use]
    pub fn new(backend: Arc<dyn RecordStore>) -> Self {
        Self::restored(backend, None)
    }

    /// Store pre-loaded with a session recovered from storage. No listener
    /// exists yet, so nothing is notified.
    #[must_use]
    pub fn restored(backend: Arc<dyn RecordStore>, session: Option<Session>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner { session, listeners: Vec::new(), next_listener_id: 0 })),
            backend,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // Listeners never run under this lock, so a poisoned guard still holds
        // consistent data.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Current user, read from cached state.
    #[must_use]
    pub fn current_user(&self) -> Option<UserRecord> {
        self.lock().session.as_ref().map(|s| s.user.clone())
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.lock().session.as_ref().map(|s| s.token.clone())
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lock().session.is_some()
    }

    /// Register `callback` for every subsequent session change. Dropping the
    /// returned handle unsubscribes.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;
        inner.listeners.push((id, Arc::new(callback)));
        Subscription { store: Arc::downgrade(&self.inner), id }
    }

    /// Replace the current session and notify listeners.
    pub fn save(&self, session: Session) {
        self.replace(Some(session));
    }

    /// Drop the session. Notifies only if one was present.
    pub fn clear(&self) {
        self.replace(None);
    }

    fn replace(&self, next: Option<Session>) {
        let (snapshot, listeners) = {
            let mut inner = self.lock();
            if inner.session.is_none() && next.is_none() {
                return;
            }
            inner.session = next;
            let listeners: Vec<Listener> = inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect();
            (inner.session.clone(), listeners)
        };
        for listener in listeners {
            listener(snapshot.as_ref());
        }
    }

    /// Redeem an OAuth authorization code and store the resulting session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Cancelled`/`Rejected` when the provider refuses the
    /// grant and `AuthError::Network` when the record store is unreachable. The
    /// existing session is left untouched on failure.
    pub async fn login_with_oauth(&self, provider: &str, grant: &OAuthGrant) -> Result<UserRecord, AuthError> {
        let auth = self.backend.auth_with_oauth2(provider, grant).await?;
        let user = auth.record.clone();
        self.save(Session { token: auth.token, user: auth.record });
        tracing::info!(user_id = %user.id, %provider, "oauth login completed");
        Ok(user)
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn RecordStore> {
        &self.backend
    }
}

/// Listener registration returned by [`SessionStore::on_change`].
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    store: Weak<Mutex<StoreInner>>,
    id: u64,
}

impl Subscription {
    /// Stop receiving change events.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            let mut inner = store.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
