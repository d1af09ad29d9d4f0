//! Cookie mirror: keeps the `pb_auth` cookie in lockstep with the session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The route guard runs before any session state exists for a request, so it
//! can only see cookies. The mirror subscribes to the session store and
//! rewrites the cookie on every change. Writes are best-effort: a failed
//! write is logged and otherwise ignored, which at worst makes the user look
//! logged out to the guard on the next navigation.

use std::sync::{Arc, Mutex};

use axum_extra::extract::cookie::{Cookie, CookieJar};

use super::cookie::{cleared_cookie, session_cookie};
use super::{Session, SessionStore, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum CookieWriteError {
    #[error("cookie jar lock poisoned")]
    Poisoned,
}

/// Destination for mirrored cookies.
pub trait CookieSink: Send + Sync {
    /// Store `cookie`, replacing any cookie with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink can no longer accept writes.
    fn write(&self, cookie: Cookie<'static>) -> Result<(), CookieWriteError>;
}

/// Cookie jar shared between the mirror and the response that carries it.
///
/// Only cookies written through the sink end up in the jar's delta, so turning
/// the jar into a response emits exactly the mirrored `Set-Cookie` headers.
#[derive(Clone, Default)]
pub struct SharedJar {
    jar: Arc<Mutex<CookieJar>>,
}

impl SharedJar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current jar contents.
    #[must_use]
    pub fn snapshot(&self) -> CookieJar {
        self.jar
            .lock()
            .map(|jar| jar.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Value of the named cookie, if written.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<String> {
        self.snapshot().get(name).map(|c| c.value().to_owned())
    }
}

impl CookieSink for SharedJar {
    fn write(&self, cookie: Cookie<'static>) -> Result<(), CookieWriteError> {
        let mut jar = self.jar.lock().map_err(|_| CookieWriteError::Poisoned)?;
        *jar = std::mem::take(&mut *jar).add(cookie);
        Ok(())
    }
}

/// Writes the auth cookie whenever the observed session changes.
#[derive(Clone)]
pub struct CookieMirror {
    sink: Arc<dyn CookieSink>,
    secure: bool,
}

impl CookieMirror {
    #[must_use]
    pub fn new(sink: Arc<dyn CookieSink>, secure: bool) -> Self {
        Self { sink, secure }
    }

    /// Subscribe to `store`, then seed the cookie from a session that was
    /// restored before the subscription existed.
    pub fn install(&self, store: &SessionStore) -> Subscription {
        let mirror = self.clone();
        let subscription = store.on_change(move |session| mirror.write(session));
        if let Some(session) = store.current_session() {
            self.write(Some(&session));
        }
        subscription
    }

    /// Mirror `session` into the sink. Never fails.
    pub fn write(&self, session: Option<&Session>) {
        let cookie = match session {
            Some(session) => match session_cookie(session, self.secure) {
                Ok(cookie) => cookie,
                Err(e) => {
                    tracing::warn!(error = %e, "auth cookie encode failed; clearing instead");
                    cleared_cookie(self.secure)
                }
            },
            None => cleared_cookie(self.secure),
        };

        if let Err(e) = self.sink.write(cookie) {
            tracing::warn!(error = %e, "auth cookie write failed");
        }
    }
}

#[cfg(test)]
#[path = "mirror_test.rs"]
mod tests;
