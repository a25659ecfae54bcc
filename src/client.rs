//! Identity-provider client bound to a session persistence backend.
//!
//! Every context reads and writes the same `Session` representation; only
//! the backend differs. In a request handler the backend is the request's
//! [`CookieSessionStore`](crate::store::CookieSessionStore); outside one
//! (CLIs, tests, background jobs) it is a
//! [`MemorySessionStore`](crate::store::MemorySessionStore).

use crate::error::Error;
use crate::provider::IdentityProvider;
use crate::refresh::TokenRefresher;
use crate::store::{MemorySessionStore, SessionPersistence};
use crate::types::{Session, UserRecord};

pub struct SessionClient<P, S> {
    provider: P,
    store: S,
}

impl<P: IdentityProvider> SessionClient<P, MemorySessionStore> {
    /// Client backed by process-local storage, the stand-in for the
    /// browser's persistent store.
    #[must_use]
    pub fn local(provider: P) -> Self {
        Self::new(provider, MemorySessionStore::new())
    }
}

impl<P: IdentityProvider, S: SessionPersistence> SessionClient<P, S> {
    #[must_use]
    pub fn new(provider: P, store: S) -> Self {
        Self { provider, store }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// The session currently persisted, if any. No revalidation happens;
    /// use [`get_user`](Self::get_user) when the claims must be trusted.
    #[must_use]
    pub fn get_session(&self) -> Option<Session> {
        self.store.get()
    }

    /// Sign in with email and password, persisting the resulting session.
    ///
    /// # Errors
    ///
    /// Returns the provider's error unchanged; nothing is persisted on
    /// failure.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, Error> {
        let session = self.provider.sign_in(email, password).await?;
        self.store.set(&session);
        Ok(session)
    }

    /// Sign out: revoke server-side (best effort) and clear the store.
    ///
    /// The cookies are cleared even when the provider call fails — the
    /// user asked to leave.
    pub async fn sign_out(&mut self) {
        if let Some(session) = self.store.get() {
            if let Err(error) = self.provider.sign_out(session.access_token()).await {
                tracing::warn!(error = %error, "provider sign-out failed");
            }
        }
        self.store.clear();
    }

    /// Revalidate the stored session's user against the provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if revalidation fails; `Ok(None)` when
    /// no session is stored.
    pub async fn get_user(&self) -> Result<Option<UserRecord>, Error> {
        match self.store.get() {
            None => Ok(None),
            Some(session) => self.provider.get_user(session.access_token()).await.map(Some),
        }
    }

    /// Renew the stored session if it is about to expire.
    ///
    /// `None` means no session is stored or the refresh failed (and the
    /// store was cleared).
    pub async fn ensure_fresh(&mut self) -> Option<Session> {
        let session = self.store.get()?;
        TokenRefresher::new(&self.provider)
            .ensure_fresh(&mut self.store, session)
            .await
    }
}
