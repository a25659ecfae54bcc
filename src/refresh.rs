//! Silent session renewal.
//!
//! Refresh is driven per inbound request, not by a background timer:
//! concurrent requests carrying the same stale token may each attempt a
//! refresh, and the provider decides which wins. The store's write policy
//! keeps the most recently obtained session for this response cycle.

use std::time::Duration as StdDuration;

use time::Duration;

use crate::provider::IdentityProvider;
use crate::store::SessionPersistence;
use crate::types::Session;

/// How far before `expires_at` a session is already treated as stale, so a
/// token never expires mid-handler.
pub const DEFAULT_EXPIRY_SKEW: Duration = Duration::seconds(60);

/// Bounded wait on the provider's refresh call; a hung provider must not
/// hang the request.
pub const DEFAULT_REFRESH_TIMEOUT: StdDuration = StdDuration::from_secs(10);

/// Renews an expiring session through the identity provider, writing the
/// result back through the request's store.
pub struct TokenRefresher<'a, P> {
    provider: &'a P,
    skew: Duration,
    timeout: StdDuration,
}

impl<'a, P: IdentityProvider> TokenRefresher<'a, P> {
    #[must_use]
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            skew: DEFAULT_EXPIRY_SKEW,
            timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_skew(mut self, skew: Duration) -> Self {
        self.skew = skew;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: StdDuration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Return a usable session, renewing it first if it is about to expire.
    ///
    /// The common path is cheap: a fresh session comes back unchanged with
    /// no provider call. A successful renewal is persisted via `store.set`
    /// before it is returned. `None` means the session could not be renewed
    /// (rejected, unreachable, or timed out); the cookies are cleared and
    /// callers treat the request as unauthenticated — this is never a fatal
    /// error.
    pub async fn ensure_fresh<S: SessionPersistence>(
        &self,
        store: &mut S,
        session: Session,
    ) -> Option<Session> {
        if !session.expires_within(self.skew) {
            return Some(session);
        }

        let refresh = self.provider.refresh_session(session.refresh_token());
        match tokio::time::timeout(self.timeout, refresh).await {
            Ok(Ok(renewed)) => {
                store.set(&renewed);
                tracing::debug!("session renewed");
                Some(renewed)
            }
            Ok(Err(error)) => {
                tracing::warn!(error = %error, "session refresh rejected");
                store.clear();
                None
            }
            Err(_) => {
                tracing::warn!("session refresh timed out");
                store.clear();
                None
            }
        }
    }
}
