//! The guard decision machine shared by the page, API, and edge layers.
//!
//! One state machine, three call sites: the layers differ only in how a
//! verdict is mapped onto a response, never in how it is reached. A bad
//! cookie, a missing cookie, and a failed refresh all collapse to
//! [`Verdict::Unauthenticated`] so callers cannot leak which one happened.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Error;
use crate::provider::IdentityProvider;
use crate::refresh::TokenRefresher;
use crate::store::SessionPersistence;
use crate::types::{Session, UserRecord};

/// Redirect target when no usable session is present and the config names
/// none.
pub const DEFAULT_REDIRECT: &str = "/";

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type PermitFuture = Pin<Box<dyn Future<Output = Result<bool, BoxError>> + Send>>;

/// Optional per-route permission check on top of authentication.
///
/// The predicate may suspend on I/O (a remote policy lookup); an `Err` from
/// it propagates to the framework's error path rather than being treated as
/// a denial.
#[derive(Clone)]
pub struct AuthGuard {
    redirect_to: String,
    is_permitted: Arc<dyn Fn(UserRecord) -> PermitFuture + Send + Sync>,
}

impl AuthGuard {
    pub fn new<F, Fut>(redirect_to: impl Into<String>, is_permitted: F) -> Self
    where
        F: Fn(UserRecord) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, BoxError>> + Send + 'static,
    {
        Self {
            redirect_to: redirect_to.into(),
            is_permitted: Arc::new(move |user| Box::pin(is_permitted(user))),
        }
    }

    #[must_use]
    pub fn redirect_to(&self) -> &str {
        &self.redirect_to
    }
}

impl fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGuard")
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

/// Guard configuration for one route registration. Constructed once, reused
/// across requests; side-effect-free apart from the permission predicate.
#[derive(Debug, Clone, Default)]
pub struct GuardConfig {
    redirect_to: Option<String>,
    auth_guard: Option<AuthGuard>,
}

impl GuardConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Where unauthenticated requests are redirected (page/edge contexts).
    #[must_use]
    pub fn with_redirect_to(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_auth_guard(mut self, guard: AuthGuard) -> Self {
        self.auth_guard = Some(guard);
        self
    }

    #[must_use]
    pub fn redirect_to(&self) -> &str {
        self.redirect_to.as_deref().unwrap_or(DEFAULT_REDIRECT)
    }
}

/// Terminal decision for one request. No retries happen inside the guard;
/// the user's next request re-enters it fresh.
#[derive(Debug)]
pub enum Verdict {
    /// Proceed with this (possibly renewed) session.
    Allow(Session),
    /// No usable session: absent, undecodable, or refresh failed.
    Unauthenticated,
    /// Authenticated but the permission predicate said no.
    PermissionDenied { redirect_to: String },
}

/// Run the guard over one request's store.
///
/// # Errors
///
/// Only a failing user-supplied permission predicate produces an `Err`;
/// session decoding and refresh failures are expected states absorbed into
/// [`Verdict::Unauthenticated`].
pub async fn evaluate<S, P>(
    store: &mut S,
    refresher: &TokenRefresher<'_, P>,
    config: &GuardConfig,
) -> Result<Verdict, Error>
where
    S: SessionPersistence,
    P: IdentityProvider,
{
    let Some(session) = store.get() else {
        return Ok(Verdict::Unauthenticated);
    };

    let Some(session) = refresher.ensure_fresh(store, session).await else {
        return Ok(Verdict::Unauthenticated);
    };

    if let Some(guard) = &config.auth_guard {
        let permitted = (guard.is_permitted)(session.user().clone())
            .await
            .map_err(Error::Guard)?;
        if !permitted {
            return Ok(Verdict::PermissionDenied {
                redirect_to: guard.redirect_to.clone(),
            });
        }
    }

    Ok(Verdict::Allow(session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemorySessionStore, SessionPersistence};
    use crate::testutil::{self, FakeMode, FakeProvider};

    fn allow_all() -> AuthGuard {
        AuthGuard::new("/denied", |_user| async { Ok(true) })
    }

    fn deny_all() -> AuthGuard {
        AuthGuard::new("/denied", |_user| async { Ok(false) })
    }

    #[tokio::test]
    async fn no_session_is_unauthenticated() {
        let provider = FakeProvider::new(FakeMode::RefreshOk(3600));
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();

        let verdict = evaluate(&mut store, &refresher, &GuardConfig::new())
            .await
            .unwrap();
        assert!(matches!(verdict, Verdict::Unauthenticated));
    }

    #[tokio::test]
    async fn valid_session_without_auth_guard_is_allowed() {
        let provider = FakeProvider::new(FakeMode::RefreshOk(3600));
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();
        let session = testutil::session_expiring_in(3600);
        store.set(&session);

        let verdict = evaluate(&mut store, &refresher, &GuardConfig::new())
            .await
            .unwrap();
        match verdict {
            Verdict::Allow(s) => assert_eq!(s, session),
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn refresh_failure_behaves_like_no_session() {
        let provider = FakeProvider::new(FakeMode::RefreshFail);
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();
        store.set(&testutil::session_expiring_in(1));

        let verdict = evaluate(&mut store, &refresher, &GuardConfig::new())
            .await
            .unwrap();
        assert!(matches!(verdict, Verdict::Unauthenticated));
        assert!(store.get().is_none(), "failed refresh clears the store");
    }

    #[tokio::test]
    async fn renewed_session_is_allowed() {
        let provider = FakeProvider::new(FakeMode::RefreshOk(3600));
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();
        store.set(&testutil::session_expiring_in(1));

        let verdict = evaluate(&mut store, &refresher, &GuardConfig::new())
            .await
            .unwrap();
        match verdict {
            Verdict::Allow(s) => assert_eq!(s.refresh_token(), "refresh-2"),
            other => panic!("expected Allow, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn permitted_user_is_allowed() {
        let provider = FakeProvider::new(FakeMode::RefreshOk(3600));
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();
        store.set(&testutil::session_expiring_in(3600));

        let config = GuardConfig::new().with_auth_guard(allow_all());
        let verdict = evaluate(&mut store, &refresher, &config).await.unwrap();
        assert!(matches!(verdict, Verdict::Allow(_)));
    }

    #[tokio::test]
    async fn denied_user_gets_the_guard_redirect() {
        let provider = FakeProvider::new(FakeMode::RefreshOk(3600));
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();
        store.set(&testutil::session_expiring_in(3600));

        let config = GuardConfig::new()
            .with_redirect_to("/login")
            .with_auth_guard(deny_all());
        let verdict = evaluate(&mut store, &refresher, &config).await.unwrap();
        match verdict {
            Verdict::PermissionDenied { redirect_to } => assert_eq!(redirect_to, "/denied"),
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn predicate_error_propagates() {
        let provider = FakeProvider::new(FakeMode::RefreshOk(3600));
        let refresher = TokenRefresher::new(&provider);
        let mut store = MemorySessionStore::new();
        store.set(&testutil::session_expiring_in(3600));

        let failing = AuthGuard::new("/denied", |_user| async {
            let error: Box<dyn std::error::Error + Send + Sync> = "policy backend down".into();
            Err(error)
        });
        let config = GuardConfig::new().with_auth_guard(failing);
        let result = evaluate(&mut store, &refresher, &config).await;
        assert!(matches!(result, Err(Error::Guard(_))));
    }

    #[test]
    fn default_redirect_is_root() {
        assert_eq!(GuardConfig::new().redirect_to(), "/");
        assert_eq!(
            GuardConfig::new().with_redirect_to("/login").redirect_to(),
            "/login"
        );
    }
}
