//! Shared fixtures for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use time::OffsetDateTime;

use crate::error::Error;
use crate::provider::IdentityProvider;
use crate::types::{Session, UserId, UserRecord};

/// Mint an unsigned JWT whose `exp` claim is the given unix timestamp.
pub(crate) fn jwt_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp},"sub":"user-1"}}"#));
    format!("{header}.{payload}.sig")
}

pub(crate) fn user() -> UserRecord {
    UserRecord::new(UserId::from("user-1".to_string())).with_email("user@example.com")
}

pub(crate) fn session_expiring_in(secs: i64) -> Session {
    session_with("refresh-1", secs)
}

pub(crate) fn session_with(refresh_token: &str, secs: i64) -> Session {
    let exp = OffsetDateTime::now_utc().unix_timestamp() + secs;
    Session::new(jwt_expiring_at(exp), refresh_token, user())
        .expect("test token is well formed")
}

pub(crate) enum FakeMode {
    /// Refresh succeeds; the renewed session expires this far in the future.
    RefreshOk(i64),
    /// Refresh is rejected, as for a revoked refresh token.
    RefreshFail,
}

pub(crate) struct FakeProvider {
    mode: FakeMode,
    pub(crate) refresh_calls: AtomicUsize,
}

impl FakeProvider {
    pub(crate) fn new(mode: FakeMode) -> Self {
        Self {
            mode,
            refresh_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn refresh_call_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

impl IdentityProvider for FakeProvider {
    async fn sign_in(&self, _email: &str, password: &str) -> Result<Session, Error> {
        if password == "wrong" {
            return Err(Error::Provider {
                operation: "password sign-in",
                status: Some(400),
                detail: "invalid credentials".into(),
            });
        }
        Ok(session_with("refresh-1", 3600))
    }

    async fn refresh_session(&self, _refresh_token: &str) -> Result<Session, Error> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FakeMode::RefreshOk(secs) => Ok(session_with("refresh-2", secs)),
            FakeMode::RefreshFail => Err(Error::Provider {
                operation: "token refresh",
                status: Some(401),
                detail: "refresh token revoked".into(),
            }),
        }
    }

    async fn get_user(&self, _access_token: &str) -> Result<UserRecord, Error> {
        Ok(user())
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), Error> {
        Ok(())
    }
}
