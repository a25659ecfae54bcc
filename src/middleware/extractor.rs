use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::GateError;
use crate::types::{Session, UserRecord};

/// The guarded session, extracted from request extensions.
///
/// A guard layer must sit in front of the route: it evaluates the guard,
/// refreshes the session if needed, and injects the result. Without a layer
/// this extractor rejects with `401 Unauthorized`.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(CurrentSession(session): CurrentSession) -> String {
///     format!("signed in until {}", session.expires_at())
/// }
///
/// // Optional: accessible to both authenticated and anonymous users
/// async fn landing(session: Option<CurrentSession>) -> &'static str {
///     if session.is_some() { "welcome back" } else { "hello, guest" }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(CurrentSession)
            .ok_or(GateError::Unauthenticated)
    }
}

/// The guarded session's user. Convenience over [`CurrentSession`] for
/// handlers that only need identity.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserRecord);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = GateError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .map(|session| CurrentUser(session.user().clone()))
            .ok_or(GateError::Unauthenticated)
    }
}
