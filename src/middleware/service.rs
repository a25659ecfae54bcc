//! The tower service shared by all three guard layers.
//!
//! One state machine, three adapters: the service runs the guard, and a
//! [`DenyResponder`] decides what a denial looks like on the wire. Staged
//! cookie writes (renewals, clears) are applied to whatever response leaves
//! — allowed or denied — so the client's jar converges even on a redirect.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, HeaderValue, Request};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::CookieJar;
use tower::{Layer, Service};

use super::edge::RouteMatcher;
use super::error::GateError;
use super::state::GateState;
use crate::guard::{self, GuardConfig, Verdict};
use crate::provider::IdentityProvider;
use crate::store::CookieSessionStore;

/// Maps a guard denial onto a response. Allow is always "forward with the
/// session injected" and never reaches the adapter.
pub trait DenyResponder: Clone + Send + Sync + 'static {
    /// Response for a request with no usable session.
    fn unauthenticated(&self, config: &GuardConfig) -> Response;

    /// Response for an authenticated user the permission predicate denied.
    fn permission_denied(&self, redirect_to: &str) -> Response {
        Redirect::temporary(redirect_to).into_response()
    }
}

pub struct GuardLayer<P, D> {
    pub(crate) state: GateState<P>,
    pub(crate) guard: GuardConfig,
    pub(crate) matcher: Option<RouteMatcher>,
    pub(crate) deny: D,
}

impl<P, D: Clone> Clone for GuardLayer<P, D> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            guard: self.guard.clone(),
            matcher: self.matcher.clone(),
            deny: self.deny.clone(),
        }
    }
}

impl<S, P, D: Clone> Layer<S> for GuardLayer<P, D> {
    type Service = GuardService<S, P, D>;

    fn layer(&self, inner: S) -> Self::Service {
        GuardService {
            inner,
            state: self.state.clone(),
            guard: self.guard.clone(),
            matcher: self.matcher.clone(),
            deny: self.deny.clone(),
        }
    }
}

pub struct GuardService<S, P, D> {
    inner: S,
    state: GateState<P>,
    guard: GuardConfig,
    matcher: Option<RouteMatcher>,
    deny: D,
}

impl<S: Clone, P, D: Clone> Clone for GuardService<S, P, D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            state: self.state.clone(),
            guard: self.guard.clone(),
            matcher: self.matcher.clone(),
            deny: self.deny.clone(),
        }
    }
}

impl<S, P, D> Service<Request<Body>> for GuardService<S, P, D>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    P: IdentityProvider + 'static,
    D: DenyResponder,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        // swap out the service that was polled ready (tower's clone pattern)
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let state = self.state.clone();
        let guard = self.guard.clone();
        let matcher = self.matcher.clone();
        let deny = self.deny.clone();

        Box::pin(async move {
            if let Some(matcher) = &matcher {
                if !matcher.matches(req.uri().path()) {
                    return inner.call(req).await;
                }
            }

            let jar = CookieJar::from_headers(req.headers());
            let mut store = state.store_from(&jar);
            let refresher = state.refresher();

            // No early returns past this point: a refresh may already have
            // staged cookie writes, and they must reach the response even
            // when the verdict is a denial or an error.
            let mut response = match guard::evaluate(&mut store, &refresher, &guard).await {
                Ok(Verdict::Allow(session)) => {
                    let mut req = req;
                    req.extensions_mut().insert(session);
                    inner.call(req).await?
                }
                Ok(Verdict::Unauthenticated) => deny.unauthenticated(&guard),
                Ok(Verdict::PermissionDenied { redirect_to }) => {
                    deny.permission_denied(&redirect_to)
                }
                Err(error) => GateError::Internal(error.to_string()).into_response(),
            };

            apply_cookies(&mut response, &mut store);
            Ok(response)
        })
    }
}

/// Flush the store's staged writes onto the outgoing response. Staging plus
/// a single flush point keeps cookie writes atomic with the response: an
/// aborted request never leaves a partial set observable.
fn apply_cookies(response: &mut Response, store: &mut CookieSessionStore) {
    apply_cookie_list(response, store.take_cookies());
}

/// Shared by the route handlers, which stage writes the same way.
pub(crate) fn apply_cookie_list(response: &mut Response, cookies: Vec<Cookie<'static>>) {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(_) => tracing::warn!(name = cookie.name(), "skipping unencodable cookie"),
        }
    }
}
