//! Axum integration: guard layers, extractors, and auth routes.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cookiegate::{Gate, GateConfig, GuardConfig, HttpProvider, ProviderConfig};
//!
//! let gate = Gate::new(GateConfig::from_env()?, HttpProvider::new(ProviderConfig::from_env()?));
//!
//! let app = axum::Router::new()
//!     .route("/dashboard", axum::routing::get(dashboard))
//!     .layer(gate.page_layer(GuardConfig::new().with_redirect_to("/login")))
//!     .merge(gate.routes());
//! ```

mod api;
mod config;
pub(crate) mod cookies;
mod edge;
mod error;
mod extractor;
mod page;
mod routes;
mod service;
mod state;

use std::sync::Arc;

use axum::Router;
use axum_extra::extract::CookieJar;

pub use api::JsonDeny;
pub use config::GateConfig;
pub use edge::RouteMatcher;
pub use error::GateError;
pub use extractor::{CurrentSession, CurrentUser};
pub use page::RedirectDeny;
pub use service::{DenyResponder, GuardLayer, GuardService};

use state::GateState;

use crate::client::SessionClient;
use crate::guard::GuardConfig;
use crate::provider::IdentityProvider;
use crate::store::CookieSessionStore;

/// The crate's entry point: one `Gate` per identity provider, built at
/// startup and shared across routes.
pub struct Gate<P> {
    state: GateState<P>,
}

impl<P> Clone for Gate<P> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<P: IdentityProvider + 'static> Gate<P> {
    #[must_use]
    pub fn new(config: GateConfig, provider: P) -> Self {
        Self {
            state: GateState {
                provider: Arc::new(provider),
                settings: config.settings,
            },
        }
    }

    /// Guard for server-rendered pages: denial is a 307 redirect.
    #[must_use]
    pub fn page_layer(&self, guard: GuardConfig) -> GuardLayer<P, RedirectDeny> {
        GuardLayer {
            state: self.state.clone(),
            guard,
            matcher: None,
            deny: RedirectDeny,
        }
    }

    /// Guard for API routes: denial is a 401/403 JSON response.
    #[must_use]
    pub fn api_layer(&self, guard: GuardConfig) -> GuardLayer<P, JsonDeny> {
        GuardLayer {
            state: self.state.clone(),
            guard,
            matcher: None,
            deny: JsonDeny,
        }
    }

    /// Guard applied at the router root, before any routing, limited to the
    /// matcher's path patterns. Denial is a 307 redirect.
    #[must_use]
    pub fn edge_layer(
        &self,
        matcher: RouteMatcher,
        guard: GuardConfig,
    ) -> GuardLayer<P, RedirectDeny> {
        GuardLayer {
            state: self.state.clone(),
            guard,
            matcher: Some(matcher),
            deny: RedirectDeny,
        }
    }

    /// Sign-in and sign-out routes, mounted under the configured auth path.
    #[must_use]
    pub fn routes(&self) -> Router {
        routes::gate_routes(self.state.clone())
    }

    /// A provider client bound to this request's cookies, for handlers that
    /// talk to the provider directly (e.g. using the session's
    /// provider token). Apply the staged cookies from the store to the
    /// response when done.
    #[must_use]
    pub fn client(&self, jar: &CookieJar) -> SessionClient<Arc<P>, CookieSessionStore> {
        SessionClient::new(self.state.provider.clone(), self.state.store_from(jar))
    }
}
