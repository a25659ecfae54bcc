use std::sync::Arc;

use axum_extra::extract::CookieJar;
use time::Duration;

use super::config::GateSettings;
use crate::codec::CookieCodec;
use crate::provider::IdentityProvider;
use crate::refresh::TokenRefresher;
use crate::store::CookieSessionStore;

/// Shared state for the guard layers and auth route handlers.
pub(crate) struct GateState<P> {
    pub(crate) provider: Arc<P>,
    pub(crate) settings: GateSettings,
}

// Manual Clone: avoid derive adding a `P: Clone` bound.
impl<P> Clone for GateState<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<P: IdentityProvider> GateState<P> {
    pub(crate) fn codec(&self) -> CookieCodec {
        CookieCodec::new(self.settings.cookie_name.clone())
            .with_chunk_bytes(self.settings.chunk_bytes)
    }

    /// Fresh request-scoped store over the inbound jar. Never cached.
    pub(crate) fn store_from(&self, jar: &CookieJar) -> CookieSessionStore {
        CookieSessionStore::from_jar(self.codec(), jar)
            .with_secure_cookies(self.settings.secure_cookies)
            .with_ttl_days(self.settings.cookie_ttl_days)
    }

    pub(crate) fn refresher(&self) -> TokenRefresher<'_, P> {
        TokenRefresher::new(self.provider.as_ref())
            .with_skew(Duration::seconds(self.settings.expiry_skew_secs))
            .with_timeout(self.settings.refresh_timeout)
    }
}
