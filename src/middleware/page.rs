use axum::response::{IntoResponse, Redirect, Response};

use super::service::DenyResponder;
use crate::guard::GuardConfig;

/// Page denial: a clean 307 to the configured path (default `/`), carrying
/// no hint of whether a cookie was absent, malformed, or stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectDeny;

impl DenyResponder for RedirectDeny {
    fn unauthenticated(&self, config: &GuardConfig) -> Response {
        Redirect::temporary(config.redirect_to()).into_response()
    }
}
