use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::service::DenyResponder;
use crate::guard::GuardConfig;

/// API denial: status codes and a bare JSON body, no redirects and no
/// session details.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDeny;

impl DenyResponder for JsonDeny {
    fn unauthenticated(&self, _config: &GuardConfig) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response()
    }

    // Redirecting an API caller is unhelpful; the guard's redirect target
    // only applies to page and edge contexts.
    fn permission_denied(&self, _redirect_to: &str) -> Response {
        (
            StatusCode::FORBIDDEN,
            Json(serde_json::json!({ "error": "forbidden" })),
        )
            .into_response()
    }
}
