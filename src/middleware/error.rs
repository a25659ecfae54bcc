use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Rejections from the middleware layer's extractors.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No guarded session on the request — the handler ran without a guard
    /// layer, or the layer denied the request.
    #[error("not authenticated")]
    Unauthenticated,

    /// Internal fault; details are logged, never sent to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GateError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
            }
            Self::Internal(_) => {
                tracing::error!(error = %self, "gate internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}
