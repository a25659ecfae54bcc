#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The identity provider rejected a request.
    #[error("provider error during {operation}: {detail}")]
    Provider {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },
    #[cfg(feature = "provider")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("token error: {0}")]
    Token(String),
    #[error("configuration error: {0}")]
    Config(String),
    /// A user-supplied permission predicate failed. Propagated to the
    /// hosting framework's error path, never absorbed into a redirect.
    #[error("permission check failed: {0}")]
    Guard(Box<dyn std::error::Error + Send + Sync>),
}
