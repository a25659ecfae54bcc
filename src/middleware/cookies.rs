use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

/// Create one session chunk cookie.
///
/// HttpOnly always; Secure unless explicitly disabled for local development.
pub(crate) fn chunk_cookie(
    name: String,
    value: String,
    secure: bool,
    ttl_days: i64,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::days(ttl_days))
        .build()
}

/// Create a removal cookie (immediate expiry) for a session chunk.
pub(crate) fn removal_cookie(name: String) -> Cookie<'static> {
    Cookie::build((name, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}
