use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::error::Error;
use crate::jwt;

/// Provider-assigned user identifier (opaque string, typically a UUID).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct UserId(pub String);

/// Identity snapshot owned by the provider.
///
/// Treated as an opaque, trusted payload once the provider has verified the
/// access token. `metadata` is user-editable; `app_metadata` is only
/// writable by the provider's service role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserRecord {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub app_metadata: serde_json::Map<String, serde_json::Value>,
}

impl UserRecord {
    /// Create a `UserRecord` with only the required `id` field.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            email: None,
            role: None,
            metadata: serde_json::Map::new(),
            app_metadata: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Map<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }

    #[must_use]
    pub fn with_app_metadata(
        mut self,
        app_metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.app_metadata = app_metadata;
        self
    }
}

/// One authenticated browser session.
///
/// Immutable once constructed: a refresh produces a new `Session` value.
/// `expires_at` is always derived from the access token's `exp` claim and
/// cannot be set independently, so a tampered cookie cannot extend a
/// session's lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    provider_token: Option<String>,
    provider_refresh_token: Option<String>,
    user: UserRecord,
    expires_at: OffsetDateTime,
}

impl Session {
    /// Construct a session, deriving `expires_at` from the access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Token`] if the access token is not a well-formed JWT
    /// or carries no `exp` claim.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        user: UserRecord,
    ) -> Result<Self, Error> {
        let access_token = access_token.into();
        let expires_at = jwt::expiry(&access_token)?;
        Ok(Self {
            access_token,
            refresh_token: refresh_token.into(),
            provider_token: None,
            provider_refresh_token: None,
            user,
            expires_at,
        })
    }

    /// Attach a third-party OAuth provider token.
    #[must_use]
    pub fn with_provider_token(mut self, token: impl Into<String>) -> Self {
        self.provider_token = Some(token.into());
        self
    }

    /// Attach a third-party OAuth provider refresh token.
    #[must_use]
    pub fn with_provider_refresh_token(mut self, token: impl Into<String>) -> Self {
        self.provider_refresh_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }

    /// Third-party provider token, if the provider is an OAuth issuer.
    ///
    /// Only ever surfaced server-side; the cookie family carrying it is
    /// HttpOnly, so client script never sees it.
    #[must_use]
    pub fn provider_token(&self) -> Option<&str> {
        self.provider_token.as_deref()
    }

    #[must_use]
    pub fn provider_refresh_token(&self) -> Option<&str> {
        self.provider_refresh_token.as_deref()
    }

    #[must_use]
    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    #[must_use]
    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }

    /// Whether the access token expires within `skew` from now.
    #[must_use]
    pub fn expires_within(&self, skew: Duration) -> bool {
        self.expires_at - skew <= OffsetDateTime::now_utc()
    }
}
