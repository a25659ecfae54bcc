//! The identity-provider surface this crate consumes.
//!
//! The provider is a remote token issuer: it signs users in, renews
//! sessions from refresh tokens, and revalidates access tokens. Everything
//! else (cookies, refresh scheduling, guarding) is this crate's job.

use std::future::Future;

use crate::error::Error;
use crate::types::{Session, UserRecord};

#[cfg(feature = "provider")]
use serde::Deserialize;
#[cfg(feature = "provider")]
use url::Url;

/// Narrow interface to the token issuer. Implement this to plug in a
/// non-HTTP provider (or a fake in tests).
pub trait IdentityProvider: Send + Sync {
    /// Password sign-in; returns a full session on success.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Exchange a refresh token for a new session.
    fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send;

    /// Server-side revalidation of an access token. Unlike reading the
    /// session cookie, this round-trips to the provider and never trusts a
    /// cached claim.
    fn get_user(&self, access_token: &str)
        -> impl Future<Output = Result<UserRecord, Error>> + Send;

    /// Revoke the session server-side.
    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), Error>> + Send;
}

impl<P: IdentityProvider> IdentityProvider for &P {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send {
        P::sign_in(self, email, password)
    }

    fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send {
        P::refresh_session(self, refresh_token)
    }

    fn get_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserRecord, Error>> + Send {
        P::get_user(self, access_token)
    }

    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), Error>> + Send {
        P::sign_out(self, access_token)
    }
}

impl<P: IdentityProvider> IdentityProvider for std::sync::Arc<P> {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send {
        P::sign_in(self, email, password)
    }

    fn refresh_session(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<Session, Error>> + Send {
        P::refresh_session(self, refresh_token)
    }

    fn get_user(
        &self,
        access_token: &str,
    ) -> impl Future<Output = Result<UserRecord, Error>> + Send {
        P::get_user(self, access_token)
    }

    fn sign_out(&self, access_token: &str) -> impl Future<Output = Result<(), Error>> + Send {
        P::sign_out(self, access_token)
    }
}

/// HTTP identity-provider configuration.
///
/// Required fields are constructor parameters — no runtime "missing field"
/// errors.
#[cfg(feature = "provider")]
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    base_url: Url,
    api_key: String,
}

#[cfg(feature = "provider")]
impl ProviderConfig {
    #[must_use]
    pub fn new(base_url: Url, api_key: impl Into<String>) -> Self {
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `COOKIEGATE_PROVIDER_URL`: provider base URL (e.g. `https://host/auth/v1`)
    /// - `COOKIEGATE_PROVIDER_KEY`: API key sent with every request
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or the
    /// URL is invalid.
    pub fn from_env() -> Result<Self, Error> {
        let url = std::env::var("COOKIEGATE_PROVIDER_URL")
            .map_err(|_| Error::Config("COOKIEGATE_PROVIDER_URL is required".into()))?;
        let base_url: Url = url
            .parse()
            .map_err(|e| Error::Config(format!("COOKIEGATE_PROVIDER_URL: {e}")))?;
        let api_key = std::env::var("COOKIEGATE_PROVIDER_KEY")
            .map_err(|_| Error::Config("COOKIEGATE_PROVIDER_KEY is required".into()))?;
        Ok(Self::new(base_url, api_key))
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path_and_query: &str) -> Url {
        let joined = format!(
            "{}/{path_and_query}",
            self.base_url.as_str().trim_end_matches('/')
        );
        joined.parse().expect("endpoint derived from a valid base URL")
    }
}

/// Token endpoint payload: tokens plus the provider-owned user snapshot.
#[cfg(feature = "provider")]
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    provider_token: Option<String>,
    #[serde(default)]
    provider_refresh_token: Option<String>,
    user: UserRecord,
}

#[cfg(feature = "provider")]
impl TokenEndpointResponse {
    fn into_session(self) -> Result<Session, Error> {
        let mut session = Session::new(self.access_token, self.refresh_token, self.user)?;
        if let Some(token) = self.provider_token {
            session = session.with_provider_token(token);
        }
        if let Some(token) = self.provider_refresh_token {
            session = session.with_provider_refresh_token(token);
        }
        Ok(session)
    }
}

/// reqwest-backed identity-provider client.
#[cfg(feature = "provider")]
pub struct HttpProvider {
    config: ProviderConfig,
    http: reqwest::Client,
}

#[cfg(feature = "provider")]
impl HttpProvider {
    #[must_use]
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Checks HTTP response status; returns the response on success or an
    /// error with details.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::Provider {
            operation,
            status: Some(status),
            detail,
        })
    }
}

#[cfg(feature = "provider")]
impl IdentityProvider for HttpProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, Error> {
        let response = self
            .http
            .post(self.config.endpoint("token?grant_type=password"))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let response = Self::ensure_success(response, "password sign-in").await?;
        response
            .json::<TokenEndpointResponse>()
            .await?
            .into_session()
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, Error> {
        let response = self
            .http
            .post(self.config.endpoint("token?grant_type=refresh_token"))
            .header("apikey", &self.config.api_key)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let response = Self::ensure_success(response, "token refresh").await?;
        response
            .json::<TokenEndpointResponse>()
            .await?
            .into_session()
    }

    async fn get_user(&self, access_token: &str) -> Result<UserRecord, Error> {
        let response = self
            .http
            .get(self.config.endpoint("user"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let response = Self::ensure_success(response, "user revalidation").await?;
        response.json::<UserRecord>().await.map_err(Into::into)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.endpoint("logout"))
            .header("apikey", &self.config.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        Self::ensure_success(response, "sign-out").await?;
        Ok(())
    }
}
