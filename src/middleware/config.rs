use crate::codec::DEFAULT_CHUNK_BYTES;
use crate::error::Error;

/// Shared gate settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct GateSettings {
    pub(crate) cookie_name: String,
    pub(crate) chunk_bytes: usize,
    pub(crate) cookie_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) expiry_skew_secs: i64,
    pub(crate) refresh_timeout: std::time::Duration,
    pub(crate) auth_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl GateSettings {
    fn defaults() -> Self {
        Self {
            cookie_name: "__cookiegate_session".into(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
            cookie_ttl_days: 30,
            secure_cookies: true,
            expiry_skew_secs: 60,
            refresh_timeout: std::time::Duration::from_secs(10),
            auth_path: "/api/auth".into(),
            login_redirect: "/".into(),
            logout_redirect: "/".into(),
            error_redirect: "/login".into(),
        }
    }
}

/// Gate configuration.
///
/// All fields have sensible defaults; override with `with_*` methods, or use
/// [`from_env()`](GateConfig::from_env) for convention-based setup.
pub struct GateConfig {
    pub(crate) settings: GateSettings,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GateConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            settings: GateSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Optional env vars
    /// - `COOKIEGATE_COOKIE_NAME`: session cookie family base name
    /// - `COOKIEGATE_CHUNK_BYTES`: per-cookie value budget
    /// - `COOKIEGATE_COOKIE_TTL_DAYS`: session cookie lifetime
    /// - `COOKIEGATE_EXPIRY_SKEW_SECS`: refresh-ahead window
    /// - `COOKIEGATE_REFRESH_TIMEOUT_SECS`: bounded wait on provider refresh
    /// - `COOKIEGATE_AUTH_PATH`: mount point for the sign-in/out routes
    /// - `COOKIEGATE_LOGIN_REDIRECT` / `COOKIEGATE_LOGOUT_REDIRECT` /
    ///   `COOKIEGATE_ERROR_REDIRECT`: post-auth navigation targets
    /// - `COOKIEGATE_INSECURE_COOKIES`: `"1"` or `"true"` drops the Secure
    ///   attribute for plain-HTTP local development
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a numeric variable does not parse.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::new();

        if let Ok(name) = std::env::var("COOKIEGATE_COOKIE_NAME") {
            config.settings.cookie_name = name;
        }
        if let Ok(raw) = std::env::var("COOKIEGATE_CHUNK_BYTES") {
            config.settings.chunk_bytes = raw
                .parse()
                .map_err(|e| Error::Config(format!("COOKIEGATE_CHUNK_BYTES: {e}")))?;
        }
        if let Ok(raw) = std::env::var("COOKIEGATE_COOKIE_TTL_DAYS") {
            config.settings.cookie_ttl_days = raw
                .parse()
                .map_err(|e| Error::Config(format!("COOKIEGATE_COOKIE_TTL_DAYS: {e}")))?;
        }
        if let Ok(raw) = std::env::var("COOKIEGATE_EXPIRY_SKEW_SECS") {
            config.settings.expiry_skew_secs = raw
                .parse()
                .map_err(|e| Error::Config(format!("COOKIEGATE_EXPIRY_SKEW_SECS: {e}")))?;
        }
        if let Ok(raw) = std::env::var("COOKIEGATE_REFRESH_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|e| Error::Config(format!("COOKIEGATE_REFRESH_TIMEOUT_SECS: {e}")))?;
            config.settings.refresh_timeout = std::time::Duration::from_secs(secs);
        }
        if let Ok(path) = std::env::var("COOKIEGATE_AUTH_PATH") {
            config.settings.auth_path = path;
        }
        if let Ok(path) = std::env::var("COOKIEGATE_LOGIN_REDIRECT") {
            config.settings.login_redirect = path;
        }
        if let Ok(path) = std::env::var("COOKIEGATE_LOGOUT_REDIRECT") {
            config.settings.logout_redirect = path;
        }
        if let Ok(path) = std::env::var("COOKIEGATE_ERROR_REDIRECT") {
            config.settings.error_redirect = path;
        }

        let insecure = matches!(
            std::env::var("COOKIEGATE_INSECURE_COOKIES").as_deref(),
            Ok("1") | Ok("true"),
        );
        config.settings.secure_cookies = !insecure;

        Ok(config)
    }

    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_chunk_bytes(mut self, bytes: usize) -> Self {
        self.settings.chunk_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_cookie_ttl_days(mut self, days: i64) -> Self {
        self.settings.cookie_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn with_expiry_skew_secs(mut self, secs: i64) -> Self {
        self.settings.expiry_skew_secs = secs;
        self
    }

    #[must_use]
    pub fn with_refresh_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.settings.refresh_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }
}
