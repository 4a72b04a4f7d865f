//! Client configuration.

use std::time::Duration;

use reqwest::Url;

use crate::error::{Error, Result};
use crate::protocol::is_blank;

/// Client configuration.
///
/// The OIDC login flow belongs to the identity provider; this only carries
/// what the client itself needs to reach the platform and judge its token.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Root URL of the Cinchy platform, without trailing slash.
    pub root_url: String,
    /// Authority (identity server) URL, without trailing slash.
    pub authority: String,
    /// OAuth client id of the integrated application.
    pub client_id: String,
    /// Whether the root URL and authority must use HTTPS.
    pub require_https: bool,
    /// Fraction of token lifetime after which a refresh is due.
    pub token_refresh_factor: f64,
    /// Per-request timeout (default: 20 seconds).
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything optional.
    ///
    /// # Example
    ///
    /// ```
    /// use cinchy_rs::ClientConfig;
    ///
    /// let config = ClientConfig::new("https://cinchy.example/", "https://sso.example", "app")
    ///     .with_require_https(true);
    /// assert_eq!(config.root_url, "https://cinchy.example");
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn new(
        root_url: impl Into<String>,
        authority: impl Into<String>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            root_url: trim_url(root_url.into()),
            authority: trim_url(authority.into()),
            client_id: client_id.into(),
            require_https: false,
            token_refresh_factor: 0.75,
            request_timeout: Duration::from_secs(20),
        }
    }

    /// Require HTTPS for the root URL and authority.
    pub fn with_require_https(mut self, required: bool) -> Self {
        self.require_https = required;
        self
    }

    /// Set the fraction of token lifetime after which a refresh is due.
    pub fn with_token_refresh_factor(mut self, factor: f64) -> Self {
        self.token_refresh_factor = factor;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check that URLs parse and the client id is present.
    pub fn validate(&self) -> Result<()> {
        self.check_url("root URL", &self.root_url)?;
        self.check_url("authority", &self.authority)?;
        if is_blank(&self.client_id) {
            return Err(Error::config("client id must not be empty"));
        }
        if !(0.0..=1.0).contains(&self.token_refresh_factor) {
            return Err(Error::config(format!(
                "token refresh factor must be within 0..=1, got {}",
                self.token_refresh_factor
            )));
        }
        Ok(())
    }

    fn check_url(&self, what: &str, url: &str) -> Result<()> {
        let parsed =
            Url::parse(url).map_err(|e| Error::config(format!("invalid {} {:?}: {}", what, url, e)))?;
        match parsed.scheme() {
            "https" => Ok(()),
            "http" if !self.require_https => Ok(()),
            scheme => Err(Error::config(format!(
                "{} {:?} uses unsupported scheme {}",
                what, url, scheme
            ))),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required: `CINCHY_ROOT_URL`, `CINCHY_AUTHORITY`, `CINCHY_CLIENT_ID`.
    /// Optional: `CINCHY_TIMEOUT_SECS`, `CINCHY_TOKEN_REFRESH_FACTOR`.
    pub fn from_env() -> Result<Self> {
        let required = |key: &str| {
            std::env::var(key).map_err(|_| Error::config(format!("{} is not set", key)))
        };

        let mut config = Self::new(
            required("CINCHY_ROOT_URL")?,
            required("CINCHY_AUTHORITY")?,
            required("CINCHY_CLIENT_ID")?,
        );
        if let Ok(secs) = std::env::var("CINCHY_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| Error::config(format!("invalid CINCHY_TIMEOUT_SECS: {}", secs)))?;
            config = config.with_request_timeout(Duration::from_secs(secs));
        }
        if let Ok(factor) = std::env::var("CINCHY_TOKEN_REFRESH_FACTOR") {
            let factor: f64 = factor.parse().map_err(|_| {
                Error::config(format!("invalid CINCHY_TOKEN_REFRESH_FACTOR: {}", factor))
            })?;
            config = config.with_token_refresh_factor(factor);
        }
        config.validate()?;
        Ok(config)
    }
}

fn trim_url(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new("http://cinchy.local/", "http://sso.local/identity/", "app")
    }

    #[test]
    fn test_defaults() {
        let config = config();
        assert_eq!(config.root_url, "http://cinchy.local");
        assert_eq!(config.authority, "http://sso.local/identity");
        assert_eq!(config.request_timeout, Duration::from_secs(20));
        assert_eq!(config.token_refresh_factor, 0.75);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_refresh_factor_range() {
        assert!(config().with_token_refresh_factor(0.5).validate().is_ok());
        assert!(config().with_token_refresh_factor(1.5).validate().is_err());
        assert!(config().with_token_refresh_factor(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_require_https() {
        let err = config().with_require_https(true).validate().unwrap_err();
        assert!(matches!(err, Error::Config { .. }));

        let https = ClientConfig::new("https://a.example", "https://b.example", "app")
            .with_require_https(true);
        assert!(https.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        assert!(ClientConfig::new("not a url", "http://b", "app").validate().is_err());
        assert!(ClientConfig::new("http://a", "http://b", " ").validate().is_err());
    }
}
