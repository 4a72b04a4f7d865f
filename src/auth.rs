//! Identity provider abstraction and access token handling.
//!
//! The OIDC login flow itself (redirects, discovery, silent refresh) is left
//! to a dedicated OIDC client. This crate only needs a current bearer token
//! and whether the session is still valid, through [`IdentityProvider`].

use std::sync::RwLock;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

use crate::error::{Error, Result};

/// Source of bearer tokens for API requests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current access token, if any.
    fn access_token(&self) -> Option<AccessToken>;

    /// Current bearer token, if any.
    fn bearer_token(&self) -> Option<String> {
        self.access_token().map(|t| t.token)
    }

    /// Whether the current access token exists and has not expired.
    fn has_valid_access_token(&self) -> bool {
        self.access_token().is_some_and(|t| t.is_valid_at(Utc::now()))
    }

    /// Establish a session. Returns `true` when a valid token is available.
    async fn login(&self) -> Result<bool>;
}

/// An OAuth2 access token with its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    token: String,
    stored_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wrap a token received now.
    ///
    /// If the token is a JWT with an `exp` claim, that claim is used as the
    /// expiry. Opaque tokens never expire unless [`with_expiry`](Self::with_expiry)
    /// is used.
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        let expires_at = jwt_claims(&token)
            .and_then(|claims| claims.get("exp").and_then(|v| v.as_i64()))
            .and_then(|exp| Utc.timestamp_opt(exp, 0).single());
        Self {
            token,
            stored_at: Utc::now(),
            expires_at,
        }
    }

    /// Override the expiry.
    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Set the expiry from a token endpoint `expires_in` value.
    ///
    /// Values beyond the representable range saturate.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        let expires_at = Duration::try_seconds(seconds)
            .and_then(|lifetime| self.stored_at.checked_add_signed(lifetime))
            .unwrap_or(if seconds < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            });
        self.expires_at = Some(expires_at);
        self
    }

    /// Override when the token was stored.
    pub fn stored_at(mut self, stored_at: DateTime<Utc>) -> Self {
        self.stored_at = stored_at;
        self
    }

    /// Raw token text.
    pub fn as_str(&self) -> &str {
        &self.token
    }

    /// Expiry time, if known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is still valid at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.token.is_empty() && self.expires_at.map_or(true, |exp| now < exp)
    }

    /// Time at which the token should be refreshed.
    ///
    /// `factor` is the fraction of the lifetime after which a refresh is due
    /// (typically 0.75). `None` for tokens without a known expiry.
    pub fn refresh_at(&self, factor: f64) -> Option<DateTime<Utc>> {
        let expires_at = self.expires_at?;
        let lifetime = expires_at
            .signed_duration_since(self.stored_at)
            .num_milliseconds() as f64;
        let refresh_at = Duration::try_milliseconds((lifetime * factor) as i64)
            .and_then(|offset| self.stored_at.checked_add_signed(offset))
            .map_or(expires_at, |at| at.min(expires_at));
        Some(refresh_at)
    }

    /// Whether a refresh is due at `now`.
    pub fn needs_refresh_at(&self, now: DateTime<Utc>, factor: f64) -> bool {
        self.refresh_at(factor).is_some_and(|at| now >= at)
    }

    /// Claims of a JWT token, if it is one.
    pub fn claims(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
        jwt_claims(&self.token)
    }
}

/// Decode the payload segment of a JWT without verifying it.
fn jwt_claims(token: &str) -> Option<serde_json::Map<String, serde_json::Value>> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    match serde_json::from_slice(&bytes).ok()? {
        serde_json::Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// Identity provider holding a token obtained elsewhere.
///
/// Useful for service accounts and for tokens handed over by an external
/// OIDC client. `login` succeeds only if a valid token is present.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<AccessToken>>,
}

impl StaticTokenProvider {
    /// Provider with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with a token.
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    /// Replace the token, e.g. after an out-of-band refresh.
    pub fn set_token(&self, token: AccessToken) {
        debug!(expires_at = ?token.expires_at(), "access token replaced");
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    /// Drop the token (logout).
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Copy of the current token.
    pub fn token(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    fn access_token(&self) -> Option<AccessToken> {
        self.token()
    }

    async fn login(&self) -> Result<bool> {
        match self.token() {
            Some(token) if token.is_valid_at(Utc::now()) => Ok(true),
            Some(_) => Err(Error::NotAuthenticated {
                message: "access token has expired".to_string(),
            }),
            None => Ok(false),
        }
    }
}
