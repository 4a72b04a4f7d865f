//! Request gateway: sends API requests and returns raw response bodies.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::auth::IdentityProvider;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::message::{ApiRequest, Body, Method, Target};

/// Transport for API requests.
///
/// Implementations return the raw body of a successful response, or an
/// [`Error::Remote`] carrying status, status text and body on failure.
#[async_trait]
pub trait RequestGateway: Send + Sync {
    /// Send a request.
    async fn send(&self, request: &ApiRequest) -> Result<Bytes>;
}

/// HTTP gateway over `reqwest`, attaching the bearer token of an identity
/// provider to every request.
pub struct HttpGateway {
    client: reqwest::Client,
    root_url: String,
    authority: String,
    identity: Arc<dyn IdentityProvider>,
}

impl HttpGateway {
    /// Create a gateway for the configured root URL.
    pub fn new(config: &ClientConfig, identity: Arc<dyn IdentityProvider>) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            root_url: config.root_url.clone(),
            authority: config.authority.clone(),
            identity,
        })
    }

    /// Full URL of a request path on a target.
    pub fn url(&self, target: Target, path: &str) -> String {
        match target {
            Target::Platform => format!("{}{}", self.root_url, path),
            Target::Authority => format!("{}{}", self.authority, path),
        }
    }
}

#[async_trait]
impl RequestGateway for HttpGateway {
    async fn send(&self, request: &ApiRequest) -> Result<Bytes> {
        let url = self.url(request.target, &request.path);
        debug!(method = ?request.method, %url, "sending request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
        };
        builder = match &request.body {
            Body::Empty => builder,
            Body::Form(fields) => builder.form(fields),
            Body::Json(value) => builder.json(value),
        };
        if let Some(token) = self.identity.bearer_token() {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(%url, status = status.as_u16(), len = body.len(), "response received");

        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or_default().to_string();
            return Err(Error::Remote {
                message: if status_text.is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    status_text.clone()
                },
                status: Some(status.as_u16()),
                status_text,
                body: Some(String::from_utf8_lossy(&body).into_owned()),
                correlation: None,
            });
        }
        Ok(body)
    }
}
