//! Message trait and request description for API calls.
//!
//! Every remote call is a message type that knows its HTTP method, target
//! service, endpoint path and body. Messages are turned into an [`ApiRequest`] which the
//! [`RequestGateway`](crate::gateway::RequestGateway) sends.

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`, no body.
    Get,
    /// `POST` with the message body.
    Post,
}

/// Service a request is addressed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Target {
    /// The platform API under the root URL.
    #[default]
    Platform,
    /// The identity server under the authority URL.
    Authority,
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// No body.
    Empty,
    /// `application/x-www-form-urlencoded` fields, in order.
    Form(Vec<(String, String)>),
    /// `application/json` body.
    Json(serde_json::Value),
}

/// A request ready to be sent, relative to its target's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub target: Target,
    /// Path starting with `/`.
    pub path: String,
    pub body: Body,
}

impl ApiRequest {
    /// Value of a form field, if the body is a form containing it.
    pub fn form_value(&self, key: &str) -> Option<&str> {
        match &self.body {
            Body::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }
}

/// A remote call that can describe itself as an [`ApiRequest`].
pub trait Message {
    /// HTTP method.
    fn method(&self) -> Method {
        Method::Post
    }

    /// Service the request goes to.
    fn target(&self) -> Target {
        Target::Platform
    }

    /// Endpoint path, relative to the target's base URL.
    fn path(&self) -> String;

    /// Request body.
    fn body(&self) -> Body {
        Body::Empty
    }

    /// Message used as context when the call fails.
    fn failure_message(&self) -> String;

    /// Build the request.
    fn to_request(&self) -> ApiRequest {
        ApiRequest {
            method: self.method(),
            target: self.target(),
            path: self.path(),
            body: self.body(),
        }
    }
}

/// Build form fields from string pairs.
pub(crate) fn form<const N: usize>(pairs: [(&str, &str); N]) -> Body {
    Body::Form(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}
