//! HTTP transport types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. `Client` builds an `HttpRequest`,
//! hands it to a `Transport`, and parses the `HttpResponse` it gets back.
//! Callers with their own HTTP stack can skip the transport entirely and use
//! `Client::build_request` / `Client::parse_response` directly.
//!
//! All fields use owned types (`String`, `Vec`) so values can be recorded,
//! cloned and compared in tests without lifetime concerns.

use std::fmt;
use std::sync::Arc;

/// HTTP method for a request. TalentLMS only uses GET for reads and POST for
/// mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute (`https://{host}/api/v1/{path}`). `body` is `None` for
/// GET requests and a form-encoded string for POST requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}

/// Underlying cause of a failed round-trip (DNS, TLS, timeout, refused
/// connection, ...).
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Executes exactly one HTTP round-trip.
///
/// Implementations must not retry and must return non-2xx responses as data
/// rather than as errors: the client decides success from the body.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "https://example.talentlms.com/api/v1/users".to_string(),
            headers: vec![("Authorization".to_string(), "Basic abc".to_string())],
            body: None,
        };
        assert_eq!(req.header("authorization"), Some("Basic abc"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn method_renders_uppercase() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }
}
