//! Parsed request head.
//!
//! Wraps `http::Request<()>` so the session and the handler-facing exchange
//! share one typed view of the method, target, version and headers the
//! parser produced.

use http::header::{CONNECTION, HeaderValue};
use http::{HeaderMap, Method, Request, Uri, Version};

/// Represents a parsed HTTP request head.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether the client allows the connection to stay open after the response.
    ///
    /// HTTP/1.1 keeps the connection unless a `Connection: close` token is
    /// present; HTTP/1.0 closes it unless `Connection: keep-alive` is present.
    pub fn keep_alive(&self) -> bool {
        let tokens = self.headers().get_all(CONNECTION);
        match self.version() {
            Version::HTTP_11 => !tokens.iter().any(|v| has_token(v, "close")),
            Version::HTTP_10 => tokens.iter().any(|v| has_token(v, "keep-alive")),
            _ => false,
        }
    }
}

fn has_token(value: &HeaderValue, token: &str) -> bool {
    value.as_bytes().split(|b| *b == b',').any(|t| t.trim_ascii().eq_ignore_ascii_case(token.as_bytes()))
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: Version, connection: Option<&str>) -> RequestHeader {
        let mut builder = Request::builder().method(Method::GET).uri("/").version(version);
        if let Some(value) = connection {
            builder = builder.header(CONNECTION, value);
        }
        builder.body(()).unwrap().into()
    }

    #[test]
    fn http11_defaults_to_keep_alive() {
        assert!(header(Version::HTTP_11, None).keep_alive());
        assert!(header(Version::HTTP_11, Some("keep-alive")).keep_alive());
        assert!(!header(Version::HTTP_11, Some("close")).keep_alive());
        assert!(!header(Version::HTTP_11, Some("Upgrade, Close")).keep_alive());
    }

    #[test]
    fn http10_defaults_to_close() {
        assert!(!header(Version::HTTP_10, None).keep_alive());
        assert!(header(Version::HTTP_10, Some("Keep-Alive")).keep_alive());
    }
}
