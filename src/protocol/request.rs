//! HTTP request head handling.
//!
//! Wraps the standard `http::Request` type with the accessors and connection
//! semantics the pipeline needs.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};

/// A parsed HTTP request head.
///
/// Handlers receive a `RequestHeader` rather than a full request: request
/// bodies are drained by the connection before dispatch, because nothing in
/// this pipeline consumes them.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// The request's HTTP method.
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    /// The request's URI.
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// The request's HTTP version.
    pub fn version(&self) -> Version {
        self.inner.version()
    }

    /// The request's headers.
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Whether this request may carry a body, based on its method.
    pub fn need_body(&self) -> bool {
        !matches!(
            self.method(),
            &Method::GET | &Method::HEAD | &Method::DELETE | &Method::OPTIONS | &Method::CONNECT
        )
    }

    /// Whether the connection should stay open after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is present;
    /// HTTP/1.0 defaults to close unless `Connection: keep-alive` is present.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers().get(header::CONNECTION).and_then(|value| value.to_str().ok());
        match self.version() {
            Version::HTTP_11 => !connection.is_some_and(|value| value.eq_ignore_ascii_case("close")),
            Version::HTTP_10 => connection.is_some_and(|value| value.eq_ignore_ascii_case("keep-alive")),
            _ => false,
        }
    }
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
