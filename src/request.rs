//! Incoming HTTP request type.
//!
//! A [`Request`] is built once per inbound request and then owned by the
//! pipeline: stages read it, the forwarded-header stage may rewrite its
//! [`Origin`], and exactly one handler finally consumes it. The process-wide
//! [`Logger`](crate::logging::Logger) handle rides along so handlers log
//! through the facade without reaching for globals.

use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::logging::{Logger, SharedLogger, TracingLogger};
use crate::method::Method;

// ── Origin ────────────────────────────────────────────────────────────────────

/// Transport scheme the request (apparently) arrived over.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn is_secure(self) -> bool {
        matches!(self, Self::Https)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request's apparent origin: client address, transport scheme, host.
///
/// Initialized from the literal transport peer and listener. When the
/// forwarded-header trust policy accepts proxy headers, the pipeline rewrites
/// these values before any later stage or handler observes them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Origin {
    client: IpAddr,
    scheme: Scheme,
    host: String,
}

impl Origin {
    pub fn client(&self) -> IpAddr {
        self.client
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn set_client(&mut self, client: IpAddr) {
        self.client = client;
    }

    pub(crate) fn set_scheme(&mut self, scheme: Scheme) {
        self.scheme = scheme;
    }

    pub(crate) fn set_host(&mut self, host: String) {
        self.host = host;
    }
}

// ── Request ───────────────────────────────────────────────────────────────────

/// An incoming HTTP request.
pub struct Request {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    origin: Origin,
    logger: SharedLogger,
}

impl Request {
    /// Starts building a request. Used by the server for every inbound
    /// request and by tests driving the pipeline directly.
    pub fn builder(method: Method, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            origin: Origin {
                client: IpAddr::V4(Ipv4Addr::LOCALHOST),
                scheme: Scheme::Http,
                host: "localhost".to_owned(),
            },
            logger: None,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, without the leading `?`. `None` when the
    /// request target carried no query.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Case-insensitive header lookup; `None` for absent or non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The request's apparent origin, post any forwarded-header rewrite.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub(crate) fn origin_mut(&mut self) -> &mut Origin {
        &mut self.origin
    }

    /// The logging facade. One handle per process, shared into every request.
    pub fn logger(&self) -> &dyn Logger {
        &*self.logger
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

// ── RequestBuilder ────────────────────────────────────────────────────────────

/// Builder for [`Request`]. Defaults: empty body, loopback peer, `http`
/// scheme, host `localhost`, [`TracingLogger`] facade.
pub struct RequestBuilder {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    origin: Origin,
    logger: Option<SharedLogger>,
}

impl RequestBuilder {
    /// Adds a header.
    ///
    /// # Panics
    ///
    /// Panics if `name` is not a valid lowercase header name or `value`
    /// contains non-visible-ASCII bytes.
    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.append(
            HeaderName::from_static(name),
            HeaderValue::from_str(value).expect("invalid header value"),
        );
        self
    }

    /// Sets the raw query string (no leading `?`).
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn peer(mut self, client: IpAddr) -> Self {
        self.origin.client = client;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.origin.scheme = scheme;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.origin.host = host.into();
        self
    }

    pub fn logger(mut self, logger: SharedLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub(crate) fn headers_from(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            path: self.path,
            query: self.query,
            headers: self.headers,
            body: self.body,
            params: HashMap::new(),
            origin: self.origin,
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
        }
    }
}
