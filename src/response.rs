//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Build a [`Response`] in your handler and return it. The server converts
//! it into the `http::Response` hyper writes to the wire.

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Content-type values the service emits, including the static-asset types
/// the pipeline resolves from file extensions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,         // text/css
    Html,        // text/html; charset=utf-8
    Javascript,  // text/javascript
    Json,        // application/json
    OctetStream, // application/octet-stream
    Png,         // image/png
    Svg,         // image/svg+xml
    Text,        // text/plain; charset=utf-8
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css",
            Self::Html        => "text/html; charset=utf-8",
            Self::Javascript  => "text/javascript",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }

    /// Maps a file extension to a content type, for static-asset responses.
    /// Unknown extensions are served as opaque bytes.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "css"          => Self::Css,
            "htm" | "html" => Self::Html,
            "js"           => Self::Javascript,
            "json"         => Self::Json,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            _              => Self::OctetStream,
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK, no custom headers needed)
///
/// ```rust
/// use weathervane::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use weathervane::Response;
/// use http::StatusCode;
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK` — `application/json`. Pass bytes from your serializer
    /// directly, e.g. `serde_json::to_vec(&val)`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::with_content_type(ContentType::Json, body.into())
    }

    /// `200 OK` — `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_content_type(ContentType::Text, Bytes::from(body.into().into_bytes()))
    }

    /// Response with no body.
    pub fn status(status: StatusCode) -> Self {
        Self { status, headers: HeaderMap::new(), body: Bytes::new() }
    }

    /// `307 Temporary Redirect` to `location`. 307 keeps the method and body
    /// intact across the redirect, which is what the transport-security
    /// stage needs.
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::status(StatusCode::TEMPORARY_REDIRECT);
        if let Ok(value) = HeaderValue::from_str(location) {
            response.headers.insert(http::header::LOCATION, value);
        }
        response
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { status: StatusCode::OK, headers: HeaderMap::new() }
    }

    fn with_content_type(content_type: ContentType, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(content_type.as_str()),
        );
        Self { status: StatusCode::OK, headers, body }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    /// Header lookup; `None` for absent or non-UTF-8 values.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Sets a header, replacing any existing value. Used by the pipeline to
    /// attach HSTS and CORS headers on the way out.
    pub(crate) fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut inner = http::Response::new(Full::new(self.body));
        *inner.status_mut() = self.status;
        *inner.headers_mut() = self.headers;
        inner
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
}

impl ResponseBuilder {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header. Invalid names or values are dropped rather than
    /// panicking mid-request.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) =
            (name.parse::<HeaderName>(), HeaderValue::from_str(value))
        {
            self.headers.append(name, value);
        }
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(ContentType::Json, body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(ContentType::Text, Bytes::from(body.into().into_bytes()))
    }

    /// Terminate with a typed body.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type, body.into())
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(self, content_type: ContentType, body: Bytes) -> Response {
        let mut headers = self.headers;
        headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static(content_type.as_str()),
        );
        Response { status: self.status, headers, body }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

/// Return a bare status from a handler: `return StatusCode::NOT_FOUND`.
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_carries_location() {
        let res = Response::redirect("https://example.com/x");
        assert_eq!(res.status_code(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.header("location"), Some("https://example.com/x"));
        assert!(res.body().is_empty());
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(ContentType::from_extension("html"), ContentType::Html);
        assert_eq!(ContentType::from_extension("css"), ContentType::Css);
        assert_eq!(ContentType::from_extension("wasm"), ContentType::OctetStream);
    }

    #[test]
    fn builder_sets_status_and_headers() {
        let res = Response::builder()
            .status(StatusCode::CREATED)
            .header("location", "/users/99")
            .json(br#"{"id":99}"#.to_vec());
        assert_eq!(res.status_code(), StatusCode::CREATED);
        assert_eq!(res.header("location"), Some("/users/99"));
        assert_eq!(res.header("content-type"), Some("application/json"));
    }
}
