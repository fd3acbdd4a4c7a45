use std::borrow::Cow;

use crate::http::headers::Headers;

/// The first line of a request: `METHOD SP TARGET SP HTTP/1.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    /// Uppercase method token (e.g. "GET")
    pub method: String,
    /// Request target, raw bytes exactly as received (e.g. "/search?q=rust")
    pub target: Vec<u8>,
    /// Protocol version without the `HTTP/` prefix; always "1.1"
    pub version: String,
}

/// Represents a fully received HTTP request.
///
/// Header names are lowercase. The body holds exactly `Content-Length` bytes,
/// or nothing when that header was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> &str {
        &self.request_line.method
    }

    /// Target as text; bytes that are not UTF-8 show as U+FFFD.
    pub fn target(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.request_line.target)
    }

    pub fn target_bytes(&self) -> &[u8] {
        &self.request_line.target
    }

    /// Retrieves a header value by name, ignoring case. `None` if absent or
    /// not UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn header_bytes(&self, name: &str) -> Option<&[u8]> {
        self.headers.get_bytes(name)
    }
}
