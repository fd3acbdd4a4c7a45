use crate::http::headers::Headers;
use crate::http::writer::WriteError;

/// HTTP status code.
///
/// Any numeric code can be written; only the codes with a constant below
/// carry a reason phrase on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// 200 OK
    pub const OK: StatusCode = StatusCode(200);
    /// 400 Bad Request
    pub const BAD_REQUEST: StatusCode = StatusCode(400);
    /// 500 Internal Server Error
    pub const INTERNAL_SERVER_ERROR: StatusCode = StatusCode(500);

    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.as_u16(), 200);
    /// assert_eq!(StatusCode(404).as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns the reason phrase for known codes.
    ///
    /// # Example
    ///
    /// ```
    /// # use rawhttp::http::response::StatusCode;
    /// assert_eq!(StatusCode::OK.reason_phrase(), Some("OK"));
    /// assert_eq!(StatusCode(418).reason_phrase(), None);
    /// ```
    pub fn reason_phrase(&self) -> Option<&'static str> {
        match self.0 {
            200 => Some("OK"),
            400 => Some("Bad Request"),
            500 => Some("Internal Server Error"),
            _ => None,
        }
    }
}

impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        StatusCode(code)
    }
}

/// Builds the headers every plain response carries:
/// `Content-Length`, `Connection: close` and `Content-Type: text/plain`.
pub fn default_headers(content_length: usize) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", content_length.to_string());
    headers.set("Connection", "close");
    headers.set("Content-Type", "text/plain");
    headers
}

/// Returned by a handler to have the connection render an error response
/// in its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub status: StatusCode,
    /// Headers to send instead of, or on top of, the defaults
    pub headers: Option<Headers>,
    pub body: Vec<u8>,
}

impl HandlerError {
    pub fn new(status: impl Into<StatusCode>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: status.into(),
            headers: None,
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .set(name, value);
        self
    }

    pub fn bad_request(body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, body)
    }

    pub fn internal_error(body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Final header set: the handler's overrides, with any of the default
    /// headers it left unset filled in for this body.
    pub fn response_headers(&self) -> Headers {
        let mut headers = self.headers.clone().unwrap_or_default();

        for (name, value) in default_headers(self.body.len()).iter() {
            if !headers.contains(name) {
                headers.set(name, value);
            }
        }

        headers
    }
}

/// Lets handlers use `?` on writer calls. The connection checks the writer
/// itself first: an out-of-order write or a failed sink ends the connection
/// with an error and this value is never rendered.
impl From<WriteError> for HandlerError {
    fn from(err: WriteError) -> Self {
        HandlerError::internal_error(format!("{}\n", err))
    }
}
