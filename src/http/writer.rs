//! Order-checked HTTP/1.1 response writer.
//!
//! Writes must follow `status -> headers -> body`, where the body is either
//! fixed bytes or a run of chunks closed by the terminator chunk and optional
//! trailers. Anything else fails with [`WriteError::InvalidWriteOrder`].

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::{Headers, CRLF};
use crate::http::response::StatusCode;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Headers emitted first, in this order, when present.
const PREFERRED_HEADERS: [&str; 3] = ["Content-Length", "Connection", "Content-Type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Init,
    StatusWritten,
    HeadersWritten,
    BodyInProgress(BodyKind),
}

/// What kind of body has been started, and how far a chunked one has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Chunked,
    /// Terminator chunk sent; trailers and the final CRLF still owed.
    ChunksTerminated,
    /// Trailer block, including its final CRLF, sent.
    Complete,
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("invalid write order: cannot write {operation} in state {state:?}")]
    InvalidWriteOrder {
        operation: &'static str,
        state: WriterState,
    },

    #[error("response writer is closed after a failed write")]
    Closed,

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders `HTTP/1.1 <code> <reason>\r\n`, omitting the reason for codes
/// that have none.
pub fn render_status_line(status: StatusCode) -> String {
    match status.reason_phrase() {
        Some(reason) => format!("{} {} {}\r\n", HTTP_VERSION, status.as_u16(), reason),
        None => format!("{} {}\r\n", HTTP_VERSION, status.as_u16()),
    }
}

/// Renders a header block: preferred headers first, the rest sorted by name,
/// then the blank line.
pub fn render_headers(headers: &Headers, buf: &mut Vec<u8>) {
    let mut rest: Vec<(&str, &[u8])> = Vec::with_capacity(headers.len());

    for (name, value) in headers.iter() {
        if !PREFERRED_HEADERS.iter().any(|p| p.eq_ignore_ascii_case(name)) {
            rest.push((name, value));
        }
    }

    for preferred in PREFERRED_HEADERS {
        if let Some((name, value)) = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(preferred))
        {
            push_header_line(buf, name, value);
        }
    }

    rest.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (name, value) in rest {
        push_header_line(buf, name, value);
    }

    buf.extend_from_slice(CRLF);
}

/// Renders trailer lines in sorted order followed by the final blank line.
pub fn render_trailers(trailers: &Headers, buf: &mut Vec<u8>) {
    let mut lines: Vec<(&str, &[u8])> = trailers.iter().collect();
    lines.sort_unstable_by(|a, b| a.0.cmp(b.0));

    for (name, value) in lines {
        push_header_line(buf, name, value);
    }

    buf.extend_from_slice(CRLF);
}

/// Renders one chunk as `<hex-len>\r\n<data>\r\n`.
pub fn render_chunk(data: &[u8], buf: &mut Vec<u8>) {
    buf.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
    buf.extend_from_slice(data);
    buf.extend_from_slice(CRLF);
}

fn push_header_line(buf: &mut Vec<u8>, name: &str, value: &[u8]) {
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value);
    buf.extend_from_slice(CRLF);
}

/// A write attempted out of order: what was attempted and the state the
/// writer was in at the time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderViolation {
    pub operation: &'static str,
    pub state: WriterState,
}

pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
    status: Option<StatusCode>,
    violation: Option<OrderViolation>,
    failed: bool,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::Init,
            status: None,
            violation: None,
            failed: false,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Status code written so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// True while nothing has been sent and no write has failed.
    pub fn is_untouched(&self) -> bool {
        self.state == WriterState::Init && !self.failed
    }

    /// The first out-of-order write attempted on this writer, if any. It stays
    /// recorded even if the caller swallowed the returned error.
    pub fn order_violation(&self) -> Option<OrderViolation> {
        self.violation
    }

    /// True once a write to the sink has failed.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), WriteError> {
        self.check("status line", |s| s == WriterState::Init)?;

        self.send(render_status_line(status).as_bytes()).await?;
        self.state = WriterState::StatusWritten;
        self.status = Some(status);
        Ok(())
    }

    pub async fn write_headers(&mut self, headers: &Headers) -> Result<(), WriteError> {
        self.check("headers", |s| s == WriterState::StatusWritten)?;

        let mut buf = Vec::new();
        render_headers(headers, &mut buf);
        self.send(&buf).await?;
        self.state = WriterState::HeadersWritten;
        Ok(())
    }

    /// Writes fixed-length body bytes. May be called repeatedly.
    pub async fn write_body(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.check("body", |s| {
            matches!(
                s,
                WriterState::HeadersWritten | WriterState::BodyInProgress(BodyKind::Fixed)
            )
        })?;

        self.send(data).await?;
        self.state = WriterState::BodyInProgress(BodyKind::Fixed);
        Ok(data.len())
    }

    /// Writes one chunk and returns the number of payload bytes sent.
    ///
    /// An empty slice writes nothing, since a zero-length chunk would end
    /// the body.
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.check("chunked body", |s| {
            matches!(
                s,
                WriterState::HeadersWritten | WriterState::BodyInProgress(BodyKind::Chunked)
            )
        })?;

        if !data.is_empty() {
            let mut buf = Vec::with_capacity(data.len() + 12);
            render_chunk(data, &mut buf);
            self.send(&buf).await?;
        }

        self.state = WriterState::BodyInProgress(BodyKind::Chunked);
        Ok(data.len())
    }

    /// Writes the zero-length terminator chunk `0\r\n`.
    pub async fn write_chunked_body_done(&mut self) -> Result<(), WriteError> {
        self.check("chunked body terminator", |s| {
            matches!(
                s,
                WriterState::HeadersWritten | WriterState::BodyInProgress(BodyKind::Chunked)
            )
        })?;

        self.send(b"0\r\n").await?;
        self.state = WriterState::BodyInProgress(BodyKind::ChunksTerminated);
        Ok(())
    }

    /// Writes the trailer lines and the final blank line of a chunked body.
    pub async fn write_trailers(&mut self, trailers: &Headers) -> Result<(), WriteError> {
        self.check("trailers", |s| {
            s == WriterState::BodyInProgress(BodyKind::ChunksTerminated)
        })?;

        let mut buf = Vec::new();
        render_trailers(trailers, &mut buf);
        self.send(&buf).await?;
        self.state = WriterState::BodyInProgress(BodyKind::Complete);
        Ok(())
    }

    /// Closes out the message and flushes the sink.
    ///
    /// A chunked body whose terminator was written without trailers gets its
    /// final blank line here.
    pub async fn finish(&mut self) -> Result<(), WriteError> {
        if self.failed {
            return Err(WriteError::Closed);
        }

        if self.state == WriterState::BodyInProgress(BodyKind::ChunksTerminated) {
            self.send(CRLF).await?;
            self.state = WriterState::BodyInProgress(BodyKind::Complete);
        }

        if let Err(e) = self.sink.flush().await {
            self.failed = true;
            return Err(e.into());
        }
        Ok(())
    }

    fn check(
        &mut self,
        operation: &'static str,
        allowed: impl Fn(WriterState) -> bool,
    ) -> Result<(), WriteError> {
        if self.failed {
            return Err(WriteError::Closed);
        }

        if !allowed(self.state) {
            self.violation.get_or_insert(OrderViolation {
                operation,
                state: self.state,
            });
            return Err(WriteError::InvalidWriteOrder {
                operation,
                state: self.state,
            });
        }

        Ok(())
    }

    async fn send(&mut self, data: &[u8]) -> Result<(), WriteError> {
        if let Err(e) = self.sink.write_all(data).await {
            self.failed = true;
            return Err(e.into());
        }
        Ok(())
    }
}
