//! Incremental HTTP/1.1 request parser.
//!
//! Bytes may arrive in fragments of any size. [`ParserState::advance`] is a
//! pure transition over one state; [`RequestParser`] drives it as far as the
//! buffered bytes allow, and [`read_request`] feeds it from a stream.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::headers::{find_crlf, HeaderError, Headers, CRLF};
use crate::http::request::{Request, RequestLine};

const VERSION_PREFIX: &str = "HTTP/";
const SUPPORTED_VERSION: &str = "1.1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid request line: want 3 parts")]
    MalformedRequestLine,

    #[error("invalid method")]
    InvalidMethod,

    #[error("invalid http version format")]
    InvalidVersionFormat,

    #[error("unsupported http version")]
    UnsupportedVersion,

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error("invalid content-length")]
    InvalidContentLength,

    #[error("body exceeds Content-Length")]
    BodyExceedsContentLength,

    #[error("incomplete request")]
    Incomplete,

    #[error("parser already failed")]
    ParserFailed,
}

/// Failure while reading a request off a stream.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the parser is in the message. Only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    AwaitingRequestLine,
    ParsingHeaders {
        request_line: RequestLine,
        headers: Headers,
    },
    ParsingBody {
        request_line: RequestLine,
        headers: Headers,
        body: Vec<u8>,
    },
    Done(Request),
}

impl ParserState {
    /// Advances by at most one step over `data`, returning the next state and
    /// the number of bytes consumed. A step that needs more input returns the
    /// same state and consumes nothing.
    pub fn advance(self, data: &[u8]) -> Result<(ParserState, usize), ParseError> {
        match self {
            ParserState::AwaitingRequestLine => {
                let Some(idx) = find_crlf(data) else {
                    return Ok((ParserState::AwaitingRequestLine, 0));
                };

                let request_line = parse_request_line(&data[..idx])?;

                Ok((
                    ParserState::ParsingHeaders {
                        request_line,
                        headers: Headers::new(),
                    },
                    idx + CRLF.len(),
                ))
            }

            ParserState::ParsingHeaders {
                request_line,
                mut headers,
            } => {
                let (n, done) = headers.parse_line(data)?;

                let next = if done {
                    ParserState::ParsingBody {
                        request_line,
                        headers,
                        body: Vec::new(),
                    }
                } else {
                    ParserState::ParsingHeaders {
                        request_line,
                        headers,
                    }
                };

                Ok((next, n))
            }

            ParserState::ParsingBody {
                request_line,
                headers,
                mut body,
            } => {
                let Some(expected) = content_length(&headers)? else {
                    // No declared length means no body; leftover bytes are ignored.
                    let request = Request {
                        request_line,
                        headers,
                        body,
                    };
                    return Ok((ParserState::Done(request), 0));
                };

                body.extend_from_slice(data);

                if body.len() > expected {
                    return Err(ParseError::BodyExceedsContentLength);
                }

                let next = if body.len() == expected {
                    ParserState::Done(Request {
                        request_line,
                        headers,
                        body,
                    })
                } else {
                    ParserState::ParsingBody {
                        request_line,
                        headers,
                        body,
                    }
                };

                Ok((next, data.len()))
            }

            done @ ParserState::Done(_) => Ok((done, 0)),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ParserState::Done(_))
    }
}

/// Stateful wrapper that runs [`ParserState`] transitions until the buffered
/// input is exhausted or the request is complete.
///
/// After a call to [`RequestParser::parse`] returns an error the parser is
/// spent and every further call fails with [`ParseError::ParserFailed`].
#[derive(Debug)]
pub struct RequestParser {
    state: Option<ParserState>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: Some(ParserState::AwaitingRequestLine),
        }
    }

    /// Feeds buffered bytes to the state machine and returns how many were
    /// consumed. The caller must drop consumed bytes from the front of its
    /// buffer before the next call.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        let mut consumed = 0;

        loop {
            let state = self.state.take().ok_or(ParseError::ParserFailed)?;
            let before = std::mem::discriminant(&state);

            let (next, n) = state.advance(&data[consumed..])?;
            consumed += n;

            let moved = n > 0 || std::mem::discriminant(&next) != before;
            let done = next.is_done();
            self.state = Some(next);

            if done || !moved {
                return Ok(consumed);
            }
        }
    }

    pub fn state(&self) -> Option<&ParserState> {
        self.state.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.state.as_ref().is_some_and(ParserState::is_done)
    }

    /// Returns the finished request, or `None` if parsing has not completed.
    pub fn into_request(self) -> Option<Request> {
        match self.state {
            Some(ParserState::Done(request)) => Some(request),
            _ => None,
        }
    }
}

/// Reads exactly one request from `reader`.
///
/// Buffered bytes are fed to the parser after every read. When the stream
/// ends before the request is complete the result is
/// [`ParseError::Incomplete`]; partial requests are never returned.
pub async fn read_request<R>(reader: &mut R, read_size: usize) -> Result<Request, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(read_size);
    let mut parser = RequestParser::new();

    loop {
        buffer.reserve(read_size);
        let n = reader.read_buf(&mut buffer).await?;
        let eof = n == 0;

        let consumed = parser.parse(&buffer)?;
        buffer.advance(consumed);

        if parser.is_done() {
            break;
        }

        if eof {
            return Err(ParseError::Incomplete.into());
        }
    }

    parser
        .into_request()
        .ok_or(ReadError::Parse(ParseError::Incomplete))
}

fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    let parts: Vec<&[u8]> = line
        .split(|b| b.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect();
    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    if !method.iter().all(|b| b.is_ascii_uppercase()) {
        return Err(ParseError::InvalidMethod);
    }

    let version = version
        .strip_prefix(VERSION_PREFIX.as_bytes())
        .ok_or(ParseError::InvalidVersionFormat)?;

    if version != SUPPORTED_VERSION.as_bytes() {
        return Err(ParseError::UnsupportedVersion);
    }

    Ok(RequestLine {
        // Uppercase ASCII only, checked above.
        method: method.iter().map(|&b| b as char).collect(),
        target: target.to_vec(),
        version: SUPPORTED_VERSION.to_string(),
    })
}

fn content_length(headers: &Headers) -> Result<Option<usize>, ParseError> {
    let Some(value) = headers.get_bytes("content-length") else {
        return Ok(None);
    };

    if value.is_empty() || !value.iter().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidContentLength);
    }

    value
        .iter()
        .try_fold(0usize, |n, &b| {
            n.checked_mul(10)?.checked_add(usize::from(b - b'0'))
        })
        .map(Some)
        .ok_or(ParseError::InvalidContentLength)
}
