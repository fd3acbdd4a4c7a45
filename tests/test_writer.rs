use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use rawhttp::http::headers::Headers;
use rawhttp::http::response::{default_headers, HandlerError, StatusCode};
use rawhttp::http::writer::{BodyKind, OrderViolation, ResponseWriter, WriteError, WriterState};
use tokio::io::AsyncWrite;

/// Sink that refuses every write, like a peer that has gone away.
struct BrokenSink;

impl AsyncWrite for BrokenSink {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &[u8]) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn text(writer: ResponseWriter<Vec<u8>>) -> String {
    String::from_utf8(writer.into_inner()).unwrap()
}

/// Strips chunk framing and returns the concatenated payload plus whatever
/// follows the terminator chunk.
fn dechunk(mut data: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut body = Vec::new();

    loop {
        let line_end = data.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(std::str::from_utf8(&data[..line_end]).unwrap(), 16).unwrap();
        data = &data[line_end + 2..];

        if size == 0 {
            return (body, data.to_vec());
        }

        body.extend_from_slice(&data[..size]);
        assert_eq!(&data[size..size + 2], b"\r\n");
        data = &data[size + 2..];
    }
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::OK.reason_phrase(), Some("OK"));
    assert_eq!(StatusCode::BAD_REQUEST.reason_phrase(), Some("Bad Request"));
    assert_eq!(
        StatusCode::INTERNAL_SERVER_ERROR.reason_phrase(),
        Some("Internal Server Error")
    );
    assert_eq!(StatusCode(404).reason_phrase(), None);
}

#[test]
fn test_default_headers() {
    let headers = default_headers(42);

    assert_eq!(headers.len(), 3);
    assert_eq!(headers.get("Content-Length"), Some("42"));
    assert_eq!(headers.get("Connection"), Some("close"));
    assert_eq!(headers.get("Content-Type"), Some("text/plain"));
}

#[tokio::test]
async fn test_full_response_is_byte_exact() {
    let mut writer = ResponseWriter::new(Vec::new());
    let body = b"Hello World!\n";

    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&default_headers(body.len())).await.unwrap();
    let n = writer.write_body(body).await.unwrap();

    assert_eq!(n, 13);
    assert_eq!(
        text(writer),
        "HTTP/1.1 200 OK\r\nContent-Length: 13\r\nConnection: close\r\nContent-Type: text/plain\r\n\r\nHello World!\n"
    );
}

#[tokio::test]
async fn test_unknown_status_has_no_reason() {
    let mut writer = ResponseWriter::new(Vec::new());

    writer.write_status_line(StatusCode(418)).await.unwrap();

    assert_eq!(text(writer), "HTTP/1.1 418\r\n");
}

#[tokio::test]
async fn test_extra_headers_follow_preferred_in_sorted_order() {
    let mut writer = ResponseWriter::new(Vec::new());
    let mut headers = default_headers(0);
    headers.set("X-Zeta", "z");
    headers.set("Cache-Control", "no-cache");
    headers.set("Date", "today");

    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&headers).await.unwrap();

    assert_eq!(
        text(writer),
        "HTTP/1.1 200 OK\r\n\
         Content-Length: 0\r\n\
         Connection: close\r\n\
         Content-Type: text/plain\r\n\
         Cache-Control: no-cache\r\n\
         Date: today\r\n\
         X-Zeta: z\r\n\
         \r\n"
    );
}

#[tokio::test]
async fn test_headers_before_status_rejected() {
    let mut writer = ResponseWriter::new(Vec::new());

    let result = writer.write_headers(&default_headers(0)).await;

    assert!(matches!(
        result,
        Err(WriteError::InvalidWriteOrder {
            state: WriterState::Init,
            ..
        })
    ));
    assert!(writer.into_inner().is_empty());
}

#[tokio::test]
async fn test_body_before_headers_rejected() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();

    let result = writer.write_body(b"too early").await;

    assert!(matches!(result, Err(WriteError::InvalidWriteOrder { .. })));
    assert_eq!(writer.state(), WriterState::StatusWritten);
}

#[tokio::test]
async fn test_status_and_headers_cannot_be_rewritten() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&default_headers(2)).await.unwrap();
    writer.write_body(b"ok").await.unwrap();

    assert!(writer.write_status_line(StatusCode::OK).await.is_err());
    assert!(writer.write_headers(&default_headers(2)).await.is_err());
    assert_eq!(writer.state(), WriterState::BodyInProgress(BodyKind::Fixed));
}

#[tokio::test]
async fn test_body_may_be_written_in_parts() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&default_headers(6)).await.unwrap();

    writer.write_body(b"abc").await.unwrap();
    writer.write_body(b"def").await.unwrap();

    assert!(text(writer).ends_with("\r\n\r\nabcdef"));
}

#[tokio::test]
async fn test_chunked_body_with_trailers() {
    let mut writer = ResponseWriter::new(Vec::new());
    let mut headers = Headers::new();
    headers.set("Transfer-Encoding", "chunked");

    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&headers).await.unwrap();
    writer.write_chunked_body(b"Hello, ").await.unwrap();
    writer.write_chunked_body(b"chunked world!\n").await.unwrap();
    writer.write_chunked_body_done().await.unwrap();

    let mut trailers = Headers::new();
    trailers.set("X-Content-Length", "22");
    trailers.set("X-Content-Digest", "abc");
    writer.write_trailers(&trailers).await.unwrap();

    assert_eq!(
        text(writer),
        "HTTP/1.1 200 OK\r\n\
         Transfer-Encoding: chunked\r\n\
         \r\n\
         7\r\nHello, \r\n\
         f\r\nchunked world!\n\r\n\
         0\r\n\
         X-Content-Digest: abc\r\n\
         X-Content-Length: 22\r\n\
         \r\n"
    );
}

#[tokio::test]
async fn test_chunked_payloads_reassemble_body() {
    let body: Vec<u8> = (0..=255u8).cycle().take(5000).collect();
    let mut writer = ResponseWriter::new(Vec::new());

    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&Headers::new()).await.unwrap();
    for chunk in body.chunks(777) {
        let n = writer.write_chunked_body(chunk).await.unwrap();
        assert_eq!(n, chunk.len());
    }
    writer.write_chunked_body_done().await.unwrap();
    writer.finish().await.unwrap();

    let out = writer.into_inner();
    let headers_end = out.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
    let (payload, rest) = dechunk(&out[headers_end..]);

    assert_eq!(payload, body);
    assert_eq!(rest, b"\r\n".to_vec());
}

#[tokio::test]
async fn test_empty_chunk_writes_nothing() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&Headers::new()).await.unwrap();

    let n = writer.write_chunked_body(b"").await.unwrap();

    assert_eq!(n, 0);
    assert_eq!(writer.state(), WriterState::BodyInProgress(BodyKind::Chunked));
    assert!(text(writer).ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_trailers_require_terminator() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&Headers::new()).await.unwrap();
    writer.write_chunked_body(b"data").await.unwrap();

    let result = writer.write_trailers(&Headers::new()).await;

    assert!(matches!(result, Err(WriteError::InvalidWriteOrder { .. })));
}

#[tokio::test]
async fn test_fixed_and_chunked_bodies_do_not_mix() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&Headers::new()).await.unwrap();
    writer.write_body(b"plain").await.unwrap();

    assert!(writer.write_chunked_body(b"chunk").await.is_err());
    assert!(writer.write_chunked_body_done().await.is_err());
}

#[tokio::test]
async fn test_finish_closes_terminated_chunked_body() {
    let mut writer = ResponseWriter::new(Vec::new());
    writer.write_status_line(StatusCode::OK).await.unwrap();
    writer.write_headers(&Headers::new()).await.unwrap();
    writer.write_chunked_body_done().await.unwrap();

    writer.finish().await.unwrap();

    assert_eq!(writer.state(), WriterState::BodyInProgress(BodyKind::Complete));
    assert!(text(writer).ends_with("\r\n\r\n0\r\n\r\n"));
}

#[test]
fn test_handler_error_fills_missing_default_headers() {
    let error = HandlerError::bad_request("nope\n").with_header("Content-Type", "text/html");

    let headers = error.response_headers();

    assert_eq!(headers.get("content-type"), Some("text/html"));
    assert_eq!(headers.get("content-length"), Some("5"));
    assert_eq!(headers.get("connection"), Some("close"));
}

#[tokio::test]
async fn test_writer_is_closed_after_sink_failure() {
    let mut writer = ResponseWriter::new(BrokenSink);

    let first = writer.write_status_line(StatusCode::OK).await;

    assert!(matches!(first, Err(WriteError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe));
    assert!(writer.has_failed());
    assert!(!writer.is_untouched());
    assert_eq!(writer.state(), WriterState::Init);

    assert!(matches!(
        writer.write_status_line(StatusCode::OK).await,
        Err(WriteError::Closed)
    ));
    assert!(matches!(
        writer.write_headers(&Headers::new()).await,
        Err(WriteError::Closed)
    ));
    assert!(matches!(writer.write_body(b"x").await, Err(WriteError::Closed)));
    assert!(matches!(writer.finish().await, Err(WriteError::Closed)));
    assert_eq!(writer.order_violation(), None);
}

#[tokio::test]
async fn test_first_order_violation_is_recorded() {
    let mut writer = ResponseWriter::new(Vec::new());

    let _ = writer.write_headers(&Headers::new()).await;
    writer.write_status_line(StatusCode::OK).await.unwrap();
    let _ = writer.write_trailers(&Headers::new()).await;

    assert_eq!(
        writer.order_violation(),
        Some(OrderViolation {
            operation: "headers",
            state: WriterState::Init,
        })
    );
    assert_eq!(text(writer), "HTTP/1.1 200 OK\r\n");
}
