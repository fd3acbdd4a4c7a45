use std::future::Future;

use tokio::io::AsyncWrite;

use crate::http::request::Request;
use crate::http::response::HandlerError;
use crate::http::writer::ResponseWriter;

/// Application logic invoked once per parsed request.
///
/// A handler either writes its response through `writer`, or returns a
/// [`HandlerError`] without touching the writer so the connection renders a
/// standard error response. Returning `Ok(())` without writing anything
/// produces an empty `200 OK`.
///
/// Implementations can be written with `async fn`:
///
/// ```
/// use rawhttp::http::handler::Handler;
/// use rawhttp::http::request::Request;
/// use rawhttp::http::response::{default_headers, HandlerError, StatusCode};
/// use rawhttp::http::writer::ResponseWriter;
/// use tokio::io::AsyncWrite;
///
/// struct Hello;
///
/// impl Handler for Hello {
///     async fn handle<W>(
///         &self,
///         _request: &Request,
///         writer: &mut ResponseWriter<W>,
///     ) -> Result<(), HandlerError>
///     where
///         W: AsyncWrite + Unpin + Send,
///     {
///         let body = b"hello\n";
///         writer.write_status_line(StatusCode::OK).await?;
///         writer.write_headers(&default_headers(body.len())).await?;
///         writer.write_body(body).await?;
///         Ok(())
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}
