use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

use crate::http::handler::Handler;
use crate::http::parser::{read_request, ReadError};
use crate::http::response::{default_headers, HandlerError, StatusCode};
use crate::http::writer::{BodyKind, ResponseWriter, WriteError, WriterState};

/// One client connection: reads a single request, writes a single response,
/// then closes.
pub struct Connection<S> {
    stream: S,
    read_size: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, read_size: usize) -> Self {
        Self {
            stream,
            read_size: read_size.max(1),
        }
    }

    pub async fn run<H: Handler>(mut self, handler: &H) -> anyhow::Result<()> {
        let request = match read_request(&mut self.stream, self.read_size).await {
            Ok(request) => request,

            Err(ReadError::Parse(e)) => {
                warn!(error = %e, "Rejecting malformed request");

                let mut writer = ResponseWriter::new(&mut self.stream);
                let rejection = HandlerError::bad_request(format!("{}\n", e));
                write_error_response(&mut writer, &rejection)
                    .await
                    .context("failed to write 400 response")?;
                writer.finish().await.context("failed to flush 400 response")?;

                return self.close().await;
            }

            Err(ReadError::Io(e)) => {
                return Err(e).context("failed to read request");
            }
        };

        debug!(
            method = request.method(),
            target = %request.target(),
            "Request received"
        );

        let mut writer = ResponseWriter::new(&mut self.stream);
        let outcome = handler.handle(&request, &mut writer).await;

        if let Some(violation) = writer.order_violation() {
            error!(
                method = request.method(),
                target = %request.target(),
                operation = violation.operation,
                state = ?violation.state,
                "Handler wrote response out of order"
            );
            anyhow::bail!(
                "handler attempted to write {} in state {:?}",
                violation.operation,
                violation.state
            );
        }

        if writer.has_failed() {
            anyhow::bail!("response write failed while handling request");
        }

        match outcome {
            Ok(()) => {}

            Err(handler_error) if writer.is_untouched() => {
                write_error_response(&mut writer, &handler_error)
                    .await
                    .context("failed to write handler error response")?;
            }

            Err(handler_error) => {
                warn!(
                    status = handler_error.status.as_u16(),
                    body = %String::from_utf8_lossy(&handler_error.body),
                    state = ?writer.state(),
                    "Handler failed after writing; error response suppressed"
                );
            }
        }

        complete_response(&mut writer)
            .await
            .context("failed to complete response")?;

        info!(
            method = request.method(),
            target = %request.target(),
            status = writer.status().map(|s| s.as_u16()),
            "Response sent"
        );

        self.close().await
    }

    async fn close(mut self) -> anyhow::Result<()> {
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Shutdown after response failed");
        }
        Ok(())
    }
}

/// Writes a full error response: status line, the handler's headers with
/// defaults filled in, and the body.
pub async fn write_error_response<W>(
    writer: &mut ResponseWriter<W>,
    error: &HandlerError,
) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    writer.write_status_line(error.status).await?;
    writer.write_headers(&error.response_headers()).await?;
    if !error.body.is_empty() {
        writer.write_body(&error.body).await?;
    }
    Ok(())
}

/// Brings whatever the handler left behind to a well-formed message.
///
/// Nothing written becomes an empty `200 OK`; a bare status line gets
/// zero-length default headers; an open chunked body gets its terminator.
async fn complete_response<W>(writer: &mut ResponseWriter<W>) -> Result<(), WriteError>
where
    W: AsyncWrite + Unpin,
{
    if writer.state() == WriterState::Init {
        writer.write_status_line(StatusCode::OK).await?;
    }

    if writer.state() == WriterState::StatusWritten {
        writer.write_headers(&default_headers(0)).await?;
    }

    if writer.state() == WriterState::BodyInProgress(BodyKind::Chunked) {
        writer.write_chunked_body_done().await?;
    }

    writer.finish().await
}
