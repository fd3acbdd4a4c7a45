use rawhttp::config::Config;
use rawhttp::http::handler::Handler;
use rawhttp::http::headers::Headers;
use rawhttp::http::request::Request;
use rawhttp::http::response::{default_headers, HandlerError, StatusCode};
use rawhttp::http::writer::ResponseWriter;
use rawhttp::server::Server;
use tokio::io::AsyncWrite;

struct DemoHandler;

impl Handler for DemoHandler {
    async fn handle<W>(
        &self,
        request: &Request,
        writer: &mut ResponseWriter<W>,
    ) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match request.target().as_ref() {
            "/yourproblem" => Err(HandlerError::bad_request("Your problem is not my problem\n")),
            "/myproblem" => Err(HandlerError::internal_error("Woopsie, my bad\n")),
            "/chunked" => write_chunked(writer).await,
            _ => {
                let body = b"All good, frfr\n";
                writer.write_status_line(StatusCode::OK).await?;
                writer.write_headers(&default_headers(body.len())).await?;
                writer.write_body(body).await?;
                Ok(())
            }
        }
    }
}

async fn write_chunked<W>(writer: &mut ResponseWriter<W>) -> Result<(), HandlerError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut headers = default_headers(0);
    headers.remove("Content-Length");
    headers.set("Transfer-Encoding", "chunked");
    headers.set("Trailer", "X-Content-Length");

    writer.write_status_line(StatusCode::OK).await?;
    writer.write_headers(&headers).await?;

    let mut total = 0;
    for line in ["one\n", "two\n", "three\n"] {
        total += writer.write_chunked_body(line.as_bytes()).await?;
    }
    writer.write_chunked_body_done().await?;

    let mut trailers = Headers::new();
    trailers.set("X-Content-Length", total.to_string());
    writer.write_trailers(&trailers).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let server = Server::bind(&cfg.server, DemoHandler).await?;
    let handle = server.handle();
    let mut serving = tokio::spawn(server.run());

    tokio::select! {
        res = &mut serving => {
            return res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    handle.close();
    serving.await??;

    tracing::info!("Server gracefully stopped");
    Ok(())
}
