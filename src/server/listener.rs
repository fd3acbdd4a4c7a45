use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::Connection;
use crate::http::handler::Handler;

#[derive(Debug, Default)]
struct Shutdown {
    closed: AtomicBool,
    notify: Notify,
}

/// Accept loop. Each accepted connection runs in its own task and is never
/// cancelled by shutdown.
pub struct Server<H> {
    listener: TcpListener,
    handler: Arc<H>,
    read_buffer_size: usize,
    shutdown: Arc<Shutdown>,
}

/// Cloneable handle used to stop a running [`Server`].
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<Shutdown>,
}

impl ServerHandle {
    /// Stops accepting new connections. Connections already accepted run to
    /// completion.
    pub fn close(&self) {
        if !self.shutdown.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.notify.notify_one();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.closed.load(Ordering::Acquire)
    }
}

impl<H: Handler> Server<H> {
    pub async fn bind(cfg: &ServerConfig, handler: H) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&cfg.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            read_buffer_size: cfg.read_buffer_size,
            shutdown: Arc::new(Shutdown::default()),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Accepts connections until [`ServerHandle::close`] is called.
    pub async fn run(self) -> anyhow::Result<()> {
        info!("Listening on {}", self.local_addr()?);

        loop {
            if self.shutdown.closed.load(Ordering::Acquire) {
                break;
            }

            let accepted = tokio::select! {
                res = self.listener.accept() => res,
                _ = self.shutdown.notify.notified() => continue,
            };

            let (socket, peer) = match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    if self.shutdown.closed.load(Ordering::Acquire) {
                        break;
                    }
                    warn!(error = %e, "Accept failed");
                    continue;
                }
            };

            info!(peer = %peer, "Accepted connection");

            let handler = self.handler.clone();
            let read_size = self.read_buffer_size;
            tokio::spawn(async move {
                let conn = Connection::new(socket, read_size);
                if let Err(e) = conn.run(handler.as_ref()).await {
                    error!(peer = %peer, error = %format!("{:#}", e), "Connection error");
                }
            });
        }

        info!("Server closed");
        Ok(())
    }
}
