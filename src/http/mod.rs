//! HTTP protocol implementation.
//!
//! This module implements HTTP/1.1 directly over byte streams. Every
//! connection carries exactly one request and one response, then closes.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`headers`**: Case-insensitive header collection and the one-line header parser
//! - **`parser`**: Incremental request parser state machine and the stream read loop
//! - **`request`**: Parsed request representation
//! - **`response`**: Status codes, default headers and handler errors
//! - **`writer`**: Order-checked response writer, including chunked bodies and trailers
//! - **`handler`**: The trait application code implements
//! - **`connection`**: Ties parsing, the handler and the writer together for one connection
//!
//! # Request Parser State Machine
//!
//! ```text
//!        ┌──────────────────────┐
//!        │ AwaitingRequestLine  │ ← Wait for `METHOD TARGET HTTP/1.1\r\n`
//!        └──────────┬───────────┘
//!                   ▼
//!        ┌──────────────────────┐
//!        │   ParsingHeaders     │ ← One `Name: Value\r\n` per step
//!        └──────────┬───────────┘
//!                   │ blank line
//!                   ▼
//!        ┌──────────────────────┐
//!        │    ParsingBody       │ ← Exactly Content-Length bytes, if declared
//!        └──────────┬───────────┘
//!                   ▼
//!        ┌──────────────────────┐
//!        │        Done          │
//!        └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rawhttp::http::connection::Connection;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:42069").await?;
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         tokio::spawn(async move {
//!             if let Err(e) = Connection::new(socket, 1024).run(&MyHandler).await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod connection;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
