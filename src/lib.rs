//! rawhttp - HTTP/1.1 over raw byte streams
//!
//! Incremental request parsing and order-checked response writing,
//! one request per connection.

pub mod config;
pub mod http;
pub mod server;
