//! A completion-driven HTTP/1.1 connection session
//!
//! This crate implements the lifecycle of one server-side HTTP connection as a
//! sans-IO state machine: receive, parse, dispatch, send, and then either
//! start over on the same connection (keep-alive) or tear down. The session
//! never blocks and never performs I/O itself; it issues operations on a
//! [`transport::Transport`] and is advanced with their completions.
//!
//! # Features
//!
//! - One reusable buffer per connection, used for both request bytes and
//!   staged response headers
//! - Keep-alive negotiation with an advertised idle timeout and request budget
//! - Pipelined requests served in order
//! - Responses written as a single vectored send of head and body
//! - Handlers may defer a response and answer it later
//! - A tokio driver for real sockets
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::StatusCode;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn, Level};
//! use tracing_subscriber::FmtSubscriber;
//! use aio_http::connection::HttpConnection;
//! use aio_http::handler::make_handler;
//! use aio_http::server::{Server, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder()
//!         .with_max_level(Level::INFO)
//!         .finish();
//!     tracing::subscriber::set_global_default(subscriber)
//!         .expect("setting default subscriber failed");
//!
//!     let handler = make_handler(|_method, uri, mut exchange| {
//!         let body = format!("Hello {}\r\n", uri.path());
//!         if exchange.set_content_type("text/plain").is_err() {
//!             return exchange.send(StatusCode::INTERNAL_SERVER_ERROR, "");
//!         }
//!         exchange.send(StatusCode::OK, body)
//!     });
//!     let server = Arc::new(Server::with_handler(SessionConfig::default(), handler));
//!
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     loop {
//!         let (tcp_stream, peer) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let server = Arc::clone(&server);
//!         tokio::spawn(async move {
//!             if let Err(e) = HttpConnection::new(tcp_stream, peer).serve(server).await {
//!                 error!(cause = %e, "session could not start");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`session`]: the per-connection state machine, its buffer and the
//!   handler-facing [`session::Exchange`]
//! - [`codec`]: request parsing and response head encoding
//! - [`transport`]: the completion-driven I/O contract and its tokio implementation
//! - [`handler`]: the request handler contract
//! - [`server`]: handler and configuration shared by all sessions
//! - [`connection`]: the tokio event loop driving a session
//! - [`protocol`]: request and error types
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - Request bodies must be `Content-Length` delimited; chunked requests are rejected
//! - The request head must fit in the session buffer (8KB by default)
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;

mod utils;
pub(crate) use utils::ensure;
