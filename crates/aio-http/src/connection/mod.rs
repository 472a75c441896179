//! Tokio connection driver.
//!
//! [`HttpConnection`] owns the event loop for one accepted socket: it creates
//! the [`Session`](crate::session::Session), waits for the completion of the
//! session's outstanding operation on a [`TokioTransport`](crate::transport::TokioTransport)
//! and feeds it back until the session closes.
//!
//! # Features
//!
//! - Keep-alive idle timeout while waiting for request bytes
//! - Requests left deferred on the connection are answered with `500`
//! - Creation failures are returned before any request is read

mod http_connection;

pub use http_connection::HttpConnection;
