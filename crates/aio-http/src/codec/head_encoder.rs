//! Response head serialization.
//!
//! Produces the head block of a response:
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Server: <name>\r\n
//! Connection: keep-alive\r\n
//! Keep-Alive: timeout=5, max=100\r\n
//! <staged user headers>
//! Content-Length: <n>\r\n
//! \r\n
//! ```
//!
//! The body is never copied here; the session sends it as a second block of
//! the same vectored write.

use std::io;
use std::io::Write;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use http::StatusCode;

/// Bytes reserved up front for the fixed part of the head
const FIXED_HEAD_SIZE: usize = 160;

/// How the response tells the peer what happens to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Advertise keep-alive with the idle timeout and the remaining request budget.
    KeepAlive { timeout: Duration, max: usize },
    /// Announce that the connection closes after this response.
    Close,
}

impl ConnectionMode {
    pub fn is_keep_alive(&self) -> bool {
        matches!(self, ConnectionMode::KeepAlive { .. })
    }
}

/// Encoder for the head block of one response.
#[derive(Debug)]
pub struct ResponseHeadEncoder<'a> {
    server_name: &'a str,
    connection: ConnectionMode,
}

impl<'a> ResponseHeadEncoder<'a> {
    pub fn new(server_name: &'a str, connection: ConnectionMode) -> Self {
        Self { server_name, connection }
    }

    /// Writes the head into `dst`.
    ///
    /// `staged` must already be a sequence of complete `name: value\r\n`
    /// lines; it is copied verbatim between the connection headers and
    /// `Content-Length`.
    pub fn encode(&self, status: StatusCode, staged: &[u8], content_length: usize, dst: &mut BytesMut) {
        dst.reserve(FIXED_HEAD_SIZE + self.server_name.len() + staged.len());

        // the reason phrase is always "OK", whatever the code
        write_fmt(dst, format_args!("HTTP/1.1 {} OK\r\n", status.as_str()));
        write_fmt(dst, format_args!("Server: {}\r\n", self.server_name));

        match self.connection {
            ConnectionMode::KeepAlive { timeout, max } => {
                dst.put_slice(b"Connection: keep-alive\r\n");
                write_fmt(dst, format_args!("Keep-Alive: timeout={}, max={}\r\n", timeout.as_secs(), max));
            }
            ConnectionMode::Close => dst.put_slice(b"Connection: close\r\n"),
        }

        dst.put_slice(staged);
        write_fmt(dst, format_args!("Content-Length: {content_length}\r\n\r\n"));
    }
}

fn write_fmt(dst: &mut BytesMut, args: std::fmt::Arguments<'_>) {
    // FastWrite never fails
    let _ = FastWrite(dst).write_fmt(args);
}

/// Fast writer implementation for writing to BytesMut.
///
/// Avoids going through an intermediate `String` when formatting numbers
/// into the head buffer.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_alive_head() {
        let encoder = ResponseHeadEncoder::new("aio-http", ConnectionMode::KeepAlive { timeout: Duration::from_secs(5), max: 100 });
        let mut dst = BytesMut::new();
        encoder.encode(StatusCode::OK, b"X-Test: 1\r\n", 2, &mut dst);

        assert_eq!(
            &dst[..],
            &b"HTTP/1.1 200 OK\r\n\
               Server: aio-http\r\n\
               Connection: keep-alive\r\n\
               Keep-Alive: timeout=5, max=100\r\n\
               X-Test: 1\r\n\
               Content-Length: 2\r\n\r\n"[..]
        );
    }

    #[test]
    fn close_head_keeps_ok_reason() {
        let encoder = ResponseHeadEncoder::new("aio-http", ConnectionMode::Close);
        let mut dst = BytesMut::new();
        encoder.encode(StatusCode::NOT_FOUND, b"", 0, &mut dst);

        let head = std::str::from_utf8(&dst).unwrap();
        assert!(head.starts_with("HTTP/1.1 404 OK\r\n"));
        assert!(head.contains("Connection: close\r\n"));
        assert!(!head.contains("Keep-Alive"));
        assert!(head.ends_with("Content-Length: 0\r\n\r\n"));
    }

    #[test]
    fn unknown_status_uses_ok_reason() {
        let encoder = ResponseHeadEncoder::new("aio-http", ConnectionMode::Close);
        let mut dst = BytesMut::new();
        encoder.encode(StatusCode::from_u16(299).unwrap(), b"", 0, &mut dst);

        assert!(dst.starts_with(b"HTTP/1.1 299 OK\r\n"));
    }
}
