//! Wire-level codecs used by the session.
//!
//! - Request side: the [`RequestParser`] contract and its `httparse` based
//!   implementation [`HttpParser`]
//! - Response side: [`ResponseHeadEncoder`], which serializes the status line,
//!   the connection-management headers, the handler's staged headers and the
//!   `Content-Length` into one head block
//!
//! # Example
//!
//! ```
//! use aio_http::codec::{HttpParser, ParseStatus, RequestParser};
//! use bytes::BytesMut;
//!
//! let mut parser = HttpParser::default();
//! let mut buffer = BytesMut::from(&b"GET /index.html HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]);
//!
//! assert_eq!(parser.feed(&mut buffer).unwrap(), ParseStatus::Complete);
//! assert_eq!(parser.target_uri().unwrap().path(), "/index.html");
//! ```

mod head_encoder;
mod request_parser;

pub use head_encoder::{ConnectionMode, ResponseHeadEncoder};
pub use request_parser::{DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_HEADER_BYTES, HttpParser};

use bytes::BytesMut;
use http::{HeaderValue, Method, Uri};

use crate::protocol::{ParseError, RequestHeader};

/// Outcome of feeding bytes to a [`RequestParser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// The request is not complete yet; feed more bytes.
    NeedMore,
    /// A whole request (head and body) has been parsed.
    Complete,
}

/// Incremental request parser contract used by the session.
///
/// `feed` removes the bytes it consumed from `src` and leaves everything
/// else, so the caller can append newly received bytes after the unconsumed
/// tail. Accessors only return data once a request is complete.
pub trait RequestParser {
    /// Clears all state of the previous request.
    fn reset(&mut self);

    fn feed(&mut self, src: &mut BytesMut) -> Result<ParseStatus, ParseError>;

    /// The parsed request head, if a request is complete.
    fn request(&self) -> Option<&RequestHeader>;

    fn body(&self) -> &[u8];

    fn method(&self) -> Option<&Method> {
        self.request().map(RequestHeader::method)
    }

    fn target_uri(&self) -> Option<&Uri> {
        self.request().map(RequestHeader::uri)
    }

    fn header(&self, name: &str) -> Option<&HeaderValue> {
        self.request().and_then(|header| header.headers().get(name))
    }
}
