//! Incremental HTTP/1.x request parser backed by `httparse`.
//!
//! The parser works in two phases:
//!
//! 1. Head: re-parse the buffered bytes with `httparse` until the head is
//!    complete, then split it off the source buffer
//! 2. Body: move up to `Content-Length` bytes from the source buffer into the
//!    parser's own body buffer
//!
//! Bytes that belong to the next request are never consumed, so pipelined
//! requests stay in the source buffer for the following cycle.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: configurable, defaults to 8KB
//! - Only `Content-Length` delimited bodies; `Transfer-Encoding` is rejected

use std::cmp;

use bytes::{Buf, BytesMut};
use http::header::{CONTENT_LENGTH, TRANSFER_ENCODING};
use http::{HeaderName, HeaderValue, Method, Request, Uri};
use httparse::{Error, Status};
use tracing::trace;

use crate::codec::{ParseStatus, RequestParser};
use crate::ensure;
use crate::protocol::{ParseError, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Default maximum size in bytes allowed for the entire head section
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default maximum request body size
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// Smallest buffer worth handing to `httparse`
const MIN_REQUEST_BYTES: usize = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Head,
    Body { remaining: u64 },
    Complete,
}

/// `httparse` based [`RequestParser`].
#[derive(Debug)]
pub struct HttpParser {
    max_header_bytes: usize,
    max_body_bytes: u64,
    state: ParserState,
    header: Option<RequestHeader>,
    body: BytesMut,
}

impl Default for HttpParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HEADER_BYTES, DEFAULT_MAX_BODY_BYTES)
    }
}

impl HttpParser {
    pub fn new(max_header_bytes: usize, max_body_bytes: u64) -> Self {
        Self { max_header_bytes, max_body_bytes, state: ParserState::Head, header: None, body: BytesMut::new() }
    }

    /// Parses the request head out of `src`.
    ///
    /// Returns `Ok(None)` if more data is needed. On success the head bytes are
    /// removed from `src` and the declared body length is returned alongside
    /// the header.
    fn decode_head(&self, src: &mut BytesMut) -> Result<Option<(RequestHeader, u64)>, ParseError> {
        if src.len() < MIN_REQUEST_BYTES {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_result = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        let body_offset = match parsed_result? {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() < self.max_header_bytes, ParseError::too_large_header(src.len(), self.max_header_bytes));
                return Ok(None);
            }
        };

        trace!(head_size = body_offset, "parsed request head");
        ensure!(body_offset <= self.max_header_bytes, ParseError::too_large_header(body_offset, self.max_header_bytes));

        let version = match req.version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            // HTTP/2 and HTTP/3 never reach an HTTP/1 parser
            _ => return Err(ParseError::InvalidVersion(req.version)),
        };

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_| ParseError::InvalidMethod)?;
        let uri = Uri::try_from(req.path.ok_or(ParseError::InvalidUri)?).map_err(|_| ParseError::InvalidUri)?;

        let mut request = Request::new(());
        *request.method_mut() = method;
        *request.uri_mut() = uri;
        *request.version_mut() = version;

        let header_map = request.headers_mut();
        header_map.reserve(req.headers.len());
        for header in req.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
            header_map.append(name, value);
        }

        let header = RequestHeader::from(request);
        let length = payload_length(&header, self.max_body_bytes)?;

        src.advance(body_offset);
        Ok(Some((header, length)))
    }
}

impl RequestParser for HttpParser {
    fn reset(&mut self) {
        self.state = ParserState::Head;
        self.header = None;
        self.body.clear();
    }

    fn feed(&mut self, src: &mut BytesMut) -> Result<ParseStatus, ParseError> {
        if self.state == ParserState::Head {
            match self.decode_head(src)? {
                Some((header, 0)) => {
                    self.header = Some(header);
                    self.state = ParserState::Complete;
                }
                Some((header, length)) => {
                    self.header = Some(header);
                    // bounded by max_body_bytes, which fits in memory by construction
                    self.body.reserve(cmp::min(length, self.max_body_bytes) as usize);
                    self.state = ParserState::Body { remaining: length };
                }
                None => return Ok(ParseStatus::NeedMore),
            }
        }

        if let ParserState::Body { remaining } = &mut self.state {
            let len = cmp::min(*remaining, src.len() as u64) as usize;
            self.body.extend_from_slice(&src.split_to(len));
            *remaining -= len as u64;

            if *remaining > 0 {
                return Ok(ParseStatus::NeedMore);
            }
            self.state = ParserState::Complete;
        }

        Ok(ParseStatus::Complete)
    }

    fn request(&self) -> Option<&RequestHeader> {
        self.header.as_ref().filter(|_| self.state == ParserState::Complete)
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Determines the body length from the request headers.
///
/// Refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
fn payload_length(header: &RequestHeader, max_body_bytes: u64) -> Result<u64, ParseError> {
    let headers = header.headers();

    if let Some(te_value) = headers.get(TRANSFER_ENCODING) {
        return Err(ParseError::unsupported_transfer_encoding(String::from_utf8_lossy(te_value.as_bytes())));
    }

    let mut cl_values = headers.get_all(CONTENT_LENGTH).iter();
    let Some(cl_value) = cl_values.next() else {
        return Ok(0);
    };

    let cl_str = cl_value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
    // Content-Length = 1*DIGIT, so no sign that `u64::from_str` would accept
    let digits = cl_str.trim();
    ensure!(
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()),
        ParseError::invalid_content_length(format!("value {cl_str} is not 1*DIGIT"))
    );
    let length = digits.parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;

    ensure!(cl_values.all(|other| other == cl_value), ParseError::invalid_content_length("conflicting content-length values"));
    ensure!(length <= max_body_bytes, ParseError::too_large_body(length, max_body_bytes));

    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Version;
    use indoc::indoc;

    fn feed_all(parser: &mut HttpParser, chunks: &[&[u8]]) -> (Vec<ParseStatus>, BytesMut) {
        let mut buf = BytesMut::new();
        let mut statuses = Vec::new();
        for chunk in chunks {
            buf.extend_from_slice(chunk);
            statuses.push(parser.feed(&mut buf).unwrap());
        }
        (statuses, buf)
    }

    #[test]
    fn from_curl() {
        let str = indoc! {r##"
        GET /index.html HTTP/1.1
        Host: 127.0.0.1:8080
        User-Agent: curl/7.79.1
        Accept: */*

        "##};

        let mut parser = HttpParser::default();
        let mut buf = BytesMut::from(str);

        assert_eq!(parser.feed(&mut buf).unwrap(), ParseStatus::Complete);
        assert!(buf.is_empty());

        let header = parser.request().unwrap();
        assert_eq!(header.method(), &Method::GET);
        assert_eq!(header.version(), Version::HTTP_11);
        assert_eq!(header.uri().path(), "/index.html");
        assert_eq!(header.headers().len(), 3);

        assert_eq!(parser.method(), Some(&Method::GET));
        assert_eq!(parser.target_uri().map(Uri::path), Some("/index.html"));
        assert_eq!(parser.header("user-agent"), Some(&HeaderValue::from_static("curl/7.79.1")));
        assert_eq!(parser.header("x-missing"), None);
        assert!(parser.body().is_empty());
    }

    #[test]
    fn head_split_across_chunks() {
        let mut parser = HttpParser::default();
        let (statuses, rest) =
            feed_all(&mut parser, &[b"GET /a?b=1 HT", b"TP/1.1\r\nHost: x\r\n", b"Accept: */*\r\n", b"\r\n"]);

        assert_eq!(statuses, vec![ParseStatus::NeedMore, ParseStatus::NeedMore, ParseStatus::NeedMore, ParseStatus::Complete]);
        assert!(rest.is_empty());
        assert_eq!(parser.target_uri().and_then(Uri::query), Some("b=1"));
        assert_eq!(parser.header("accept"), Some(&HeaderValue::from_static("*/*")));
    }

    #[test]
    fn body_by_content_length() {
        let mut parser = HttpParser::default();
        let (statuses, rest) = feed_all(
            &mut parser,
            &[b"POST /submit HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello", b" wor", b"ldGET / HTTP/1.1\r\n"],
        );

        assert_eq!(statuses, vec![ParseStatus::NeedMore, ParseStatus::NeedMore, ParseStatus::Complete]);
        assert_eq!(parser.body(), b"hello world");
        // the next pipelined request is left untouched
        assert_eq!(&rest[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn request_is_hidden_until_complete() {
        let mut parser = HttpParser::default();
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 4\r\n\r\nab"[..]);

        assert_eq!(parser.feed(&mut buf).unwrap(), ParseStatus::NeedMore);
        assert!(parser.request().is_none());
        assert!(parser.method().is_none());
    }

    #[test]
    fn reset_clears_previous_request() {
        let mut parser = HttpParser::default();
        let mut buf = BytesMut::from(&b"PUT /one HTTP/1.1\r\nX-Old: 1\r\nContent-Length: 3\r\n\r\nabc"[..]);
        assert_eq!(parser.feed(&mut buf).unwrap(), ParseStatus::Complete);

        parser.reset();
        assert!(parser.request().is_none());
        assert!(parser.body().is_empty());

        let mut buf = BytesMut::from(&b"GET /two HTTP/1.1\r\n\r\n"[..]);
        assert_eq!(parser.feed(&mut buf).unwrap(), ParseStatus::Complete);
        assert_eq!(parser.target_uri().map(Uri::path), Some("/two"));
        assert_eq!(parser.header("x-old"), None);
        assert!(parser.body().is_empty());
    }

    #[test]
    fn too_large_header() {
        let mut parser = HttpParser::new(32, DEFAULT_MAX_BODY_BYTES);
        let mut buf = BytesMut::from(&b"GET / HTTP/1.1\r\nX-Long: aaaaaaaaaaaaaaaaaaaaaaaa"[..]);

        let result = parser.feed(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeHeader { max_size: 32, .. })));
    }

    #[test]
    fn too_large_body() {
        let mut parser = HttpParser::new(DEFAULT_MAX_HEADER_BYTES, 8);
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nContent-Length: 9\r\n\r\n"[..]);

        let result = parser.feed(&mut buf);
        assert!(matches!(result, Err(ParseError::TooLargeBody { length: 9, max_size: 8 })));
    }

    #[test]
    fn rejects_transfer_encoding() {
        let mut parser = HttpParser::default();
        let mut buf = BytesMut::from(&b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n"[..]);

        let result = parser.feed(&mut buf);
        assert!(matches!(result, Err(ParseError::UnsupportedTransferEncoding { .. })));
    }

    #[test]
    fn rejects_bad_content_length() {
        for raw in [
            &b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n"[..],
            &b"POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n"[..],
        ] {
            let mut parser = HttpParser::default();
            let mut buf = BytesMut::from(raw);
            assert!(matches!(parser.feed(&mut buf), Err(ParseError::InvalidContentLength { .. })));
        }
    }

    #[test]
    fn rejects_signed_content_length() {
        for raw in [
            &b"POST / HTTP/1.1\r\nContent-Length: +5\r\n\r\nhello"[..],
            &b"POST / HTTP/1.1\r\nContent-Length: -1\r\n\r\n"[..],
        ] {
            let mut parser = HttpParser::default();
            let mut buf = BytesMut::from(raw);
            assert!(matches!(parser.feed(&mut buf), Err(ParseError::InvalidContentLength { .. })));
        }
    }

    #[test]
    fn rejects_garbage() {
        let mut parser = HttpParser::default();
        let mut buf = BytesMut::from(&b"\x00\x01\x02 not http at all\r\n\r\n"[..]);
        assert!(parser.feed(&mut buf).is_err());
    }
}
