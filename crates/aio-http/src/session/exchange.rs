//! The handler's view of one dispatched request.
//!
//! An [`Exchange`] reads the parsed request and builds the response directly
//! into the session: headers are staged into the session buffer, and
//! [`Exchange::send`] issues a single vectored write of the encoded head and
//! the body.

use bytes::{Bytes, BytesMut};
use http::header::{CONNECTION, CONTENT_LENGTH};
use http::{HeaderName, HeaderValue, Method, StatusCode, Uri};
use tracing::trace;

use crate::codec::{ConnectionMode, RequestParser, ResponseHeadEncoder};
use crate::protocol::{RequestHeader, ResponseError, SessionError};
use crate::session::{SessionBuffer, State};
use crate::transport::Transport;

/// Response builder bound to a session in the dispatching phase.
pub struct Exchange<'a> {
    parser: &'a dyn RequestParser,
    buffer: &'a mut SessionBuffer,
    transport: &'a mut dyn Transport,
    state: &'a mut State,
    server_name: &'a str,
    connection: ConnectionMode,
}

impl std::fmt::Debug for Exchange<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("request", &self.parser.request())
            .field("buffer", &self.buffer)
            .field("connection", &self.connection)
            .finish()
    }
}

/// What a handler did with its [`Exchange`].
///
/// Only [`Exchange::send`] and [`Exchange::defer`] produce one.
#[must_use = "the disposition must be returned to the session"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disposition(Outcome);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Deferred,
    Failed,
}

impl Disposition {
    /// A response was handed to the transport.
    pub fn is_sent(&self) -> bool {
        self.0 == Outcome::Sent
    }

    /// The handler will respond later through [`Session::exchange`](crate::session::Session::exchange).
    pub fn is_deferred(&self) -> bool {
        self.0 == Outcome::Deferred
    }

    /// The send could not be issued; the session closes when it settles.
    pub fn is_failed(&self) -> bool {
        self.0 == Outcome::Failed
    }
}

impl<'a> Exchange<'a> {
    pub(crate) fn new(
        parser: &'a dyn RequestParser,
        buffer: &'a mut SessionBuffer,
        transport: &'a mut dyn Transport,
        state: &'a mut State,
        server_name: &'a str,
        connection: ConnectionMode,
    ) -> Self {
        Self { parser, buffer, transport, state, server_name, connection }
    }

    pub fn request(&self) -> Option<&'a RequestHeader> {
        self.parser.request()
    }

    pub fn method(&self) -> Option<&'a Method> {
        self.parser.method()
    }

    pub fn uri(&self) -> Option<&'a Uri> {
        self.parser.target_uri()
    }

    /// Looks up a request header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&'a HeaderValue> {
        self.parser.header(name)
    }

    /// The request body.
    pub fn content(&self) -> &'a [u8] {
        self.parser.body()
    }

    /// How the response will leave the connection.
    pub fn connection(&self) -> ConnectionMode {
        self.connection
    }

    /// Staging capacity left for further headers.
    pub fn remaining(&self) -> usize {
        self.buffer.remaining()
    }

    /// Stages one response header.
    ///
    /// `Content-Length` and `Connection` are written by the session and are
    /// rejected here. On [`ResponseError::HeaderOverflow`] nothing is staged
    /// and headers staged earlier are kept.
    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<(), ResponseError> {
        let (name, value) = (name.as_ref(), value.as_ref());

        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(ResponseError::invalid_header)?;
        if header_name == CONTENT_LENGTH {
            return Err(ResponseError::ReservedHeader { name: "Content-Length" });
        }
        if header_name == CONNECTION {
            return Err(ResponseError::ReservedHeader { name: "Connection" });
        }
        HeaderValue::from_str(value).map_err(ResponseError::invalid_header)?;

        self.buffer.stage_header(name.as_bytes(), value.as_bytes())
    }

    pub fn set_header_int(&mut self, name: impl AsRef<str>, value: i64) -> Result<(), ResponseError> {
        self.set_header(name, value.to_string())
    }

    pub fn set_content_type(&mut self, value: impl AsRef<str>) -> Result<(), ResponseError> {
        self.set_header("Content-Type", value)
    }

    /// Issues the response.
    ///
    /// `Content-Length` is always the length of `body`; for `HEAD` requests
    /// the body itself is left out. The session resumes once the transport
    /// reports the send complete.
    pub fn send(self, status: StatusCode, body: impl Into<Bytes>) -> Disposition {
        let mut body = body.into();
        let content_length = body.len();
        if self.parser.method() == Some(&Method::HEAD) {
            body = Bytes::new();
        }

        let staged = match self.buffer.staged() {
            Ok(staged) => staged,
            Err(e) => {
                *self.state = State::Failed(e.into());
                return Disposition(Outcome::Failed);
            }
        };

        let mut head = BytesMut::new();
        ResponseHeadEncoder::new(self.server_name, self.connection).encode(status, staged, content_length, &mut head);
        trace!(status = status.as_u16(), head_size = head.len(), content_length, "issuing response");

        match self.transport.async_send_vectored([head.freeze(), body]) {
            Ok(()) => {
                *self.state = State::Sending { close_after: !self.connection.is_keep_alive() };
                Disposition(Outcome::Sent)
            }
            Err(e) => {
                *self.state = State::Failed(SessionError::issue("send", e));
                Disposition(Outcome::Failed)
            }
        }
    }

    /// Leaves the request unanswered for now.
    pub fn defer(self) -> Disposition {
        Disposition(Outcome::Deferred)
    }
}
