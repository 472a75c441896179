use std::io;
use thiserror::Error;

/// A session could not be brought up for an accepted connection.
///
/// When this is returned every partial resource (transport, parser, buffer)
/// has already been released.
#[derive(Debug, Error)]
pub enum SessionInitError {
    #[error("session resources could not be created: {source}")]
    Allocation { source: io::Error },

    #[error("first receive could not be issued: {source}")]
    Start { source: io::Error },

    #[error("connection closed before the first receive: {reason}")]
    Closed { reason: CloseReason },
}

impl SessionInitError {
    pub fn allocation<E: Into<io::Error>>(e: E) -> Self {
        Self::Allocation { source: e.into() }
    }
}

/// A fatal condition on a live session. Every variant resolves to teardown.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not issue {op}: {source}")]
    Issue { op: &'static str, source: io::Error },

    #[error("transport failed: {source}")]
    Transport { source: io::Error },

    #[error("request error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error(transparent)]
    BufferMode(#[from] BufferModeError),

    #[error("completion for {got} while session was {state}")]
    UnexpectedCompletion { got: &'static str, state: &'static str },

    #[error("no operation outstanding while session was {state}")]
    Stalled { state: &'static str },
}

impl SessionError {
    pub fn issue<E: Into<io::Error>>(op: &'static str, e: E) -> Self {
        Self::Issue { op, source: e.into() }
    }

    pub fn transport<E: Into<io::Error>>(e: E) -> Self {
        Self::Transport { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid http uri")]
    InvalidUri,

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("body size {length} exceed the limit {max_size}")]
    TooLargeBody { length: u64, max_size: u64 },

    #[error("unsupported transfer-encoding: {encoding}")]
    UnsupportedTransferEncoding { encoding: String },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_body(length: u64, max_size: u64) -> Self {
        Self::TooLargeBody { length, max_size }
    }

    pub fn unsupported_transfer_encoding<S: ToString>(str: S) -> Self {
        Self::UnsupportedTransferEncoding { encoding: str.to_string() }
    }
}

/// An operation touched the session buffer while it was in another mode.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("buffer is in {actual} mode, expected {expected}")]
pub struct BufferModeError {
    pub expected: &'static str,
    pub actual: &'static str,
}

/// Rejections from the response-building contract.
///
/// These never tear the session down on their own: the handler decides
/// whether to carry on (for example with a smaller header set) or to send an
/// error status.
#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("header line of {needed} bytes exceed the remaining staging capacity {remaining}")]
    HeaderOverflow { needed: usize, remaining: usize },

    #[error("invalid response header: {reason}")]
    InvalidHeader { reason: String },

    #[error("header {name} is managed by the session")]
    ReservedHeader { name: &'static str },

    #[error(transparent)]
    WrongBufferMode(#[from] BufferModeError),

    #[error("session is not awaiting a response")]
    NotAwaitingResponse,
}

impl ResponseError {
    pub fn header_overflow(needed: usize, remaining: usize) -> Self {
        Self::HeaderOverflow { needed, remaining }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

/// Why a session ended. Returned exactly once per session, by teardown.
#[derive(Debug, Error)]
pub enum CloseReason {
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("connection finished after a non keep-alive response")]
    Completed,

    #[error("keep-alive idle timeout elapsed")]
    IdleTimeout,

    #[error("server was dropped")]
    ServerGone,

    #[error(transparent)]
    Error(#[from] SessionError),
}

impl CloseReason {
    /// Whether this close is a failure worth logging at error level.
    pub fn is_error(&self) -> bool {
        matches!(self, CloseReason::Error(_))
    }
}
