//! Connection sessions.
//!
//! A [`Session`] drives one connection through repeated keep-alive cycles:
//!
//! ```text
//!        ┌────────┐  issue receive   ┌───────────┐  NeedMore: receive again
//!        │  Idle  │ ───────────────► │ Receiving │ ◄──────────┐
//!        └────────┘                  └─────┬─────┘ ───────────┘
//!            ▲                             │ Complete
//!            │                             ▼
//!            │                      ┌─────────────┐  defer()
//!            │                      │ Dispatching │ ─────────► parked until the owner responds
//!            │                      └──────┬──────┘
//!            │ keep-alive                  │ Exchange::send
//!            │                             ▼
//!            │                       ┌──────────┐
//!            └────────────────────── │ Sending  │ ── close / error ──► teardown
//!                                    └──────────┘
//! ```
//!
//! The session never performs I/O itself. It issues operations on its
//! [`Transport`](crate::transport::Transport) and is advanced by feeding the
//! resulting [`Completion`]s to [`Session::on_completion`]. Every advancing
//! method consumes the session and hands it back inside [`Step::Continue`], or
//! tears it down and returns [`Step::Closed`]; a closed session no longer
//! exists, so it can neither be torn down twice nor issue further I/O.

mod buffer;
mod exchange;
mod lifecycle;

pub use buffer::{BufferMode, SessionBuffer};
pub use exchange::{Disposition, Exchange};

use std::io;
use std::mem;
use std::net::SocketAddr;
use std::sync::Weak;

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::codec::{ConnectionMode, HttpParser, ParseStatus, RequestParser};
use crate::ensure;
use crate::protocol::{CloseReason, ParseError, ResponseError, SessionError};
use crate::server::{Server, SessionConfig};
use crate::transport::{Completion, Transport};

/// Internal state; `Failed` carries the error until the session settles.
#[derive(Debug)]
pub(crate) enum State {
    Idle,
    Receiving,
    Dispatching,
    Sending { close_after: bool },
    Failed(SessionError),
}

/// Observable phase of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Receiving,
    /// A request was dispatched and no response has been issued yet.
    Dispatching,
    Sending,
    /// A failure was recorded and the session will close when it settles.
    Failed,
}

impl State {
    fn phase(&self) -> Phase {
        match self {
            State::Idle => Phase::Idle,
            State::Receiving => Phase::Receiving,
            State::Dispatching => Phase::Dispatching,
            State::Sending { .. } => Phase::Sending,
            State::Failed(_) => Phase::Failed,
        }
    }
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Receiving => "receiving",
            Phase::Dispatching => "dispatching",
            Phase::Sending => "sending",
            Phase::Failed => "failed",
        }
    }
}

/// Result of advancing a session.
#[must_use = "a continued session must be kept to receive its next completion"]
#[derive(Debug)]
pub enum Step<S> {
    Continue(S),
    Closed(CloseReason),
}

impl<S> Step<S> {
    pub fn is_closed(&self) -> bool {
        matches!(self, Step::Closed(_))
    }

    pub fn into_session(self) -> Option<S> {
        match self {
            Step::Continue(session) => Some(session),
            Step::Closed(_) => None,
        }
    }
}

/// One live connection: transport, parser, buffer and a weak server reference.
#[derive(Debug)]
pub struct Session<T, P = HttpParser> {
    transport: T,
    parser: P,
    buffer: SessionBuffer,
    backlog: BytesMut,
    server: Weak<Server>,
    config: SessionConfig,
    connection: ConnectionMode,
    peer: SocketAddr,
    state: State,
    requests: usize,
}

impl<T, P> Session<T, P>
where
    T: Transport,
    P: RequestParser,
{
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Requests dispatched on this connection so far.
    pub fn requests(&self) -> usize {
        self.requests
    }

    pub fn buffer_mode(&self) -> BufferMode {
        self.buffer.mode()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn is_awaiting_response(&self) -> bool {
        matches!(self.state, State::Dispatching)
    }

    /// Advances the session with the completion of its outstanding operation.
    pub fn on_completion(self, completion: Completion) -> Step<Self> {
        match (self.phase(), completion) {
            (Phase::Receiving, Completion::Received { buf, result }) => self.on_received(buf, result),
            (Phase::Sending, Completion::Sent { result }) => self.on_sent(result),
            (phase, completion) => {
                let got = completion.kind();
                self.fail(SessionError::UnexpectedCompletion { got, state: phase.as_str() })
            }
        }
    }

    /// Re-opens the exchange of a deferred request.
    ///
    /// Fails with [`ResponseError::NotAwaitingResponse`] unless the handler
    /// deferred and no response has been issued since. Call
    /// [`Session::settle`] once the exchange is done with.
    pub fn exchange(&mut self) -> Result<Exchange<'_>, ResponseError> {
        ensure!(matches!(self.state, State::Dispatching), ResponseError::NotAwaitingResponse);
        Ok(Exchange::new(
            &self.parser,
            &mut self.buffer,
            &mut self.transport,
            &mut self.state,
            self.config.server_name(),
            self.connection,
        ))
    }

    /// Resolves what the last exchange left behind: a recorded failure tears
    /// the session down, anything else keeps it.
    pub fn settle(mut self) -> Step<Self> {
        match mem::replace(&mut self.state, State::Idle) {
            State::Failed(e) => self.fail(e),
            state => {
                self.state = state;
                Step::Continue(self)
            }
        }
    }

    fn on_received(mut self, buf: BytesMut, result: io::Result<usize>) -> Step<Self> {
        if let Err(e) = self.buffer.restore(buf) {
            return self.fail(e);
        }

        match result {
            Ok(0) => self.close(CloseReason::PeerClosed),
            Ok(bytes) => {
                trace!(peer = %self.peer, bytes, buffered = self.buffer.len(), "received request bytes");
                self.process_input()
            }
            Err(e) => self.fail(SessionError::transport(e)),
        }
    }

    /// Feeds the buffered request bytes to the parser and acts on its verdict.
    fn process_input(mut self) -> Step<Self> {
        let status = match self.buffer.received_mut() {
            Ok(received) => self.parser.feed(received),
            Err(e) => return self.fail(e),
        };

        match status {
            Ok(ParseStatus::NeedMore) if self.buffer.remaining() == 0 => {
                let e = ParseError::too_large_header(self.buffer.len(), self.buffer.capacity());
                self.fail(e)
            }
            Ok(ParseStatus::NeedMore) => self.issue_receive(),
            Ok(ParseStatus::Complete) => self.dispatch(),
            Err(e) => self.fail(e),
        }
    }

    fn dispatch(mut self) -> Step<Self> {
        match self.buffer.enter_staging() {
            Ok(backlog) => self.backlog = backlog,
            Err(e) => return self.fail(e),
        }
        self.state = State::Dispatching;
        self.requests += 1;

        let Some(server) = self.server.upgrade() else {
            return self.close(CloseReason::ServerGone);
        };
        let Some(handler) = server.handler().cloned() else {
            debug!(peer = %self.peer, "no handler configured, request dropped");
            return self.start_cycle();
        };
        drop(server);

        let keep_alive = self.parser.request().is_some_and(|request| request.keep_alive());
        self.connection = if keep_alive && self.requests < self.config.max_requests() {
            ConnectionMode::KeepAlive {
                timeout: self.config.keep_alive_timeout(),
                max: self.config.max_requests() - self.requests,
            }
        } else {
            ConnectionMode::Close
        };

        let disposition = match (self.parser.method(), self.parser.target_uri()) {
            (Some(method), Some(uri)) => {
                debug!(peer = %self.peer, %method, %uri, "dispatching request");
                let exchange = Exchange::new(
                    &self.parser,
                    &mut self.buffer,
                    &mut self.transport,
                    &mut self.state,
                    self.config.server_name(),
                    self.connection,
                );
                handler.call(method, uri, exchange)
            }
            _ => return self.fail(ParseError::InvalidUri),
        };

        if disposition.is_deferred() {
            debug!(peer = %self.peer, "response deferred by handler");
        }
        self.settle()
    }

    fn on_sent(self, result: io::Result<usize>) -> Step<Self> {
        let close_after = matches!(self.state, State::Sending { close_after: true });
        match result {
            Ok(bytes) => {
                trace!(peer = %self.peer, bytes, close_after, "response sent");
                if close_after { self.close(CloseReason::Completed) } else { self.start_cycle() }
            }
            Err(e) => self.fail(SessionError::transport(e)),
        }
    }

    fn fail(self, e: impl Into<SessionError>) -> Step<Self> {
        self.close(CloseReason::Error(e.into()))
    }

    fn close(self, reason: CloseReason) -> Step<Self> {
        Step::Closed(self.teardown(reason))
    }
}
