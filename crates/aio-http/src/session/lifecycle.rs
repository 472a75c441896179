//! Session creation, cycle restart and teardown.

use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::{debug, error, trace};

use crate::codec::{ConnectionMode, RequestParser};
use crate::protocol::{CloseReason, SessionError, SessionInitError};
use crate::server::Server;
use crate::session::{Session, SessionBuffer, State, Step};
use crate::transport::Transport;

impl<T, P> Session<T, P>
where
    T: Transport,
    P: RequestParser,
{
    /// Creates a session for an accepted connection and issues its first receive.
    ///
    /// On failure the transport and parser are released before returning and
    /// no session exists.
    pub fn create(server: &Arc<Server>, transport: T, parser: P, peer: SocketAddr) -> Result<Self, SessionInitError> {
        match Self::alloc(server, transport, parser, peer).start_cycle() {
            Step::Continue(session) => {
                debug!(peer = %peer, "session started");
                Ok(session)
            }
            Step::Closed(CloseReason::Error(SessionError::Issue { source, .. })) => Err(SessionInitError::Start { source }),
            Step::Closed(reason) => Err(SessionInitError::Closed { reason }),
        }
    }

    /// Builds a fresh session value. This is the only place sessions are
    /// constructed, so reuse of released sessions would hook in here.
    fn alloc(server: &Arc<Server>, transport: T, parser: P, peer: SocketAddr) -> Self {
        let config = server.config().clone();
        Self {
            transport,
            parser,
            buffer: SessionBuffer::with_capacity(config.buffer_capacity()),
            backlog: BytesMut::new(),
            server: Arc::downgrade(server),
            connection: ConnectionMode::KeepAlive { timeout: config.keep_alive_timeout(), max: config.max_requests() },
            config,
            peer,
            state: State::Idle,
            requests: 0,
        }
    }

    /// Starts a new request cycle on this connection.
    ///
    /// The parser is reset so nothing of the previous request survives, and
    /// pipelined bytes left over from it are parsed before anything new is
    /// received.
    pub(crate) fn start_cycle(mut self) -> Step<Self> {
        self.parser.reset();
        self.state = State::Idle;

        let backlog = mem::take(&mut self.backlog);
        if let Err(e) = self.buffer.enter_receiving(&backlog) {
            return self.fail(e);
        }

        if backlog.is_empty() {
            self.issue_receive()
        } else {
            trace!(peer = %self.peer, pipelined = backlog.len(), "parsing pipelined request bytes");
            self.process_input()
        }
    }

    /// Lends the buffer to the transport for one receive.
    pub(crate) fn issue_receive(mut self) -> Step<Self> {
        let (buf, limit) = match self.buffer.lend() {
            Ok(lent) => lent,
            Err(e) => return self.fail(e),
        };

        match self.transport.async_receive(buf, limit) {
            Ok(()) => {
                self.state = State::Receiving;
                Step::Continue(self)
            }
            Err(e) => self.fail(SessionError::issue("receive", e)),
        }
    }

    /// Releases the session: transport and parser go together, exactly once,
    /// since the session is consumed.
    pub fn teardown(self, reason: CloseReason) -> CloseReason {
        if reason.is_error() {
            error!(peer = %self.peer, requests = self.requests, cause = %reason, "session torn down");
        } else {
            debug!(peer = %self.peer, requests = self.requests, %reason, "session closed");
        }
        drop(self);
        reason
    }
}
