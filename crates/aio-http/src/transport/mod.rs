//! Completion-driven transport contract.
//!
//! A [`Transport`] only *schedules* operations. The result of a scheduled
//! operation is delivered later, by whatever drives the event loop, as a
//! [`Completion`] handed to the session. Buffers move into the transport when
//! an operation is issued and come back with its completion, so a session can
//! never touch a buffer the transport is still filling.
//!
//! - [`TokioTransport`]: tokio `TcpStream` implementation

mod tokio_transport;

pub use tokio_transport::TokioTransport;

use std::io;

use bytes::{Bytes, BytesMut};

/// The result of one previously issued operation.
#[derive(Debug)]
pub enum Completion {
    /// A receive finished. `buf` is the buffer given to
    /// [`Transport::async_receive`] with the received bytes appended;
    /// `Ok(0)` means the peer closed the connection.
    Received { buf: BytesMut, result: io::Result<usize> },
    /// A vectored send finished; `Ok(n)` is the number of bytes written.
    Sent { result: io::Result<usize> },
}

impl Completion {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Completion::Received { .. } => "receive",
            Completion::Sent { .. } => "send",
        }
    }
}

/// Non-blocking socket operations.
///
/// Returning `Err` from an issue method means nothing was scheduled and no
/// completion will follow. Dropping the transport releases the socket.
pub trait Transport {
    /// Schedules a receive appending at most `limit` bytes to `buf`.
    fn async_receive(&mut self, buf: BytesMut, limit: usize) -> io::Result<()>;

    /// Schedules one logical write of `bufs` in order.
    fn async_send_vectored(&mut self, bufs: [Bytes; 2]) -> io::Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn async_receive(&mut self, buf: BytesMut, limit: usize) -> io::Result<()> {
        (**self).async_receive(buf, limit)
    }

    fn async_send_vectored(&mut self, bufs: [Bytes; 2]) -> io::Result<()> {
        (**self).async_send_vectored(bufs)
    }
}
