use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::trace;

use crate::transport::{Completion, Transport};

#[derive(Debug)]
enum PendingOp {
    Receive { buf: BytesMut, limit: usize },
    Send { head: Bytes, body: Bytes },
}

/// [`Transport`] over a tokio `TcpStream`.
///
/// Issuing an operation only records it; [`TokioTransport::next_completion`]
/// performs it and yields the [`Completion`]. Only one operation may be
/// pending at a time.
#[derive(Debug)]
pub struct TokioTransport {
    stream: TcpStream,
    pending: Option<PendingOp>,
}

impl TokioTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream, pending: None }
    }

    /// Wraps an accepted std socket, switching it to non-blocking mode.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_std(stream: std::net::TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self::new(TcpStream::from_std(stream)?))
    }

    /// Runs the pending operation to completion.
    ///
    /// Returns `None` if nothing is pending. Dropping the returned future
    /// abandons the operation together with its buffers.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        let completion = match self.pending.take()? {
            PendingOp::Receive { mut buf, limit } => {
                let result = self.stream.read_buf(&mut (&mut buf).limit(limit)).await;
                trace!(result = ?result, "receive completed");
                Completion::Received { buf, result }
            }
            PendingOp::Send { head, body } => {
                let len = head.len() + body.len();
                let mut chain = head.chain(body);
                let result = self.stream.write_all_buf(&mut chain).await.map(|()| len);
                trace!(result = ?result, "send completed");
                Completion::Sent { result }
            }
        };
        Some(completion)
    }

    fn ensure_idle(&self) -> io::Result<()> {
        match self.pending {
            Some(_) => Err(io::Error::other("another operation is already pending")),
            None => Ok(()),
        }
    }
}

impl Transport for TokioTransport {
    fn async_receive(&mut self, buf: BytesMut, limit: usize) -> io::Result<()> {
        self.ensure_idle()?;
        self.pending = Some(PendingOp::Receive { buf, limit });
        Ok(())
    }

    fn async_send_vectored(&mut self, bufs: [Bytes; 2]) -> io::Result<()> {
        self.ensure_idle()?;
        let [head, body] = bufs;
        self.pending = Some(PendingOp::Send { head, body });
        Ok(())
    }
}
