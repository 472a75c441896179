//! The session's single dual-purpose buffer.
//!
//! ```text
//!   Receiving ──lend──► Lent ──restore──► Receiving ──enter_staging──► Staging
//!       ▲                                                                 │
//!       └──────────────────────────── enter_receiving ◄───────────────────┘
//! ```
//!
//! Every operation checks the mode first, so request bytes and staged
//! response headers can never be mixed up by call order.

use std::mem;

use bytes::{BufMut, BytesMut};

use crate::ensure;
use crate::protocol::{BufferModeError, ResponseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferMode {
    /// Holds request bytes the parser has not consumed yet.
    Receiving,
    /// Handed to the transport for an outstanding receive.
    Lent,
    /// Holds response header lines staged by the handler.
    Staging,
}

impl BufferMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferMode::Receiving => "receiving",
            BufferMode::Lent => "lent",
            BufferMode::Staging => "staging",
        }
    }
}

#[derive(Debug)]
pub struct SessionBuffer {
    bytes: BytesMut,
    capacity: usize,
    mode: BufferMode,
}

impl SessionBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { bytes: BytesMut::with_capacity(capacity), capacity, mode: BufferMode::Receiving }
    }

    pub fn mode(&self) -> BufferMode {
        self.mode
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Free space left before the logical capacity is reached.
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.bytes.len())
    }

    fn expect(&self, expected: BufferMode) -> Result<(), BufferModeError> {
        ensure!(self.mode == expected, BufferModeError { expected: expected.as_str(), actual: self.mode.as_str() });
        Ok(())
    }

    /// Hands the buffer out for a receive, together with how many bytes the
    /// receive may append.
    pub(crate) fn lend(&mut self) -> Result<(BytesMut, usize), BufferModeError> {
        self.expect(BufferMode::Receiving)?;
        let limit = self.remaining();
        self.bytes.reserve(limit);
        self.mode = BufferMode::Lent;
        Ok((mem::take(&mut self.bytes), limit))
    }

    /// Takes the buffer back from a finished receive.
    pub(crate) fn restore(&mut self, bytes: BytesMut) -> Result<(), BufferModeError> {
        self.expect(BufferMode::Lent)?;
        self.bytes = bytes;
        self.mode = BufferMode::Receiving;
        Ok(())
    }

    /// The unconsumed request bytes, for the parser.
    pub(crate) fn received_mut(&mut self) -> Result<&mut BytesMut, BufferModeError> {
        self.expect(BufferMode::Receiving)?;
        Ok(&mut self.bytes)
    }

    /// Clears the buffer for response staging.
    ///
    /// Request bytes still in the buffer belong to a pipelined request; they
    /// are returned so the caller can keep them for the next cycle.
    pub(crate) fn enter_staging(&mut self) -> Result<BytesMut, BufferModeError> {
        self.expect(BufferMode::Receiving)?;
        let backlog = self.bytes.split();
        self.mode = BufferMode::Staging;
        Ok(backlog)
    }

    /// Drops staged headers and loads `backlog` as already received bytes.
    pub(crate) fn enter_receiving(&mut self, backlog: &[u8]) -> Result<(), BufferModeError> {
        ensure!(self.mode != BufferMode::Lent, BufferModeError { expected: "staging", actual: "lent" });
        self.bytes.clear();
        self.bytes.extend_from_slice(backlog);
        self.mode = BufferMode::Receiving;
        Ok(())
    }

    /// Appends one `name: value\r\n` line.
    ///
    /// Nothing is written if the line does not fit in the remaining capacity.
    pub(crate) fn stage_header(&mut self, name: &[u8], value: &[u8]) -> Result<(), ResponseError> {
        self.expect(BufferMode::Staging)?;

        let needed = name.len() + value.len() + 4;
        let remaining = self.remaining();
        ensure!(needed <= remaining, ResponseError::header_overflow(needed, remaining));

        self.bytes.put_slice(name);
        self.bytes.put_slice(b": ");
        self.bytes.put_slice(value);
        self.bytes.put_slice(b"\r\n");
        Ok(())
    }

    pub(crate) fn staged(&self) -> Result<&[u8], BufferModeError> {
        self.expect(BufferMode::Staging)?;
        Ok(&self.bytes)
    }
}
