//! The session context: construction, the receive loop, and session-level
//! errors.

use core::marker::PhantomData;

use alloc::vec;
use managed::ManagedSlice;

use crate::conn::Connection;
use crate::protocol::commands::q_table_ordering_ok;
use crate::target::Target;

mod core_impl;
mod error;

use core_impl::GdbStubImpl;

pub use error::Error;

/// Default size (in bytes) for an owned packet or reply buffer.
///
/// 4 KiB comfortably fits a full `g` reply for every supported register
/// file, and `M`/`m` traffic of the sizes GDB actually issues.
const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Why [`GdbStub::run`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunExit {
    /// No data is buffered and the transport does not support blocking
    /// waits. Re-enter `run` once the transport has data again; the session
    /// (including any half-received frame) picks up where it left off.
    TryAgain,
    /// The peer closed the transport.
    PeerDisconnected,
    /// GDB issued a kill request (`k`).
    Kill,
}

/// Debug a [`Target`] over a [`Connection`] using the GDB Remote Serial
/// Protocol.
pub struct GdbStub<'a, T: Target, C: Connection> {
    conn: C,
    packet_buffer: ManagedSlice<'a, u8>,
    reply_buffer: ManagedSlice<'a, u8>,
    inner: GdbStubImpl<T, C>,
}

impl<'a, T: Target, C: Connection> GdbStub<'a, T, C> {
    /// Create a [`GdbStubBuilder`] using the provided Connection.
    pub fn builder(conn: C) -> GdbStubBuilder<'a, T, C> {
        GdbStubBuilder::new(conn)
    }

    /// Create a new `GdbStub` with heap-allocated buffers.
    ///
    /// For control over buffer placement (e.g. in freestanding
    /// environments), use [`builder()`](GdbStub::builder) instead.
    pub fn new(conn: C) -> GdbStub<'a, T, C> {
        GdbStubBuilder::new(conn).build()
    }

    /// Drive the session until the transport runs dry, the peer disconnects,
    /// or GDB kills the target.
    ///
    /// All bytes currently buffered by the transport are processed before
    /// returning; a [`RunExit::TryAgain`] therefore means "nothing left to
    /// do right now", and the caller re-enters once the transport signals
    /// readability.
    pub fn run(&mut self, target: &mut T) -> Result<RunExit, Error<T::Error, C::Error>> {
        self.inner.run(
            target,
            &mut self.conn,
            &mut self.packet_buffer,
            &mut self.reply_buffer,
        )
    }

    /// Abandon any half-received frame, returning the receive machine to its
    /// initial state.
    ///
    /// Buffers keep their capacity and features negotiated via `qSupported`
    /// are retained.
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}

/// Helper to construct and customize [`GdbStub`].
pub struct GdbStubBuilder<'a, T: Target, C: Connection> {
    conn: C,
    packet_buffer: Option<&'a mut [u8]>,
    reply_buffer: Option<&'a mut [u8]>,

    _target: PhantomData<T>,
}

impl<'a, T: Target, C: Connection> GdbStubBuilder<'a, T, C> {
    /// Create a new `GdbStubBuilder` using the provided Connection.
    pub fn new(conn: C) -> GdbStubBuilder<'a, T, C> {
        GdbStubBuilder {
            conn,
            packet_buffer: None,
            reply_buffer: None,

            _target: PhantomData,
        }
    }

    /// Use a pre-allocated packet buffer (instead of heap-allocating one).
    ///
    /// Incoming packets must fit in the buffer; oversized packets surface as
    /// [`Error::BufferOverflow`].
    pub fn with_packet_buffer(mut self, packet_buffer: &'a mut [u8]) -> Self {
        self.packet_buffer = Some(packet_buffer);
        self
    }

    /// Use a pre-allocated reply buffer (instead of heap-allocating one).
    ///
    /// Replies must fit in the buffer; oversized replies surface as
    /// [`Error::BufferOverflow`].
    pub fn with_reply_buffer(mut self, reply_buffer: &'a mut [u8]) -> Self {
        self.reply_buffer = Some(reply_buffer);
        self
    }

    /// Build the `GdbStub`.
    pub fn build(self) -> GdbStub<'a, T, C> {
        // entries sharing a prefix must be ordered longest-first, or the
        // shorter entry would shadow the longer one at dispatch time
        debug_assert!(q_table_ordering_ok());

        let to_managed = |buf: Option<&'a mut [u8]>| match buf {
            Some(buf) => ManagedSlice::Borrowed(buf),
            None => ManagedSlice::Owned(vec![0; DEFAULT_BUFFER_SIZE]),
        };

        GdbStub {
            conn: self.conn,
            packet_buffer: to_managed(self.packet_buffer),
            reply_buffer: to_managed(self.reply_buffer),
            inner: GdbStubImpl::new(),
        }
    }
}
