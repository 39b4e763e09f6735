//! Traits to perform in-order, serial, byte-wise I/O.

mod impls;

/// A byte-oriented transport carrying RSP frames.
///
/// The stub assumes nothing about the transport's framing; `$…#cc` packet
/// boundaries are recovered by the stub's own receive state machine, so any
/// reliable byte stream (TCP, serial line, pipe) will do.
///
/// When the `std` feature is enabled, this trait is automatically implemented
/// for [`TcpStream`](std::net::TcpStream) and
/// [`UnixStream`](std::os::unix::net::UnixStream) (on unix systems).
pub trait Connection {
    /// Transport-specific error type.
    type Error;

    /// Return the number of bytes that can be read without blocking.
    ///
    /// The count doesn't have to be exact; it is used to size reads, and any
    /// non-zero value simply means "a `read` will not block". Returning `0`
    /// means no data is currently buffered.
    fn peek(&mut self) -> Result<usize, Self::Error>;

    /// Read up to `buf.len()` bytes, returning how many were read.
    ///
    /// The stub only calls this once `peek` has reported pending data, so the
    /// call is expected not to block. Returning `Ok(0)` at that point is
    /// interpreted as the peer having closed the transport.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write the entire buffer, blocking until complete.
    ///
    /// Partial writes must be retried internally; the stub never re-issues a
    /// reply.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error>;

    /// Block until data is available for reading, returning `Ok(true)`.
    ///
    /// This method is optional. The default implementation returns
    /// `Ok(false)`, meaning "blocking waits are not supported", in which case
    /// [`GdbStub::run`](crate::stub::GdbStub::run) returns
    /// [`RunExit::TryAgain`](crate::stub::RunExit::TryAgain) whenever the
    /// transport runs dry, and must be re-entered once data arrives.
    fn poll(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    /// Called at the start of a debugging session _before_ any GDB packets
    /// have been sent/received.
    ///
    /// This method's default implementation is a no-op.
    ///
    /// The `TcpStream` implementation uses this hook to
    /// [`set_nodelay(true)`](std::net::TcpStream::set_nodelay): RSP sessions
    /// exchange many small packets, and forgetting `TCP_NODELAY` results in a
    /// massively degraded debugging experience.
    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
