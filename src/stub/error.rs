use core::fmt;
use core::fmt::Debug;
use core::fmt::Display;

use crate::protocol::response::ResponseWriterError;
use crate::util::managed_vec::CapacityError;

/// Wire error codes sent to the client as `E NN` replies.
///
/// Values are the library's internal status codes negated and truncated to a
/// byte, matching the convention debuggers expect from this family of stubs.
pub(crate) mod errno {
    /// The annex of a `qXfer` read was not `target.xml`.
    pub const BAD_ANNEX: u8 = 0x00;
    /// Malformed hex, missing separator, or an otherwise broken packet body.
    pub const PROTOCOL_VIOLATION: u8 = 0x07;
    /// Unknown `monitor` command.
    pub const NOT_FOUND: u8 = 0x09;
}

/// An error which may occur during a GDB debugging session.
///
/// Checksum failures, malformed packets, and non-fatal target errors are
/// handled inside the session (via `-` NACKs and `E NN` replies) and never
/// surface here; this type covers the failures that end the
/// [`run`](crate::stub::GdbStub::run) call.
pub enum Error<T, C> {
    /// Connection error while reading a request.
    ConnectionRead(C),
    /// Connection error while writing a response.
    ConnectionWrite(C),
    /// A packet or reply did not fit in the session's caller-supplied
    /// buffer.
    ///
    /// Only reachable when the stub was built with borrowed buffers
    /// (`with_packet_buffer` / `with_reply_buffer`); owned buffers grow on
    /// demand.
    BufferOverflow,
    /// The target raised a fatal error.
    TargetError(T),

    // A non-fatal, errno-carrying failure, reported to the client as an
    // `E NN` reply. Intercepted by the dispatcher; never escapes `run`.
    #[doc(hidden)]
    NonFatal(u8),
    // The RSP "unsupported" outcome, reported to the client as the empty
    // reply. Intercepted by the dispatcher; never escapes `run`.
    #[doc(hidden)]
    Unsupported,
}

impl<T, C> From<ResponseWriterError<C>> for Error<T, C> {
    fn from(e: ResponseWriterError<C>) -> Self {
        match e {
            ResponseWriterError::Connection(e) => Error::ConnectionWrite(e),
            ResponseWriterError::Capacity => Error::BufferOverflow,
        }
    }
}

impl<A, T, C> From<CapacityError<A>> for Error<T, C> {
    fn from(_: CapacityError<A>) -> Self {
        Error::BufferOverflow
    }
}

impl<T: Debug, C: Debug> Debug for Error<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Error::*;
        match self {
            ConnectionRead(e) => write!(f, "ConnectionRead({:?})", e),
            ConnectionWrite(e) => write!(f, "ConnectionWrite({:?})", e),
            BufferOverflow => write!(f, "BufferOverflow"),
            TargetError(e) => write!(f, "TargetError({:?})", e),
            NonFatal(code) => write!(f, "NonFatal({})", code),
            Unsupported => write!(f, "Unsupported"),
        }
    }
}

impl<T: Debug, C: Debug> Display for Error<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use self::Error::*;
        match self {
            ConnectionRead(e) => write!(f, "Connection error while reading request: {:?}", e),
            ConnectionWrite(e) => write!(f, "Connection error while writing response: {:?}", e),
            BufferOverflow => write!(f, "Packet too big for the provided buffer"),
            TargetError(e) => write!(f, "Target raised a fatal error: {:?}", e),
            NonFatal(_) | Unsupported => {
                write!(f, "Internal non-fatal error escaped the dispatcher (bug)")
            }
        }
    }
}

#[cfg(feature = "std")]
impl<T: Debug, C: Debug> std::error::Error for Error<T, C> {}
