use log::trace;
use managed::ManagedSlice;

use crate::conn::Connection;
use crate::protocol::hex::encode_byte;
use crate::util::managed_vec::CapacityError;
use crate::util::managed_vec::ManagedVec;

/// Error while emitting a response frame.
#[derive(Debug)]
pub enum ResponseWriterError<C> {
    /// Transport error during the final write.
    Connection(C),
    /// The reply did not fit in the (borrowed) reply buffer.
    Capacity,
}

impl<C> From<CapacityError<u8>> for ResponseWriterError<C> {
    fn from(_: CapacityError<u8>) -> Self {
        ResponseWriterError::Capacity
    }
}

/// Accumulates a single RSP reply body in the session's reply buffer, then
/// frames and transmits it in one transport write.
///
/// The frame layout `$<body>#<hh>` is assembled in place: `$` is reserved at
/// offset 0 on first use, the two uppercase checksum digits are appended by
/// [`flush`](ResponseWriter::flush), and the whole frame goes out through a
/// single [`Connection::write_all`] call. Dropping the writer without
/// flushing discards the body (used for packets that take no reply, such as
/// `c` and `R`).
pub struct ResponseWriter<'a, 'b, C: Connection> {
    conn: &'b mut C,
    buf: ManagedVec<'a, 'b, u8>,
    started: bool,
}

impl<'a, 'b, C: Connection> ResponseWriter<'a, 'b, C> {
    /// Create a new ResponseWriter over the session's reply buffer.
    ///
    /// The buffer's previous contents are discarded (its capacity is
    /// retained).
    pub fn new(conn: &'b mut C, reply_buffer: &'b mut ManagedSlice<'a, u8>) -> Self {
        Self {
            conn,
            buf: ManagedVec::new(reply_buffer),
            started: false,
        }
    }

    /// Write a single body byte.
    pub fn write(&mut self, byte: u8) -> Result<(), CapacityError<u8>> {
        if !self.started {
            self.started = true;
            self.buf.push(b'$')?;
        }
        self.buf.push(byte)
    }

    /// Write an entire buffer into the body.
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), CapacityError<u8>> {
        data.iter().try_for_each(|b| self.write(*b))
    }

    /// Write an entire string into the body.
    pub fn write_str(&mut self, s: &str) -> Result<(), CapacityError<u8>> {
        self.write_all(s.as_bytes())
    }

    /// Write a single byte as two uppercase hex digits.
    pub fn write_hex(&mut self, byte: u8) -> Result<(), CapacityError<u8>> {
        let [hi, lo] = encode_byte(byte);
        self.write(hi)?;
        self.write(lo)
    }

    /// Write an entire buffer as a hex string (two digits per byte).
    pub fn write_hex_buf(&mut self, data: &[u8]) -> Result<(), CapacityError<u8>> {
        data.iter().try_for_each(|b| self.write_hex(*b))
    }

    /// Write a buffer using RSP binary escaping: `$`, `#`, `*` and `}` are
    /// sent as `}` followed by the byte XORed with 0x20.
    pub fn write_binary(&mut self, data: &[u8]) -> Result<(), CapacityError<u8>> {
        data.iter().try_for_each(|&b| match b {
            b'$' | b'#' | b'*' | b'}' => {
                self.write(b'}')?;
                self.write(b ^ 0x20)
            }
            _ => self.write(b),
        })
    }

    /// Write an `E NN` error reply body.
    pub fn error(&mut self, errno: u8) -> Result<(), CapacityError<u8>> {
        self.write(b'E')?;
        self.write_hex(errno)
    }

    /// Consume self, appending the `#` terminator and checksum digits and
    /// transmitting the whole frame.
    pub fn flush(mut self) -> Result<(), ResponseWriterError<C::Error>> {
        // a bodiless reply is still a frame: `$#00`
        if !self.started {
            self.buf.push(b'$')?;
        }

        let checksum = self.buf.as_slice()[1..]
            .iter()
            .fold(0u8, |a, x| a.wrapping_add(*x));

        self.buf.push(b'#')?;
        let [hi, lo] = encode_byte(checksum);
        self.buf.push(hi)?;
        self.buf.push(lo)?;

        trace!(
            "--> {}",
            core::str::from_utf8(self.buf.as_slice()).unwrap_or("<non-ascii reply>")
        );

        self.conn
            .write_all(self.buf.as_slice())
            .map_err(ResponseWriterError::Connection)
    }
}
