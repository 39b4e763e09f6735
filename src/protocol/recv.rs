use log::trace;
use managed::ManagedSlice;

use crate::protocol::hex::decode_hex;
use crate::util::managed_vec::CapacityError;
use crate::util::managed_vec::ManagedVec;

/// Packet receive states.
///
/// ```text
/// WaitForStart --'$'--> Body --'#'--> Checksum --2 digits--> WaitForStart
/// ```
enum State {
    /// Discarding bytes until a `$` (or an out-of-band 0x03) shows up.
    WaitForStart,
    /// Accumulating body bytes until the `#` terminator.
    Body,
    /// Collecting the two checksum digits.
    Checksum { digits_left: u8 },
}

/// What a completed `pump` cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvEvent {
    /// A 0x03 byte arrived outside a frame: GDB requests an asynchronous
    /// stop.
    Interrupt,
    /// A full frame arrived and its checksum matched. The body occupies
    /// `buf[1..1 + body_len]` (offset 0 holds the `$`).
    Packet { body_len: usize },
    /// A full frame arrived with a mismatched (or unparseable) checksum.
    /// The caller NACKs with `-` and GDB retransmits.
    BadChecksum,
}

/// Receives packets incrementally using a resumable state machine.
///
/// Bytes are fed in one at a time; the packet buffer only ever holds the
/// current in-flight frame, and its offset rewinds to 0 between frames
/// (capacity is retained).
pub struct RecvStateMachine {
    state: State,
    idx: usize,
    body_len: usize,
}

impl RecvStateMachine {
    pub fn new() -> RecvStateMachine {
        RecvStateMachine {
            state: State::WaitForStart,
            idx: 0,
            body_len: 0,
        }
    }

    /// Drop any partially received frame and return to `WaitForStart`.
    pub fn reset(&mut self) {
        self.state = State::WaitForStart;
        self.idx = 0;
        self.body_len = 0;
    }

    /// Feed a single byte into the state machine.
    ///
    /// Returns `Ok(Some(event))` when the byte completed something
    /// noteworthy. After a `Packet`/`BadChecksum` event the machine has
    /// already rewound and the next `$` starts a fresh frame.
    pub fn pump(
        &mut self,
        packet_buffer: &mut ManagedSlice<'_, u8>,
        byte: u8,
    ) -> Result<Option<RecvEvent>, CapacityError<u8>> {
        match self.state {
            State::WaitForStart => {
                if byte == b'$' {
                    // frame start lands at offset 0; everything before it
                    // (line noise, stray acks) was silently discarded
                    self.idx = 0;
                    self.push(packet_buffer, byte)?;
                    self.state = State::Body;
                } else if byte == 0x03 {
                    return Ok(Some(RecvEvent::Interrupt));
                }
                Ok(None)
            }
            State::Body => {
                self.push(packet_buffer, byte)?;
                if byte == b'#' {
                    // bytes strictly between '$' and '#'
                    self.body_len = self.idx - 2;
                    self.state = State::Checksum { digits_left: 2 };
                }
                Ok(None)
            }
            State::Checksum { digits_left } => {
                self.push(packet_buffer, byte)?;
                if digits_left > 1 {
                    self.state = State::Checksum {
                        digits_left: digits_left - 1,
                    };
                    return Ok(None);
                }

                let event = self.check_frame(packet_buffer);
                self.reset();
                Ok(Some(event))
            }
        }
    }

    fn push(
        &mut self,
        packet_buffer: &mut ManagedSlice<'_, u8>,
        byte: u8,
    ) -> Result<(), CapacityError<u8>> {
        let mut buf = ManagedVec::new_with_idx(packet_buffer, self.idx);
        buf.push(byte)?;
        self.idx += 1;
        Ok(())
    }

    /// Validate the checksum of the completed frame sitting in the buffer.
    fn check_frame(&self, packet_buffer: &ManagedSlice<'_, u8>) -> RecvEvent {
        let body_len = self.body_len;
        let body = &packet_buffer[1..1 + body_len];
        let digits = &packet_buffer[body_len + 2..body_len + 4];

        let expected: u8 = match decode_hex(digits) {
            Ok(c) => c,
            Err(_) => return RecvEvent::BadChecksum,
        };
        let calculated = body.iter().fold(0u8, |a, x| a.wrapping_add(*x));

        if calculated == expected {
            trace!(
                "<-- {}",
                core::str::from_utf8(&packet_buffer[..body_len + 4])
                    .unwrap_or("<invalid packet>")
            );
            RecvEvent::Packet { body_len }
        } else {
            trace!(
                "<-- packet with bad checksum: got {:02X}, calculated {:02X}",
                expected,
                calculated
            );
            RecvEvent::BadChecksum
        }
    }
}
