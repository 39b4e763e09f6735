use core::marker::PhantomData;

use alloc::string::String;
use alloc::vec::Vec;
use bitflags::bitflags;
use log::debug;
use log::info;
use log::warn;
use managed::ManagedSlice;

use crate::conn::Connection;
use crate::protocol::commands::Command;
use crate::protocol::recv::RecvEvent;
use crate::protocol::recv::RecvStateMachine;
use crate::protocol::response::ResponseWriter;
use crate::stub::error::errno;
use crate::stub::Error;
use crate::stub::RunExit;
use crate::target::Target;
use crate::target::TargetError;
use crate::target::TargetState;

mod base;
mod query;
mod resume;
mod tracepoints;

bitflags! {
    /// Options negotiated with the peer via `qSupported`.
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct RemoteFeatures: u8 {
        /// The peer named this target's architecture in `xmlRegisters=` and
        /// will fetch the target description.
        const TARGET_DESC_READ = 1 << 0;
    }
}

/// Raw bytes per chunk when streaming an `m` reply.
const MEM_CHUNK_SIZE: usize = 1024;

/// Transport reads are drained through a stack buffer of this size.
const RECV_CHUNK_SIZE: usize = 256;

/// How a handled command wants the session loop to conclude the packet.
pub(crate) enum HandlerStatus {
    /// The reply body (possibly empty) is in the response writer.
    Handled,
    /// Append `OK` and send.
    NeedsOk,
    /// This packet takes no reply at all (`c`, `R`, `k`, `vCont;c`).
    NoReply,
    /// Tear the session down after this packet.
    Disconnect(RunExit),
}

/// Adapter from [`crate::target::TargetResult`] to dispatcher errors:
/// errno-style failures and unsupported operations become internal,
/// intercepted error variants (an `E NN` or empty reply), fatal errors abort
/// the session.
pub(crate) trait TargetResultExt<V, T, C> {
    fn handle_error(self) -> Result<V, Error<T, C>>;
}

impl<V, T, C> TargetResultExt<V, T, C> for Result<V, TargetError<T>> {
    fn handle_error(self) -> Result<V, Error<T, C>> {
        self.map_err(|err| match err {
            TargetError::Unsupported => Error::Unsupported,
            TargetError::Errno(code) => Error::NonFatal(code),
            TargetError::Fatal(e) => Error::TargetError(e),
        })
    }
}

pub(crate) struct GdbStubImpl<T: Target, C: Connection> {
    recv: RecvStateMachine,
    features: RemoteFeatures,
    extended_mode: bool,
    /// Last observed run-state; `None` until the first observation (and
    /// after a restart, whose resulting state is the target's business).
    last_state: Option<TargetState>,
    /// Identity permutation over the register table, so a full `g`/`G` is a
    /// single target call. Built lazily from the descriptor table.
    reg_indices: Vec<u32>,
    /// Scratch sized to the register file's summed byte widths.
    reg_scratch: Vec<u8>,
    /// Cached target description, built at most once per session.
    tdesc: Option<String>,
    session_started: bool,

    _target: PhantomData<T>,
    _connection: PhantomData<C>,
}

impl<T: Target, C: Connection> GdbStubImpl<T, C> {
    pub fn new() -> GdbStubImpl<T, C> {
        GdbStubImpl {
            recv: RecvStateMachine::new(),
            features: RemoteFeatures::empty(),
            extended_mode: false,
            last_state: None,
            reg_indices: Vec::new(),
            reg_scratch: Vec::new(),
            tdesc: None,
            session_started: false,

            _target: PhantomData,
            _connection: PhantomData,
        }
    }

    pub fn reset(&mut self) {
        self.recv.reset();
    }

    pub fn run(
        &mut self,
        target: &mut T,
        conn: &mut C,
        packet_buffer: &mut ManagedSlice<'_, u8>,
        reply_buffer: &mut ManagedSlice<'_, u8>,
    ) -> Result<RunExit, Error<T::Error, C::Error>> {
        if !self.session_started {
            self.session_started = true;
            conn.on_session_start().map_err(Error::ConnectionRead)?;
        }

        loop {
            // an asynchronous stop is reported before any input is consumed
            self.report_stop_edge(target, conn, reply_buffer)?;

            let avail = conn.peek().map_err(Error::ConnectionRead)?;
            if avail == 0 {
                if !conn.poll().map_err(Error::ConnectionRead)? {
                    return Ok(RunExit::TryAgain);
                }
                continue;
            }

            let mut chunk = [0u8; RECV_CHUNK_SIZE];
            let want = avail.min(chunk.len());
            let got = conn
                .read(&mut chunk[..want])
                .map_err(Error::ConnectionRead)?;
            if got == 0 {
                return Ok(RunExit::PeerDisconnected);
            }

            // every byte of the chunk is pumped before touching the
            // transport again
            for &byte in &chunk[..got] {
                let event = match self.recv.pump(packet_buffer, byte)? {
                    Some(event) => event,
                    None => continue,
                };

                match event {
                    RecvEvent::Interrupt => {
                        self.handle_interrupt(target, conn, reply_buffer)?
                    }
                    RecvEvent::BadChecksum => {
                        conn.write_all(b"-").map_err(Error::ConnectionWrite)?
                    }
                    RecvEvent::Packet { body_len } => {
                        // ack first: GDB may queue its next packet while the
                        // (synchronous) dispatcher is still running
                        conn.write_all(b"+").map_err(Error::ConnectionWrite)?;

                        if let Some(exit) = self.handle_packet(
                            target,
                            conn,
                            packet_buffer,
                            reply_buffer,
                            body_len,
                        )? {
                            return Ok(exit);
                        }
                    }
                }
            }
        }
    }

    fn handle_packet(
        &mut self,
        target: &mut T,
        conn: &mut C,
        packet_buffer: &mut ManagedSlice<'_, u8>,
        reply_buffer: &mut ManagedSlice<'_, u8>,
        body_len: usize,
    ) -> Result<Option<RunExit>, Error<T::Error, C::Error>> {
        let body = &mut packet_buffer[1..1 + body_len];
        let cmd = match Command::from_body(body) {
            Ok(cmd) => cmd,
            Err(_) => {
                // a recognized command with a malformed body
                let mut res = ResponseWriter::new(conn, reply_buffer);
                res.error(errno::PROTOCOL_VIOLATION)?;
                res.flush()?;
                return Ok(None);
            }
        };

        let mut res = ResponseWriter::new(conn, reply_buffer);
        match self.handle_command(&mut res, target, cmd) {
            Ok(HandlerStatus::Handled) => res.flush()?,
            Ok(HandlerStatus::NeedsOk) => {
                res.write_str("OK")?;
                res.flush()?;
            }
            Ok(HandlerStatus::NoReply) => drop(res),
            Ok(HandlerStatus::Disconnect(exit)) => return Ok(Some(exit)),
            Err(Error::Unsupported) => {
                // RSP "unsupported": the empty reply, discarding whatever
                // the handler had already written
                drop(res);
                let res = ResponseWriter::new(conn, reply_buffer);
                res.flush()?;
            }
            Err(Error::NonFatal(code)) => {
                drop(res);
                let mut res = ResponseWriter::new(conn, reply_buffer);
                res.error(code)?;
                res.flush()?;
            }
            Err(e) => return Err(e),
        }

        Ok(None)
    }

    fn handle_command(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        cmd: Command<'_>,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        match cmd {
            Command::Unknown(body) => {
                info!(
                    "unknown command: {}",
                    core::str::from_utf8(body).unwrap_or("<non-utf8>")
                );
                // empty reply means "unsupported"
                Ok(HandlerStatus::Handled)
            }

            Command::ExtendedMode => self.handle_extended_mode(target),
            Command::QuestionMark => self.handle_question_mark(res),
            Command::ReadRegisters => self.handle_read_registers(res, target),
            Command::WriteRegisters(data) => self.handle_write_registers(target, data),
            Command::ReadMem { addr, len } => self.handle_read_mem(res, target, addr, len),
            Command::WriteMem { addr, data } => self.handle_write_mem(target, addr, data),
            Command::ReadReg(reg) => self.handle_read_reg(res, target, reg),
            Command::WriteReg { reg, data } => self.handle_write_reg(target, reg, data),
            Command::Restart => self.handle_restart(target),
            Command::Kill => self.handle_kill(target),

            Command::Cont => self.handle_cont(target),
            Command::Step => self.handle_step(res, target),
            Command::VContQuery(reply) => self.handle_vcont_query(res, reply),
            Command::VCont(action) => self.handle_vcont(res, target, action),

            Command::QSupported(features) => self.handle_q_supported(res, target, features),
            Command::QXferFeaturesRead { annex, offset, length } => {
                self.handle_q_xfer_features_read(res, target, annex, offset, length)
            }
            Command::QRcmd(cmd) => self.handle_q_rcmd(res, target, cmd),
            Command::QTStatus => self.handle_q_tstatus(res),

            Command::TracepointSet { ty, addr } => self.handle_tracepoint_set(target, ty, addr),
            Command::TracepointClear { ty, addr } => {
                self.handle_tracepoint_clear(target, ty, addr)
            }
        }
    }

    /// Emit an unsolicited `S05` if the target stopped on its own since the
    /// last look (e.g. a tracepoint hit while continuing).
    fn report_stop_edge(
        &mut self,
        target: &mut T,
        conn: &mut C,
        reply_buffer: &mut ManagedSlice<'_, u8>,
    ) -> Result<(), Error<T::Error, C::Error>> {
        let state = target.state();
        let stopped = matches!(self.last_state, Some(TargetState::Running))
            && state == TargetState::Stopped;
        self.last_state = Some(state);

        if stopped {
            debug!("target stopped asynchronously, sending stop-reply");
            let mut res = ResponseWriter::new(conn, reply_buffer);
            res.write_str("S05")?;
            res.flush()?;
        }

        Ok(())
    }

    /// Out-of-band 0x03: stop the target and report it.
    fn handle_interrupt(
        &mut self,
        target: &mut T,
        conn: &mut C,
        reply_buffer: &mut ManagedSlice<'_, u8>,
    ) -> Result<(), Error<T::Error, C::Error>> {
        debug!("<-- interrupt request");

        match target.stop() {
            Ok(()) => {}
            Err(TargetError::Fatal(e)) => return Err(Error::TargetError(e)),
            Err(_) => warn!("target failed to stop on interrupt"),
        }
        self.last_state = Some(TargetState::Stopped);

        let mut res = ResponseWriter::new(conn, reply_buffer);
        res.write_str("S05")?;
        res.flush()?;
        Ok(())
    }

    /// Build the register index vector and scratch buffer from the
    /// descriptor table. Idempotent.
    fn init_reg_cache(&mut self, target: &mut T) {
        if !self.reg_indices.is_empty() {
            return;
        }

        let regs = target.registers();
        self.reg_indices = (0..regs.len() as u32).collect();
        self.reg_scratch = alloc::vec![0; regs.iter().map(|r| r.size_bytes()).sum::<usize>()];
    }
}
