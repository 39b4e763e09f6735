use log::warn;

use crate::common::MemAddr;
use crate::conn::Connection;
use crate::protocol::response::ResponseWriter;
use crate::stub::core_impl::GdbStubImpl;
use crate::stub::core_impl::HandlerStatus;
use crate::stub::core_impl::TargetResultExt;
use crate::stub::core_impl::MEM_CHUNK_SIZE;
use crate::stub::error::errno;
use crate::stub::Error;
use crate::stub::RunExit;
use crate::target::Target;
use crate::target::TargetError;

impl<T: Target, C: Connection> GdbStubImpl<T, C> {
    /// `!` — enter extended mode, if the target can actually restart.
    pub(crate) fn handle_extended_mode(
        &mut self,
        target: &mut T,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        if target.support_restart().is_none() {
            return Ok(HandlerStatus::Handled);
        }

        self.extended_mode = true;
        Ok(HandlerStatus::NeedsOk)
    }

    /// `?` — report the current stop reason.
    pub(crate) fn handle_question_mark(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        res.write_str("S05")?;
        Ok(HandlerStatus::Handled)
    }

    /// `g` — read the whole register file in one target call.
    pub(crate) fn handle_read_registers(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        self.init_reg_cache(target);

        target
            .read_registers(&self.reg_indices, &mut self.reg_scratch)
            .handle_error()?;
        res.write_hex_buf(&self.reg_scratch)?;
        Ok(HandlerStatus::Handled)
    }

    /// `G` — write the whole register file.
    pub(crate) fn handle_write_registers(
        &mut self,
        target: &mut T,
        data: &[u8],
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        self.init_reg_cache(target);

        if data.len() != self.reg_scratch.len() {
            return Err(Error::NonFatal(errno::PROTOCOL_VIOLATION));
        }

        target
            .write_registers(&self.reg_indices, data)
            .handle_error()?;
        Ok(HandlerStatus::NeedsOk)
    }

    /// `m addr,len` — read memory, streamed to the reply in 1 KiB chunks.
    pub(crate) fn handle_read_mem(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        addr: MemAddr,
        len: usize,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        let mut chunk = [0u8; MEM_CHUNK_SIZE];
        let mut pos = 0;

        while pos < len {
            let n = (len - pos).min(MEM_CHUNK_SIZE);
            target
                .read_mem(addr.wrapping_add(pos as u64), &mut chunk[..n])
                .handle_error()?;
            // the reply cursor advances by the encoded (doubled) size
            res.write_hex_buf(&chunk[..n])?;
            pos += n;
        }

        Ok(HandlerStatus::Handled)
    }

    /// `M addr,len:data` — write memory.
    pub(crate) fn handle_write_mem(
        &mut self,
        target: &mut T,
        addr: MemAddr,
        data: &[u8],
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        target.write_mem(addr, data).handle_error()?;
        Ok(HandlerStatus::NeedsOk)
    }

    /// `p n` — read a single register.
    pub(crate) fn handle_read_reg(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        reg: u32,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        self.init_reg_cache(target);

        let size = match target.registers().get(reg as usize) {
            Some(desc) => desc.size_bytes(),
            None => return Err(Error::NonFatal(errno::PROTOCOL_VIOLATION)),
        };

        target
            .read_registers(&[reg], &mut self.reg_scratch[..size])
            .handle_error()?;
        res.write_hex_buf(&self.reg_scratch[..size])?;
        Ok(HandlerStatus::Handled)
    }

    /// `P n=data` — write a single register.
    pub(crate) fn handle_write_reg(
        &mut self,
        target: &mut T,
        reg: u32,
        data: &[u8],
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        let size = match target.registers().get(reg as usize) {
            Some(desc) => desc.size_bytes(),
            None => return Err(Error::NonFatal(errno::PROTOCOL_VIOLATION)),
        };
        if data.len() != size {
            return Err(Error::NonFatal(errno::PROTOCOL_VIOLATION));
        }

        target.write_registers(&[reg], data).handle_error()?;
        Ok(HandlerStatus::NeedsOk)
    }

    /// `R` — restart the target. Only honored in extended mode; never
    /// replied to either way.
    pub(crate) fn handle_restart(
        &mut self,
        target: &mut T,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        if !self.extended_mode {
            return Ok(HandlerStatus::NoReply);
        }

        if let Some(ops) = target.support_restart() {
            ops.restart().handle_error()?;
            // whatever state the target restarts into is re-observed fresh
            self.last_state = None;
        }

        Ok(HandlerStatus::NoReply)
    }

    /// `k` — kill the target and end the session. No reply is defined.
    pub(crate) fn handle_kill(
        &mut self,
        target: &mut T,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        if let Some(ops) = target.support_kill() {
            match ops.kill() {
                Ok(()) => {}
                Err(TargetError::Fatal(e)) => return Err(Error::TargetError(e)),
                Err(_) => warn!("target failed to die on kill request"),
            }
        }

        Ok(HandlerStatus::Disconnect(RunExit::Kill))
    }
}
