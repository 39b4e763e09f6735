use crate::common::MemAddr;
use crate::conn::Connection;
use crate::stub::core_impl::GdbStubImpl;
use crate::stub::core_impl::HandlerStatus;
use crate::stub::core_impl::TargetResultExt;
use crate::stub::Error;
use crate::target::Target;
use crate::target::TracepointAction;
use crate::target::TracepointType;

impl<T: Target, C: Connection> GdbStubImpl<T, C> {
    /// `Z T,addr,kind` — plant a tracepoint.
    pub(crate) fn handle_tracepoint_set(
        &mut self,
        target: &mut T,
        ty: TracepointType,
        addr: MemAddr,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        let ops = match target.support_tracepoints() {
            Some(ops) => ops,
            // empty reply: GDB falls back to software breakpoints via `M`
            None => return Ok(HandlerStatus::Handled),
        };

        ops.tracepoint_set(addr, ty, TracepointAction::Stop)
            .handle_error()?;
        Ok(HandlerStatus::NeedsOk)
    }

    /// `z T,addr,kind` — remove a tracepoint.
    pub(crate) fn handle_tracepoint_clear(
        &mut self,
        target: &mut T,
        _ty: TracepointType,
        addr: MemAddr,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        let ops = match target.support_tracepoints() {
            Some(ops) => ops,
            None => return Ok(HandlerStatus::Handled),
        };

        ops.tracepoint_clear(addr).handle_error()?;
        Ok(HandlerStatus::NeedsOk)
    }
}
