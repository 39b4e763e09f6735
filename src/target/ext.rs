//! Optional [`Target`] capabilities, expressed as extension traits.
//!
//! A target opts into a capability by implementing the extension trait and
//! overriding the matching `support_*` method on [`Target`] to return
//! `Some(self)`. The stub queries `support_*` before advertising or acting
//! on the capability, so an unimplemented extension cleanly degrades into
//! the RSP "unsupported" (empty) reply.

use crate::common::MemAddr;
use crate::target::Target;
use crate::target::TargetResult;
use crate::target::TracepointAction;
use crate::target::TracepointType;

macro_rules! define_ext {
    ($extname:ident, $exttrait:ident) => {
        #[doc = concat!("See [`", stringify!($exttrait), "`].")]
        pub type $extname<'a, T> = &'a mut dyn $exttrait<Error = <T as Target>::Error>;
    };
}

/// Target Extension - restart the target from its initial state.
pub trait Restart: Target {
    /// Restart the target.
    ///
    /// Invoked by the `R` packet, which GDB only sends in extended mode
    /// (negotiated via `!`). No reply is generated.
    fn restart(&mut self) -> TargetResult<(), Self>;
}

define_ext!(RestartOps, Restart);

/// Target Extension - kill the target.
pub trait Kill: Target {
    /// Kill the target.
    ///
    /// Invoked by the `k` packet. The stub's run loop terminates with
    /// [`RunExit::Kill`](crate::stub::RunExit::Kill) afterwards, whether or
    /// not the target reports success.
    fn kill(&mut self) -> TargetResult<(), Self>;
}

define_ext!(KillOps, Kill);

/// Target Extension - set and clear tracepoints (breakpoints and
/// watchpoints).
pub trait Tracepoints: Target {
    /// Plant a tracepoint at `addr`.
    fn tracepoint_set(
        &mut self,
        addr: MemAddr,
        ty: TracepointType,
        action: TracepointAction,
    ) -> TargetResult<(), Self>;

    /// Remove the tracepoint at `addr`.
    fn tracepoint_clear(&mut self, addr: MemAddr) -> TargetResult<(), Self>;
}

define_ext!(TracepointsOps, Tracepoints);
