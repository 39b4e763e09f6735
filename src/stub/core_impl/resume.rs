use crate::conn::Connection;
use crate::protocol::commands::ResumeAction;
use crate::protocol::response::ResponseWriter;
use crate::stub::core_impl::GdbStubImpl;
use crate::stub::core_impl::HandlerStatus;
use crate::stub::core_impl::TargetResultExt;
use crate::stub::Error;
use crate::target::Target;
use crate::target::TargetState;

impl<T: Target, C: Connection> GdbStubImpl<T, C> {
    /// `c` — resume execution. No reply until something stops the target,
    /// which the run loop's edge check reports asynchronously.
    pub(crate) fn handle_cont(
        &mut self,
        target: &mut T,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        target.resume().handle_error()?;
        self.last_state = Some(TargetState::Running);
        Ok(HandlerStatus::NoReply)
    }

    /// `s` — step one instruction and report the stop.
    pub(crate) fn handle_step(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        target.step().handle_error()?;
        self.last_state = Some(TargetState::Stopped);
        res.write_str("S05")?;
        Ok(HandlerStatus::Handled)
    }

    /// `vCont?` — report the supported resume actions.
    pub(crate) fn handle_vcont_query(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        reply: &'static str,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        res.write_str(reply)?;
        Ok(HandlerStatus::Handled)
    }

    /// `vCont;action[:tid]` — thread IDs were already discarded during
    /// parsing; the action maps straight onto `c`/`s`/stop semantics.
    pub(crate) fn handle_vcont(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        action: ResumeAction,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        match action {
            ResumeAction::Continue => self.handle_cont(target),
            ResumeAction::Step => self.handle_step(res, target),
            ResumeAction::Stop => {
                target.stop().handle_error()?;
                self.last_state = Some(TargetState::Stopped);
                res.write_str("S05")?;
                Ok(HandlerStatus::Handled)
            }
        }
    }
}
