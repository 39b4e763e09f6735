use log::debug;
use log::trace;

use crate::conn::Connection;
use crate::monitor::MonitorOutput;
use crate::protocol::commands::Features;
use crate::protocol::response::ResponseWriter;
use crate::stub::core_impl::GdbStubImpl;
use crate::stub::core_impl::HandlerStatus;
use crate::stub::core_impl::RemoteFeatures;
use crate::stub::error::errno;
use crate::stub::Error;
use crate::target::Target;
use crate::tdesc;

impl<T: Target, C: Connection> GdbStubImpl<T, C> {
    /// `qTStatus` — there is no trace experiment running, ever.
    pub(crate) fn handle_q_tstatus(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        res.write_str("T0")?;
        Ok(HandlerStatus::Handled)
    }

    /// `qSupported[:feature[;feature]...]` — feature negotiation.
    pub(crate) fn handle_q_supported(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        features: Features<'_>,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        for feature in features.iter() {
            match (feature.name, feature.val) {
                ("xmlRegisters", Some(archs)) => {
                    // the value is a comma-separated list of architectures
                    // the client has XML support compiled in for
                    if archs
                        .split(',')
                        .any(|tok| target.arch().matches_xml_registers(tok))
                    {
                        self.features |= RemoteFeatures::TARGET_DESC_READ;
                    }
                }
                _ => trace!("ignoring qSupported feature: {}", feature.name),
            }
        }

        res.write_str("qXfer:features:read+")?;
        Ok(HandlerStatus::Handled)
    }

    /// `qXfer:features:read:annex:off,len` — serve a slice of the cached
    /// target description.
    pub(crate) fn handle_q_xfer_features_read(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        annex: &[u8],
        offset: usize,
        length: usize,
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        if annex != b"target.xml" {
            return Err(Error::NonFatal(errno::BAD_ANNEX));
        }

        if !self.features.contains(RemoteFeatures::TARGET_DESC_READ) {
            debug!("qXfer:features:read without a matching xmlRegisters negotiation");
        }

        let xml = self
            .tdesc
            .get_or_insert_with(|| tdesc::build(target.arch(), target.registers()))
            .as_bytes();

        if offset >= xml.len() {
            // reading past the end: the transfer is complete
            res.write_str("l")?;
        } else {
            let end = offset.saturating_add(length).min(xml.len());
            res.write(if end == xml.len() { b'l' } else { b'm' })?;
            res.write_binary(&xml[offset..end])?;
        }

        Ok(HandlerStatus::Handled)
    }

    /// `qRcmd,<hex>` — run a custom `monitor` command, echoing its output
    /// back hex-encoded.
    pub(crate) fn handle_q_rcmd(
        &mut self,
        res: &mut ResponseWriter<'_, '_, C>,
        target: &mut T,
        cmd: &[u8],
    ) -> Result<HandlerStatus, Error<T::Error, C::Error>> {
        let cmd = core::str::from_utf8(cmd)
            .map_err(|_| Error::NonFatal(errno::PROTOCOL_VIOLATION))?;
        let (name, args) = match cmd.split_once(' ') {
            Some((name, args)) => (name, args),
            None => (cmd, ""),
        };

        // extract the (Copy) handler so the table borrow ends before the
        // handler gets `&mut target`
        let handler = target
            .monitor_commands()
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.handler)
            .ok_or(Error::NonFatal(errno::NOT_FOUND))?;

        let mut out = MonitorOutput::new();
        handler(target, args, &mut out).map_err(Error::NonFatal)?;

        if out.is_empty() {
            res.write_str("OK")?;
        } else {
            res.write_hex_buf(out.as_bytes())?;
        }
        Ok(HandlerStatus::Handled)
    }
}
