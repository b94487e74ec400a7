//! The capability every holding-register peripheral exposes. Kept narrow
//! and sealed: device clients build on top of [`handshake::run`] directly
//! rather than through virtual dispatch, so this trait exists mainly to
//! pin down the shared status/result read shape in one place.

use crate::error::DeviceError;
use cell_protocol::StatusWord;
use cell_transport::ModbusTransport;

mod sealed {
    pub trait Sealed {}
}

/// A device addressable on the shared Modbus-TCP bus through a
/// command/status register pair. Stands in for the duck-typed "any object
/// with `.send_command`" peripherals were addressed as upstream: flow
/// executors talk to this capability, not to concrete clients.
pub trait Peripheral: sealed::Sealed {
    fn transport(&self) -> &ModbusTransport;
    fn status_reg(&self) -> u16;
    fn command_reg(&self) -> u16;

    fn read_status(&self) -> Result<StatusWord, DeviceError> {
        let raw = self.transport().read_u16(self.status_reg())?;
        Ok(StatusWord::from_raw(raw))
    }

    fn is_ready(&self) -> Result<bool, DeviceError> {
        Ok(self.read_status()?.accepts_command())
    }

    /// Writes a command code followed by its parameters as one contiguous
    /// block starting at `command_reg()`.
    fn send_command(&self, code: u16, params: &[u16]) -> Result<(), DeviceError> {
        let mut values = Vec::with_capacity(params.len() + 1);
        values.push(code);
        values.extend_from_slice(params);
        Ok(self.transport().write_block(self.command_reg(), values)?)
    }

    /// Reads `count` consecutive registers starting at `addr` out of this
    /// peripheral's result area.
    fn read_result(&self, addr: u16, count: u16) -> Result<Vec<u16>, DeviceError> {
        Ok(self.transport().read_block(addr, count)?)
    }
}

pub(crate) use sealed::Sealed;
