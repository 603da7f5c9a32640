//! Local copy of the controller's input registers.

use core::fmt::Debug;

use tracing::trace;

use crate::error::{Error, Result};
use crate::register::{REGISTER_COUNT, RegisterBlock, START_ADDRESS};
use crate::transport::Transport;

/// The most recently read register block, along with the connection flag and refresh policy.
///
/// The block is only ever replaced as a whole. A failed refresh leaves the previous block in
/// place.
#[derive(Debug, Clone)]
pub struct RegisterCache {
    block: Option<RegisterBlock>,
    connected: bool,
    auto_refresh: bool,
}

impl RegisterCache {
    pub fn new(auto_refresh: bool) -> Self {
        Self {
            block: None,
            connected: false,
            auto_refresh,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn auto_refresh(&self) -> bool {
        self.auto_refresh
    }

    pub fn set_auto_refresh(&mut self, auto_refresh: bool) {
        self.auto_refresh = auto_refresh;
    }

    /// Read the whole register block from the device and replace the cached one.
    pub fn refresh<T: Transport>(
        &mut self,
        transport: &mut T,
        device_id: u8,
    ) -> Result<&RegisterBlock, T::Error> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let response = transport
            .read_input_registers(START_ADDRESS, REGISTER_COUNT as u16, device_id)
            .map_err(|cause| Error::Io {
                operation: "reading input registers",
                cause,
            })?
            .ok_or(Error::NoResponse)?;
        if let Some(code) = response.exception_code() {
            return Err(Error::Exception(code));
        }
        self.store(response.registers())
    }

    /// Refresh only if the auto-refresh policy is enabled.
    pub fn maybe_refresh<T: Transport>(
        &mut self,
        transport: &mut T,
        device_id: u8,
    ) -> Result<(), T::Error> {
        if self.auto_refresh {
            self.refresh(transport, device_id)?;
        }
        Ok(())
    }

    /// Replace the cached block with the first [`REGISTER_COUNT`] of `registers`.
    pub fn store<E: Debug>(&mut self, registers: &[u16]) -> Result<&RegisterBlock, E> {
        let block: RegisterBlock = registers
            .get(..REGISTER_COUNT)
            .and_then(|words| words.try_into().ok())
            .ok_or(Error::UnexpectedPayload(registers.len()))?;
        trace!(registers = ?block, "register block refreshed");
        Ok(self.block.insert(block))
    }

    /// The cached block. Fails if nothing has been read yet.
    pub fn block<E: Debug>(&self) -> Result<&RegisterBlock, E> {
        self.block.as_ref().ok_or(Error::NotConnected)
    }

    pub fn has_block(&self) -> bool {
        self.block.is_some()
    }
}
