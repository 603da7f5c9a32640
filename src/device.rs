//! The CPA1110 client.

use core::ops::{Deref, DerefMut};

use tracing::debug;

use crate::{
    cache::RegisterCache,
    codec::RegisterCode,
    config::CpaConfig,
    error::{Error, Result},
    link::{DeviceLink, IoError},
    register::{ControlCommand, Field, FieldValue, HoldingRegister, RegisterBlock},
    transport::{ModbusTransport, Transport, TransportError},
    types::{CpaSnapshot, Errors, OperatingState, PressureUnits, TemperatureUnits, Warnings},
};

/// Client for one CPA1110 controller, talking through any [`Transport`].
///
/// Accessors read from a local copy of the input registers. With auto-refresh enabled (the
/// default) every accessor reads the device first; otherwise the copy only changes on
/// [`Cpa1110::refresh`]. Use [`Cpa1110::read_snapshot`] to get every value from one read.
///
/// All methods take `&mut self`. To share a client between threads wrap it in a
/// [`std::sync::Mutex`], so a refresh and the decode that follows it stay together.
pub struct Cpa1110<T: Transport> {
    transport: T,
    cache: RegisterCache,
    device_id: u8,
}

/// A [`Cpa1110`] reached over a real serial port or TCP socket.
pub type NetworkCpa1110 = Cpa1110<ModbusTransport<DeviceLink>>;

impl NetworkCpa1110 {
    /// Create a client over the serial or TCP link described by `config`.
    pub fn open(config: &CpaConfig) -> Result<Self, TransportError<IoError>> {
        let link = config.link().map_err(Error::InvalidConfig)?;
        debug!(
            resource = %config.resource_name,
            connection = ?config.connection_type,
            device_id = config.device_id,
            "creating CPA1110 client"
        );
        Self::new(ModbusTransport::new(link), config)
    }
}

impl<T: Transport> Cpa1110<T> {
    /// Create a client using `transport`.
    ///
    /// If `config.auto_connect` is set this connects and reads the registers once, so the
    /// client can be queried straight away.
    pub fn new(transport: T, config: &CpaConfig) -> Result<Self, T::Error> {
        let mut device = Self {
            transport,
            cache: RegisterCache::new(config.auto_refresh),
            device_id: config.device_id,
        };
        if config.auto_connect {
            device.connect()?;
            device.refresh()?;
        }
        Ok(device)
    }

    /// Open the connection. Does nothing if already connected.
    pub fn connect(&mut self) -> Result<(), T::Error> {
        if self.cache.is_connected() {
            return Ok(());
        }
        self.transport.connect().map_err(Error::ConnectFailed)?;
        self.cache.set_connected(true);
        debug!(device_id = self.device_id, "connected to CPA1110");
        Ok(())
    }

    /// Close the connection.
    pub fn close(&mut self) {
        self.transport.close();
        self.cache.set_connected(false);
        debug!(device_id = self.device_id, "closed connection to CPA1110");
    }

    pub fn is_connected(&self) -> bool {
        self.cache.is_connected()
    }

    /// Connect and return a guard which closes the connection when dropped.
    pub fn session(&mut self) -> Result<Session<'_, T>, T::Error> {
        self.connect()?;
        Ok(Session { device: self })
    }

    /// Read all input registers from the device into the local copy.
    pub fn refresh(&mut self) -> Result<(), T::Error> {
        self.cache.refresh(&mut self.transport, self.device_id)?;
        Ok(())
    }

    pub fn device_id(&self) -> u8 {
        self.device_id
    }

    pub fn auto_refresh(&self) -> bool {
        self.cache.auto_refresh()
    }

    pub fn set_auto_refresh(&mut self, auto_refresh: bool) {
        self.cache.set_auto_refresh(auto_refresh);
    }

    /// The local register copy, without touching the device.
    pub fn cached_block(&self) -> Option<&RegisterBlock> {
        self.cache.block::<T::Error>().ok()
    }

    fn current_block(&mut self) -> Result<&RegisterBlock, T::Error> {
        self.cache.maybe_refresh(&mut self.transport, self.device_id)?;
        self.cache.block()
    }

    /// Decode any field of the register map.
    pub fn read_field(&mut self, field: Field) -> Result<FieldValue, T::Error> {
        let block = self.current_block()?;
        Ok(field.decode(block))
    }

    fn read_float(&mut self, field: Field) -> Result<f32, T::Error> {
        let block = self.current_block()?;
        Ok(field.float(block))
    }

    fn read_int(&mut self, field: Field) -> Result<i32, T::Error> {
        let block = self.current_block()?;
        Ok(field.int(block))
    }

    /// Refresh once and decode every field from that one read.
    pub fn read_snapshot(&mut self) -> Result<CpaSnapshot, T::Error> {
        let block = self.cache.refresh(&mut self.transport, self.device_id)?;
        Ok(CpaSnapshot::decode(block))
    }

    /// Current compressor operating state.
    pub fn operating_state(&mut self) -> Result<OperatingState, T::Error> {
        let raw = self.read_int(Field::OperatingState)?;
        Ok(OperatingState::from_code(raw))
    }

    /// Currently active warnings.
    pub fn warnings(&mut self) -> Result<Warnings, T::Error> {
        let raw = self.read_int(Field::Warnings)?;
        Ok(Warnings::from_raw(raw))
    }

    /// Currently active errors.
    pub fn errors(&mut self) -> Result<Errors, T::Error> {
        let raw = self.read_int(Field::Errors)?;
        Ok(Errors::from_raw(raw))
    }

    /// Coolant inlet temperature, in the unit given by [`Self::temperature_units`].
    pub fn coolant_in_temperature(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::CoolantInTemperature)
    }

    /// Coolant outlet temperature.
    pub fn coolant_out_temperature(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::CoolantOutTemperature)
    }

    pub fn oil_temperature(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::OilTemperature)
    }

    pub fn helium_temperature(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::HeliumTemperature)
    }

    /// Low side pressure, in the unit given by [`Self::pressure_units`].
    pub fn low_pressure(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::LowPressure)
    }

    pub fn low_pressure_average(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::LowPressureAverage)
    }

    /// High side pressure.
    pub fn high_pressure(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::HighPressure)
    }

    pub fn high_pressure_average(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::HighPressureAverage)
    }

    pub fn delta_pressure_average(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::DeltaPressureAverage)
    }

    /// Motor current in amps.
    pub fn motor_current(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::MotorCurrent)
    }

    pub fn hours_of_operation(&mut self) -> Result<f32, T::Error> {
        self.read_float(Field::HoursOfOperation)
    }

    /// Pressure unit configured on the controller.
    pub fn pressure_units(&mut self) -> Result<PressureUnits, T::Error> {
        let raw = self.read_int(Field::PressureUnits)?;
        Ok(PressureUnits::from_code(raw))
    }

    /// Temperature unit configured on the controller.
    pub fn temperature_units(&mut self) -> Result<TemperatureUnits, T::Error> {
        let raw = self.read_int(Field::TemperatureUnits)?;
        Ok(TemperatureUnits::from_code(raw))
    }

    pub fn panel_serial_number(&mut self) -> Result<i32, T::Error> {
        self.read_int(Field::PanelSerialNumber)
    }

    /// Model number, major and minor packed into one value.
    pub fn model_number(&mut self) -> Result<i32, T::Error> {
        self.read_int(Field::ModelNumber)
    }

    pub fn software_rev(&mut self) -> Result<i32, T::Error> {
        self.read_int(Field::SoftwareRev)
    }

    /// Start the compressor.
    pub fn enable_compressor(&mut self) -> Result<(), T::Error> {
        self.write_control(ControlCommand::Start)
    }

    /// Stop the compressor.
    pub fn disable_compressor(&mut self) -> Result<(), T::Error> {
        self.write_control(ControlCommand::Stop)
    }

    fn write_control(&mut self, command: ControlCommand) -> Result<(), T::Error> {
        if !self.cache.is_connected() {
            return Err(Error::NotConnected);
        }
        debug!(?command, device_id = self.device_id, "writing compressor command");
        let response = self
            .transport
            .write_register(
                HoldingRegister::CompressorControl.into(),
                command.into(),
                self.device_id,
            )
            .map_err(|cause| Error::Io {
                operation: "writing the control register",
                cause,
            })?;
        if let Some(code) = response.exception_code() {
            return Err(Error::Exception(code));
        }
        Ok(())
    }
}

/// A connected [`Cpa1110`] that is closed again when this guard goes out of scope.
pub struct Session<'a, T: Transport> {
    device: &'a mut Cpa1110<T>,
}

impl<T: Transport> Deref for Session<'_, T> {
    type Target = Cpa1110<T>;

    fn deref(&self) -> &Self::Target {
        self.device
    }
}

impl<T: Transport> DerefMut for Session<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.device
    }
}

impl<T: Transport> Drop for Session<'_, T> {
    fn drop(&mut self) {
        self.device.close();
    }
}
