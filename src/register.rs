//! This module is used to define the register map of the CPA1110.
//!
//! All telemetry lives in one block of [`REGISTER_COUNT`] input registers which is read in a
//! single request starting at [`START_ADDRESS`]. Each [`Field`] names where its value lives in
//! that block and how to decode it.

use strum_macros::EnumIter;

use crate::codec::{RegisterCode, decode_float, decode_int32};
use crate::types::{Errors, OperatingState, PressureUnits, TemperatureUnits, Warnings};

/// Number of input registers read on every refresh.
pub const REGISTER_COUNT: usize = 33;

/// Protocol address of the first input register in the block.
pub const START_ADDRESS: u16 = 1;

/// One complete read of the input registers, indexed by word offset.
pub type RegisterBlock = [u16; REGISTER_COUNT];

/// Where the upper 16 bits of a field come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighWord {
    /// Another register of the block.
    Register(usize),
    /// The field is a single register, the upper word is always zero.
    Zero,
}

/// How the 32 bits of a field are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    Float,
    Int,
    OperatingState,
    Warnings,
    Errors,
    PressureUnits,
    TemperatureUnits,
}

/// Location and decoding of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub low: usize,
    pub high: HighWord,
    pub decoding: Decoding,
}

impl FieldLayout {
    const fn pair(low: usize, decoding: Decoding) -> Self {
        Self {
            low,
            high: HighWord::Register(low + 1),
            decoding,
        }
    }

    const fn single(low: usize, decoding: Decoding) -> Self {
        Self {
            low,
            high: HighWord::Zero,
            decoding,
        }
    }

    fn words(&self, block: &RegisterBlock) -> (u16, u16) {
        let high = match self.high {
            HighWord::Register(index) => block[index],
            HighWord::Zero => 0,
        };
        (block[self.low], high)
    }
}

/// Every value decoded from the input register block.
#[derive(Debug, EnumIter, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// __R__ - Compressor operating state.
    OperatingState,
    /// __R__ - Warning bit set.
    ///
    /// Shares its low word with [`Field::Errors`], but the upper word is register 2.
    Warnings,
    /// __R__ - Error bit set.
    Errors,
    /// __R__ - Coolant inlet temperature.
    CoolantInTemperature,
    /// __R__ - Coolant outlet temperature.
    CoolantOutTemperature,
    /// __R__ - Oil temperature.
    OilTemperature,
    /// __R__ - Helium temperature.
    HeliumTemperature,
    /// __R__ - Low side pressure.
    LowPressure,
    /// __R__ - Low side pressure average.
    LowPressureAverage,
    /// __R__ - High side pressure.
    HighPressure,
    /// __R__ - High side pressure average.
    HighPressureAverage,
    /// __R__ - Average pressure difference.
    DeltaPressureAverage,
    /// __R__ - Motor current in amps.
    MotorCurrent,
    /// __R__ - Hours of operation.
    HoursOfOperation,
    /// __R__ - Pressure unit setting of the panel.
    PressureUnits,
    /// __R__ - Temperature unit setting of the panel.
    TemperatureUnits,
    /// __R__ - Digital panel serial number.
    PanelSerialNumber,
    /// __R__ - Model number, major and minor packed into one value.
    ModelNumber,
    /// __R__ - Controller software revision.
    SoftwareRev,
}

impl Field {
    pub const fn layout(self) -> FieldLayout {
        use Decoding as D;
        use FieldLayout as L;
        match self {
            Field::OperatingState => L::single(0, D::OperatingState),
            Field::Warnings => FieldLayout {
                low: 3,
                high: HighWord::Register(2),
                decoding: D::Warnings,
            },
            Field::Errors => L::single(3, D::Errors),
            Field::CoolantInTemperature => L::pair(6, D::Float),
            Field::CoolantOutTemperature => L::pair(8, D::Float),
            Field::OilTemperature => L::pair(10, D::Float),
            Field::HeliumTemperature => L::pair(12, D::Float),
            Field::LowPressure => L::pair(14, D::Float),
            Field::LowPressureAverage => L::pair(16, D::Float),
            Field::HighPressure => L::pair(18, D::Float),
            Field::HighPressureAverage => L::pair(20, D::Float),
            Field::DeltaPressureAverage => L::pair(22, D::Float),
            Field::MotorCurrent => L::pair(24, D::Float),
            Field::HoursOfOperation => L::pair(26, D::Float),
            Field::PressureUnits => L::single(28, D::PressureUnits),
            Field::TemperatureUnits => L::single(29, D::TemperatureUnits),
            Field::PanelSerialNumber => L::single(30, D::Int),
            Field::ModelNumber => L::single(31, D::Int),
            Field::SoftwareRev => L::single(32, D::Int),
        }
    }

    /// The field's words as a float, whatever its declared decoding.
    pub fn float(self, block: &RegisterBlock) -> f32 {
        let (low, high) = self.layout().words(block);
        decode_float(low, high)
    }

    /// The field's words as a signed integer, whatever its declared decoding.
    pub fn int(self, block: &RegisterBlock) -> i32 {
        let (low, high) = self.layout().words(block);
        decode_int32(low, high)
    }

    /// Decode the field according to its layout.
    pub fn decode(self, block: &RegisterBlock) -> FieldValue {
        match self.layout().decoding {
            Decoding::Float => FieldValue::Float(self.float(block)),
            Decoding::Int => FieldValue::Int(self.int(block)),
            Decoding::OperatingState => {
                FieldValue::OperatingState(OperatingState::from_code(self.int(block)))
            }
            Decoding::Warnings => FieldValue::Warnings(Warnings::from_raw(self.int(block))),
            Decoding::Errors => FieldValue::Errors(Errors::from_raw(self.int(block))),
            Decoding::PressureUnits => {
                FieldValue::PressureUnits(PressureUnits::from_code(self.int(block)))
            }
            Decoding::TemperatureUnits => {
                FieldValue::TemperatureUnits(TemperatureUnits::from_code(self.int(block)))
            }
        }
    }
}

/// A decoded field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Int(i32),
    OperatingState(OperatingState),
    Warnings(Warnings),
    Errors(Errors),
    PressureUnits(PressureUnits),
    TemperatureUnits(TemperatureUnits),
}

/// Writable holding registers.
#[derive(Debug, Copy, Clone)]
#[repr(u16)]
pub enum HoldingRegister {
    /// __W__ - Compressor start/stop command.
    ///
    /// See [`ControlCommand`] for the accepted values.
    CompressorControl = 0x01,
}

impl From<HoldingRegister> for u16 {
    fn from(value: HoldingRegister) -> Self {
        value as u16
    }
}

/// Values accepted by [`HoldingRegister::CompressorControl`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u16)]
pub enum ControlCommand {
    Start = 0x0001,
    Stop = 0x00FF,
}

impl From<ControlCommand> for u16 {
    fn from(value: ControlCommand) -> Self {
        value as u16
    }
}
