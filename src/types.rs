//! This module contains the typed values decoded from the CPA1110 input registers.

use std::sync::OnceLock;

use bitflags::bitflags;
use strum_macros::EnumIter;

use crate::codec::{CodeTable, RegisterCode};
use crate::register::{Field, RegisterBlock};

/// Compressor operating state, input register 30001.
#[derive(Debug, EnumIter, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(i32)]
pub enum OperatingState {
    /// 0: Idling, ready to start.
    Idling = 0,
    /// 2: Starting.
    Starting = 2,
    /// 3: Running.
    Running = 3,
    /// 5: Stopping.
    Stopping = 5,
    /// 6: Error lockout.
    ErrorLockout = 6,
    /// 7: Error.
    Error = 7,
    /// 8: Helium overtemperature cool down.
    HeliumCoolDown = 8,
    /// 9: Power related error.
    PowerRelatedError = 9,
    /// 15: Recovered from error.
    RecoveredFromError = 15,
    /// Not applicable, the device reported a code this client does not know.
    Na = -1,
}

impl RegisterCode for OperatingState {
    const NA: Self = Self::Na;

    fn code(self) -> i32 {
        self as i32
    }

    fn code_table() -> &'static CodeTable<Self> {
        static TABLE: OnceLock<CodeTable<OperatingState>> = OnceLock::new();
        TABLE.get_or_init(CodeTable::build)
    }
}

/// Unit the controller panel uses for pressure readings.
#[derive(Debug, EnumIter, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(i32)]
pub enum PressureUnits {
    Psi = 0,
    Bar = 1,
    Kpa = 2,
    /// Not applicable, unknown unit code.
    Na = -1,
}

impl RegisterCode for PressureUnits {
    const NA: Self = Self::Na;

    fn code(self) -> i32 {
        self as i32
    }

    fn code_table() -> &'static CodeTable<Self> {
        static TABLE: OnceLock<CodeTable<PressureUnits>> = OnceLock::new();
        TABLE.get_or_init(CodeTable::build)
    }
}

/// Unit the controller panel uses for temperature readings.
#[derive(Debug, EnumIter, PartialEq, Eq, Clone, Copy, Hash)]
#[repr(i32)]
pub enum TemperatureUnits {
    Fahrenheit = 0,
    Celsius = 1,
    Kelvin = 2,
    /// Not applicable, unknown unit code.
    Na = -1,
}

impl RegisterCode for TemperatureUnits {
    const NA: Self = Self::Na;

    fn code(self) -> i32 {
        self as i32
    }

    fn code_table() -> &'static CodeTable<Self> {
        static TABLE: OnceLock<CodeTable<TemperatureUnits>> = OnceLock::new();
        TABLE.get_or_init(CodeTable::build)
    }
}

bitflags! {
    /// Warning conditions, input registers 30003-30004.
    ///
    /// The device may set bits not listed here, they are kept in the value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Warnings: u32 {
        const COOLANT_IN_HIGH       = 1 << 0;
        const COOLANT_IN_LOW        = 1 << 1;
        const COOLANT_OUT_HIGH      = 1 << 2;
        const COOLANT_OUT_LOW       = 1 << 3;
        const OIL_HIGH              = 1 << 4;
        const OIL_LOW               = 1 << 5;
        const HELIUM_HIGH           = 1 << 6;
        const HELIUM_LOW            = 1 << 7;
        const LOW_PRESSURE_HIGH     = 1 << 8;
        const LOW_PRESSURE_LOW      = 1 << 9;
        const HIGH_PRESSURE_HIGH    = 1 << 10;
        const HIGH_PRESSURE_LOW     = 1 << 11;
        const DELTA_PRESSURE_HIGH   = 1 << 12;
        const DELTA_PRESSURE_LOW    = 1 << 13;
        const STATIC_PRESSURE_HIGH  = 1 << 17;
        const STATIC_PRESSURE_LOW   = 1 << 18;
        const COLD_HEAD_MOTOR_STALL = 1 << 19;
    }

    /// Error (alarm) conditions that stop the compressor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Errors: u32 {
        const COOLANT_IN_HIGH      = 1 << 0;
        const COOLANT_IN_LOW       = 1 << 1;
        const COOLANT_OUT_HIGH     = 1 << 2;
        const COOLANT_OUT_LOW      = 1 << 3;
        const OIL_HIGH             = 1 << 4;
        const OIL_LOW              = 1 << 5;
        const HELIUM_HIGH          = 1 << 6;
        const HELIUM_LOW           = 1 << 7;
        const LOW_PRESSURE_HIGH    = 1 << 8;
        const LOW_PRESSURE_LOW     = 1 << 9;
        const HIGH_PRESSURE_HIGH   = 1 << 10;
        const HIGH_PRESSURE_LOW    = 1 << 11;
        const DELTA_PRESSURE_HIGH  = 1 << 12;
        const DELTA_PRESSURE_LOW   = 1 << 13;
        const MOTOR_CURRENT_LOW    = 1 << 14;
        const THREE_PHASE_ERROR    = 1 << 15;
        const POWER_SUPPLY_ERROR   = 1 << 16;
        const STATIC_PRESSURE_HIGH = 1 << 17;
        const STATIC_PRESSURE_LOW  = 1 << 18;
    }
}

impl Warnings {
    /// Use a decoded register value as the flag set, keeping unknown bits.
    pub fn from_raw(raw: i32) -> Self {
        Self::from_bits_retain(raw as u32)
    }
}

impl Errors {
    /// Use a decoded register value as the flag set, keeping unknown bits.
    pub fn from_raw(raw: i32) -> Self {
        Self::from_bits_retain(raw as u32)
    }
}

/// Every decoded value from one read of the input registers.
///
/// This is a detached copy: changing it has no effect on the device or the client.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpaSnapshot {
    pub operating_state: OperatingState,
    pub warnings: Warnings,
    pub errors: Errors,
    pub coolant_in_temperature: f32,
    pub coolant_out_temperature: f32,
    pub oil_temperature: f32,
    pub helium_temperature: f32,
    pub low_pressure: f32,
    pub low_pressure_average: f32,
    pub high_pressure: f32,
    pub high_pressure_average: f32,
    pub delta_pressure_average: f32,
    pub motor_current: f32,
    pub hours_of_operation: f32,
    pub pressure_units: PressureUnits,
    pub temperature_units: TemperatureUnits,
    pub panel_serial_number: i32,
    pub model_number: i32,
    pub software_rev: i32,
}

impl CpaSnapshot {
    /// Decode every field from the same register block.
    pub fn decode(block: &RegisterBlock) -> Self {
        Self {
            operating_state: OperatingState::from_code(Field::OperatingState.int(block)),
            warnings: Warnings::from_raw(Field::Warnings.int(block)),
            errors: Errors::from_raw(Field::Errors.int(block)),
            coolant_in_temperature: Field::CoolantInTemperature.float(block),
            coolant_out_temperature: Field::CoolantOutTemperature.float(block),
            oil_temperature: Field::OilTemperature.float(block),
            helium_temperature: Field::HeliumTemperature.float(block),
            low_pressure: Field::LowPressure.float(block),
            low_pressure_average: Field::LowPressureAverage.float(block),
            high_pressure: Field::HighPressure.float(block),
            high_pressure_average: Field::HighPressureAverage.float(block),
            delta_pressure_average: Field::DeltaPressureAverage.float(block),
            motor_current: Field::MotorCurrent.float(block),
            hours_of_operation: Field::HoursOfOperation.float(block),
            pressure_units: PressureUnits::from_code(Field::PressureUnits.int(block)),
            temperature_units: TemperatureUnits::from_code(Field::TemperatureUnits.int(block)),
            panel_serial_number: Field::PanelSerialNumber.int(block),
            model_number: Field::ModelNumber.int(block),
            software_rev: Field::SoftwareRev.int(block),
        }
    }
}
