//! We use this mocking module in unit tests to stand in for a Modbus transport.

use crate::register::REGISTER_COUNT;
use crate::transport::{ExceptionCode, RegisterResponse, Transport, WriteResponse};

/// What the next register read returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeResponse {
    /// The current registers.
    Registers,
    /// No answer at all.
    Silent,
    /// A Modbus exception with the given code.
    Exception(u8),
    /// Only the first `n` registers.
    Short(usize),
    /// The transport itself fails.
    IoError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeError {
    Refused,
    Io,
}

/// Transport double with device registers the test can change between reads.
pub struct FakeTransport {
    registers: Vec<u16>,
    next_response: Option<FakeResponse>,
    connected: bool,
    refuse_connect: bool,
    reject_writes: bool,
    connect_calls: usize,
    close_calls: usize,
    reads: Vec<(u16, u16, u8)>,
    writes: Vec<(u16, u16, u8)>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            registers: vec![0; REGISTER_COUNT],
            next_response: None,
            connected: false,
            refuse_connect: false,
            reject_writes: false,
            connect_calls: 0,
            close_calls: 0,
            reads: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn registers_mut(&mut self) -> &mut [u16] {
        &mut self.registers
    }

    /// Override the answer to the next read only.
    pub fn respond_with(&mut self, response: FakeResponse) {
        self.next_response = Some(response);
    }

    pub fn refuse_connect(&mut self, refuse: bool) {
        self.refuse_connect = refuse;
    }

    pub fn reject_writes(&mut self, reject: bool) {
        self.reject_writes = reject;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls
    }

    pub fn read_calls(&self) -> usize {
        self.reads.len()
    }

    pub fn last_read(&self) -> Option<(u16, u16, u8)> {
        self.reads.last().copied()
    }

    pub fn writes(&self) -> &[(u16, u16, u8)] {
        &self.writes
    }
}

impl Transport for FakeTransport {
    type Error = FakeError;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.connect_calls += 1;
        if self.refuse_connect {
            return Err(FakeError::Refused);
        }
        self.connected = true;
        Ok(())
    }

    fn close(&mut self) {
        self.close_calls += 1;
        self.connected = false;
    }

    fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        device_id: u8,
    ) -> Result<Option<RegisterResponse>, Self::Error> {
        self.reads.push((address, count, device_id));
        match self.next_response.take().unwrap_or(FakeResponse::Registers) {
            FakeResponse::Registers => Ok(Some(RegisterResponse::new(self.registers.clone()))),
            FakeResponse::Silent => Ok(None),
            FakeResponse::Exception(code) => {
                Ok(Some(RegisterResponse::exception(ExceptionCode(code))))
            }
            FakeResponse::Short(n) => Ok(Some(RegisterResponse::new(self.registers[..n].to_vec()))),
            FakeResponse::IoError => Err(FakeError::Io),
        }
    }

    fn write_register(
        &mut self,
        address: u16,
        value: u16,
        device_id: u8,
    ) -> Result<WriteResponse, Self::Error> {
        self.writes.push((address, value, device_id));
        if self.reject_writes {
            return Ok(WriteResponse::exception(ExceptionCode(0x04)));
        }
        Ok(WriteResponse::ok())
    }
}
