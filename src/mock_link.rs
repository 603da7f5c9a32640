//! We use this mocking module in unit tests to emulate a link to the controller.

use rmodbus::ModbusProto;
use thiserror::Error;

use crate::link::Link;

/// Our mock type used to emulate a serial port or TCP socket.
pub struct MockLink {
    /// Buffer to store data written to the mock link
    write_buffer: heapless::Vec<u8, 256>,
    /// Buffer containing pre-configured response data to be read
    read_buffer: heapless::Vec<u8, 256>,
    /// Current position in the read buffer
    read_position: usize,
    /// Bytes already waiting on the link, served before the read buffer until discarded
    pending_buffer: heapless::Vec<u8, 256>,
    pending_position: usize,
    discard_calls: usize,
    /// Flag to simulate write errors
    should_error_on_write: bool,
    /// Flag to simulate read errors
    should_error_on_read: bool,
    /// Flag to simulate a device that cannot be reached
    should_error_on_open: bool,
    open: bool,
    protocol: ModbusProto,
}

#[derive(Error, Debug)]
pub enum MockLinkError {
    /// Simulated timeout error, also returned once the read data is exhausted
    #[error("Mock link timed out")]
    Timeout,
    /// Simulated buffer overflow
    #[error("Mock link buffer overflow")]
    BufferOverflow,
    /// Generic simulated error for testing
    #[error("Simulated mock link error")]
    SimulatedError,
    /// Simulated connection refusal
    #[error("Mock link refused the connection")]
    Refused,
}

impl embedded_io::Error for MockLinkError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            MockLinkError::Timeout => embedded_io::ErrorKind::TimedOut,
            MockLinkError::BufferOverflow => embedded_io::ErrorKind::OutOfMemory,
            MockLinkError::SimulatedError => embedded_io::ErrorKind::Other,
            MockLinkError::Refused => embedded_io::ErrorKind::ConnectionRefused,
        }
    }
}

impl embedded_io::ErrorType for MockLink {
    type Error = MockLinkError;
}

impl embedded_io::Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_write {
            return Err(MockLinkError::SimulatedError);
        }

        self.write_buffer
            .extend_from_slice(buf)
            .map_err(|_| MockLinkError::BufferOverflow)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_write {
            return Err(MockLinkError::SimulatedError);
        }
        Ok(())
    }
}

impl embedded_io::Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.should_error_on_read {
            return Err(MockLinkError::SimulatedError);
        }

        if self.pending_position < self.pending_buffer.len() {
            let available_bytes = self.pending_buffer.len() - self.pending_position;
            let bytes_to_read = core::cmp::min(buf.len(), available_bytes);
            buf[..bytes_to_read].copy_from_slice(
                &self.pending_buffer[self.pending_position..self.pending_position + bytes_to_read],
            );
            self.pending_position += bytes_to_read;
            return Ok(bytes_to_read);
        }

        if self.read_position >= self.read_buffer.len() {
            return Err(MockLinkError::Timeout);
        }

        let available_bytes = self.read_buffer.len() - self.read_position;
        let bytes_to_read = core::cmp::min(buf.len(), available_bytes);
        buf[..bytes_to_read].copy_from_slice(
            &self.read_buffer[self.read_position..self.read_position + bytes_to_read],
        );

        self.read_position += bytes_to_read;
        Ok(bytes_to_read)
    }
}

impl Link for MockLink {
    fn open(&mut self) -> Result<(), Self::Error> {
        if self.should_error_on_open {
            return Err(MockLinkError::Refused);
        }
        self.open = true;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn protocol(&self) -> ModbusProto {
        self.protocol
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.discard_calls += 1;
        self.pending_buffer.clear();
        self.pending_position = 0;
        Ok(())
    }
}

impl MockLink {
    fn new(protocol: ModbusProto) -> Self {
        Self {
            write_buffer: heapless::Vec::new(),
            read_buffer: heapless::Vec::new(),
            read_position: 0,
            pending_buffer: heapless::Vec::new(),
            pending_position: 0,
            discard_calls: 0,
            should_error_on_write: false,
            should_error_on_read: false,
            should_error_on_open: false,
            open: false,
            protocol,
        }
    }

    /// Create a MockLink speaking Modbus RTU with empty buffers
    pub fn rtu() -> Self {
        Self::new(ModbusProto::Rtu)
    }

    /// Create a MockLink speaking Modbus TCP with empty buffers
    pub fn tcp() -> Self {
        Self::new(ModbusProto::TcpUdp)
    }

    /// Set the data that will be returned when read() is called
    pub fn set_read_data(&mut self, data: &[u8]) -> Result<(), MockLinkError> {
        self.read_buffer.clear();
        self.read_position = 0;
        self.read_buffer
            .extend_from_slice(data)
            .map_err(|_| MockLinkError::BufferOverflow)
    }

    /// Set bytes that are already waiting on the link, as if left over from an earlier exchange
    pub fn set_pending_data(&mut self, data: &[u8]) -> Result<(), MockLinkError> {
        self.pending_buffer.clear();
        self.pending_position = 0;
        self.pending_buffer
            .extend_from_slice(data)
            .map_err(|_| MockLinkError::BufferOverflow)
    }

    /// Number of times the pending input was discarded
    pub fn discard_calls(&self) -> usize {
        self.discard_calls
    }

    /// Get a reference to the data that was written to this mock link
    pub fn written_data(&self) -> &[u8] {
        &self.write_buffer
    }

    /// Configure whether write operations should fail with an error
    pub fn set_write_error(&mut self, should_error: bool) {
        self.should_error_on_write = should_error;
    }

    /// Configure whether read operations should fail with an error
    pub fn set_read_error(&mut self, should_error: bool) {
        self.should_error_on_read = should_error;
    }

    /// Configure whether open() should fail
    pub fn set_open_error(&mut self, should_error: bool) {
        self.should_error_on_open = should_error;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// Modbus RTU CRC, appended low byte first.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ 0xA001;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Error, Read, Write};

    #[test]
    fn test_write_data() {
        let mut mock = MockLink::rtu();
        let test_data = b"Hello, World!";

        let result = mock.write(test_data);
        assert_eq!(result.unwrap(), test_data.len());
        assert_eq!(mock.written_data(), test_data);
    }

    #[test]
    fn test_write_buffer_overflow() {
        let mut mock = MockLink::rtu();
        let large_data = vec![0u8; 300]; // Larger than 256 byte capacity

        let result = mock.write(&large_data);
        assert!(matches!(result.unwrap_err(), MockLinkError::BufferOverflow));
    }

    #[test]
    fn test_read_partial_data() {
        let mut mock = MockLink::rtu();
        mock.set_read_data(b"Long response data").unwrap();

        let mut buffer = [0u8; 5];
        let result = mock.read(&mut buffer);

        assert_eq!(result.unwrap(), 5);
        assert_eq!(&buffer, b"Long ");
    }

    #[test]
    fn test_read_timeout_after_data_exhausted() {
        let mut mock = MockLink::rtu();
        mock.set_read_data(b"Hi").unwrap();

        let mut buffer = [0u8; 10];
        assert_eq!(mock.read(&mut buffer).unwrap(), 2);

        let result = mock.read(&mut buffer);
        assert!(matches!(result.unwrap_err(), MockLinkError::Timeout));
    }

    #[test]
    fn test_error_flags() {
        let mut mock = MockLink::tcp();
        mock.set_read_data(b"data").unwrap();
        mock.set_read_error(true);
        let mut buffer = [0u8; 10];
        assert!(mock.read(&mut buffer).is_err());

        mock.set_open_error(true);
        assert!(matches!(mock.open(), Err(MockLinkError::Refused)));
        assert!(!mock.is_open());

        mock.set_open_error(false);
        mock.open().unwrap();
        assert!(mock.is_open());
        mock.close();
        assert!(!mock.is_open());
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(MockLinkError::Timeout.kind(), embedded_io::ErrorKind::TimedOut));
        assert!(matches!(MockLinkError::Refused.kind(), embedded_io::ErrorKind::ConnectionRefused));
        assert!(matches!(MockLinkError::SimulatedError.kind(), embedded_io::ErrorKind::Other));
    }

    #[test]
    fn test_pending_data_until_discarded() {
        let mut mock = MockLink::rtu();
        mock.set_pending_data(b"old").unwrap();
        mock.set_read_data(b"new").unwrap();

        let mut buffer = [0u8; 3];
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer, b"old");

        mock.set_pending_data(b"old").unwrap();
        mock.discard_input().unwrap();
        assert_eq!(mock.read(&mut buffer).unwrap(), 3);
        assert_eq!(&buffer, b"new");
        assert_eq!(mock.discard_calls(), 1);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(MockLinkError::Timeout.to_string(), "Mock link timed out");
    }

    #[test]
    fn test_crc16() {
        // Read holding register 0x20, count 1, unit 1.
        let crc = crc16(&[0x01, 0x03, 0x00, 0x20, 0x00, 0x01]);
        assert_eq!(crc.to_le_bytes(), [0x85, 0xC0]);
    }
}
