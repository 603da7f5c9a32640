//! Byte streams to the controller.
//!
//! The CPA1110 is reached either through its RS-232/RS-485 port or through an Ethernet
//! Modbus TCP gateway. The serial port is fixed by the device:
//! * Baud rate: 9600
//! * Data bits: 8
//! * Stop bits: 1
//! * Parity: Even

use std::io::{Read as _, Write as _};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use rmodbus::ModbusProto;
use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};
use tracing::debug;

/// Serial baud rate mandated by the controller.
pub const BAUD_RATE: u32 = 9600;

/// A connection that can be opened and closed and carries Modbus frames.
pub trait Link: embedded_io::Read + embedded_io::Write {
    /// Establish the connection. Opening an open link replaces the connection.
    fn open(&mut self) -> Result<(), Self::Error>;

    /// Drop the connection. Reads and writes fail until the next [`Link::open`].
    fn close(&mut self);

    /// Framing used on this link.
    fn protocol(&self) -> ModbusProto;

    /// Drop received bytes that were never read, such as a late answer to an earlier request.
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// [`std::io::Error`] usable as an [`embedded_io::Error`].
#[derive(Debug)]
pub struct IoError(pub std::io::Error);

impl IoError {
    fn not_connected() -> Self {
        IoError(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            "link is closed",
        ))
    }
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl embedded_io::Error for IoError {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self.0.kind() {
            std::io::ErrorKind::NotFound => embedded_io::ErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => embedded_io::ErrorKind::PermissionDenied,
            std::io::ErrorKind::ConnectionRefused => embedded_io::ErrorKind::ConnectionRefused,
            std::io::ErrorKind::ConnectionReset => embedded_io::ErrorKind::ConnectionReset,
            std::io::ErrorKind::ConnectionAborted => embedded_io::ErrorKind::ConnectionAborted,
            std::io::ErrorKind::NotConnected => embedded_io::ErrorKind::NotConnected,
            std::io::ErrorKind::BrokenPipe => embedded_io::ErrorKind::BrokenPipe,
            std::io::ErrorKind::InvalidInput => embedded_io::ErrorKind::InvalidInput,
            std::io::ErrorKind::InvalidData => embedded_io::ErrorKind::InvalidData,
            // Sockets with a read timeout report `WouldBlock` on unix.
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                embedded_io::ErrorKind::TimedOut
            }
            std::io::ErrorKind::Interrupted => embedded_io::ErrorKind::Interrupted,
            std::io::ErrorKind::Unsupported => embedded_io::ErrorKind::Unsupported,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

impl From<serialport::Error> for IoError {
    fn from(err: serialport::Error) -> Self {
        IoError(err.into())
    }
}

/// Modbus TCP connection to a controller or gateway.
#[derive(Debug)]
pub struct TcpLink {
    address: SocketAddr,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpLink {
    pub fn new(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            timeout,
            stream: None,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    fn stream(&mut self) -> Result<&mut TcpStream, IoError> {
        self.stream.as_mut().ok_or_else(IoError::not_connected)
    }
}

impl embedded_io::ErrorType for TcpLink {
    type Error = IoError;
}

impl embedded_io::Read for TcpLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.stream()?.read(buf).map_err(IoError)
    }
}

impl embedded_io::Write for TcpLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.stream()?.write(buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream()?.flush().map_err(IoError)
    }
}

impl Link for TcpLink {
    fn open(&mut self) -> Result<(), Self::Error> {
        debug!(address = %self.address, "opening TCP link");
        let stream = TcpStream::connect_timeout(&self.address, self.timeout).map_err(IoError)?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(IoError)?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(IoError)?;
        stream.set_nodelay(true).map_err(IoError)?;
        self.stream = Some(stream);
        Ok(())
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            debug!(address = %self.address, "closing TCP link");
            // The socket is dropped either way.
            let _ = stream.shutdown(std::net::Shutdown::Both);
        }
    }

    fn protocol(&self) -> ModbusProto {
        ModbusProto::TcpUdp
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        let stream = self.stream()?;
        stream.set_nonblocking(true).map_err(IoError)?;
        let mut scratch = [0u8; 64];
        let drained = loop {
            match stream.read(&mut scratch) {
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(IoError(e)),
            }
        };
        stream.set_nonblocking(false).map_err(IoError)?;
        drained
    }
}

/// Modbus RTU connection over a serial port.
pub struct SerialLink {
    path: String,
    timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialLink {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
            port: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, IoError> {
        self.port.as_mut().ok_or_else(IoError::not_connected)
    }
}

impl core::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SerialLink")
            .field("path", &self.path)
            .field("timeout", &self.timeout)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl embedded_io::ErrorType for SerialLink {
    type Error = IoError;
}

impl embedded_io::Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.port()?.read(buf).map_err(IoError)
    }
}

impl embedded_io::Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.port()?.write(buf).map_err(IoError)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.port()?.flush().map_err(IoError)
    }
}

impl Link for SerialLink {
    fn open(&mut self) -> Result<(), Self::Error> {
        debug!(path = %self.path, "opening serial link");
        let port = serialport::new(&self.path, BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .timeout(self.timeout)
            .open()?;
        self.port = Some(port);
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!(path = %self.path, "closing serial link");
        }
    }

    fn protocol(&self) -> ModbusProto {
        ModbusProto::Rtu
    }

    fn discard_input(&mut self) -> Result<(), Self::Error> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

/// Either kind of link, picked from a [`CpaConfig`](crate::config::CpaConfig).
#[derive(Debug)]
pub enum DeviceLink {
    Tcp(TcpLink),
    Serial(SerialLink),
}

impl embedded_io::ErrorType for DeviceLink {
    type Error = IoError;
}

impl embedded_io::Read for DeviceLink {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self {
            DeviceLink::Tcp(link) => link.read(buf),
            DeviceLink::Serial(link) => link.read(buf),
        }
    }
}

impl embedded_io::Write for DeviceLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        match self {
            DeviceLink::Tcp(link) => link.write(buf),
            DeviceLink::Serial(link) => link.write(buf),
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        match self {
            DeviceLink::Tcp(link) => link.flush(),
            DeviceLink::Serial(link) => link.flush(),
        }
    }
}

impl Link for DeviceLink {
    fn open(&mut self) -> Result<(), Self::Error> {
        match self {
            DeviceLink::Tcp(link) => link.open(),
            DeviceLink::Serial(link) => link.open(),
        }
    }

    fn close(&mut self) {
        match self {
            DeviceLink::Tcp(link) => link.close(),
            DeviceLink::Serial(link) => link.close(),
        }
    }

    fn protocol(&self) -> ModbusProto {
        match self {
            DeviceLink::Tcp(link) => link.protocol(),
            DeviceLink::Serial(link) => link.protocol(),
        }
    }
    fn discard_input(&mut self) -> Result<(), Self::Error> {
        match self {
            DeviceLink::Tcp(link) => link.discard_input(),
            DeviceLink::Serial(link) => link.discard_input(),
        }
    }
}
