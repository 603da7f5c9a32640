//! Raw register I/O with the controller.
//!
//! [`Transport`] is everything the client needs from the wire. [`ModbusTransport`] implements
//! it for Modbus RTU and Modbus TCP over any [`Link`], using `rmodbus` to build and check frames.

use core::fmt;

use embedded_io::Error as _;
use rmodbus::ModbusProto;
use rmodbus::client::ModbusRequest;
use thiserror::Error;
use tracing::trace;

use crate::link::Link;

/// Raw register access to a device.
///
/// Implementations block until the device answered or the transport gave up. They do not
/// retry on behalf of the client.
pub trait Transport {
    type Error: fmt::Debug;

    /// Open the underlying connection.
    fn connect(&mut self) -> Result<(), Self::Error>;

    /// Close the underlying connection. Closing twice is harmless.
    fn close(&mut self);

    /// Read `count` input registers starting at `address`.
    ///
    /// `Ok(None)` means the device did not answer at all.
    fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        device_id: u8,
    ) -> Result<Option<RegisterResponse>, Self::Error>;

    /// Write a single holding register.
    fn write_register(
        &mut self,
        address: u16,
        value: u16,
        device_id: u8,
    ) -> Result<WriteResponse, Self::Error>;
}

/// Modbus exception code returned by a device that rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionCode(pub u8);

impl ExceptionCode {
    pub fn description(&self) -> &'static str {
        match self.0 {
            0x01 => "illegal function",
            0x02 => "illegal data address",
            0x03 => "illegal data value",
            0x04 => "server device failure",
            0x05 => "acknowledge",
            0x06 => "server device busy",
            0x08 => "memory parity error",
            0x0A => "gateway path unavailable",
            0x0B => "gateway target device failed to respond",
            _ => "unknown exception",
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#04x})", self.description(), self.0)
    }
}

/// Answer to a register read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResponse {
    registers: Vec<u16>,
    exception: Option<ExceptionCode>,
}

impl RegisterResponse {
    pub fn new(registers: Vec<u16>) -> Self {
        Self {
            registers,
            exception: None,
        }
    }

    pub fn exception(code: ExceptionCode) -> Self {
        Self {
            registers: Vec::new(),
            exception: Some(code),
        }
    }

    pub fn registers(&self) -> &[u16] {
        &self.registers
    }

    pub fn exception_code(&self) -> Option<ExceptionCode> {
        self.exception
    }

    pub fn is_error(&self) -> bool {
        self.exception.is_some()
    }
}

/// Answer to a register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteResponse {
    exception: Option<ExceptionCode>,
}

impl WriteResponse {
    pub fn ok() -> Self {
        Self { exception: None }
    }

    pub fn exception(code: ExceptionCode) -> Self {
        Self {
            exception: Some(code),
        }
    }

    pub fn exception_code(&self) -> Option<ExceptionCode> {
        self.exception
    }

    pub fn is_error(&self) -> bool {
        self.exception.is_some()
    }
}

/// Errors raised by [`ModbusTransport`].
#[derive(Error, Debug)]
pub enum TransportError<I: embedded_io::Error> {
    #[error("Link error")]
    Link(I),
    #[error("Modbus frame error: {0}")]
    Frame(rmodbus::ErrorKind),
    #[error("Response frame ended early")]
    Truncated,
    #[error("Frame does not fit the buffer")]
    BufferOverflow,
    #[error("Unexpected function code {0:#04x} in response")]
    UnexpectedFunction(u8),
}

impl<I: embedded_io::Error> From<rmodbus::ErrorKind> for TransportError<I> {
    fn from(err: rmodbus::ErrorKind) -> Self {
        TransportError::Frame(err)
    }
}

const READ_INPUTS: u8 = 0x04;
const WRITE_SINGLE_HOLDING: u8 = 0x06;
const EXCEPTION_FLAG: u8 = 0x80;
const RTU_HEADER_LEN: usize = 3;
const TCP_HEADER_LEN: usize = 7;

/// A received frame, either a normal answer or an exception.
enum Frame<const L: usize> {
    Data(heapless::Vec<u8, L>),
    Exception(ExceptionCode),
}

/// [`Transport`] speaking Modbus over a [`Link`].
///
/// `L` is the size of the frame buffers. The full CPA1110 block needs 75 bytes over TCP.
///
/// Unread input is discarded before every request. Over TCP each request gets the next
/// transaction id, and answers carrying an older id are skipped.
pub struct ModbusTransport<S: Link, const L: usize = 128> {
    link: S,
    transaction_id: u16,
}

impl<S: Link, const L: usize> ModbusTransport<S, L> {
    pub fn new(link: S) -> Self {
        Self {
            link,
            transaction_id: 0,
        }
    }

    pub fn link(&self) -> &S {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut S {
        &mut self.link
    }

    pub fn into_link(self) -> S {
        self.link
    }

    fn request(&mut self, device_id: u8) -> ModbusRequest {
        match self.link.protocol() {
            ModbusProto::TcpUdp => {
                self.transaction_id = self.transaction_id.wrapping_add(1);
                ModbusRequest::new_tcp_udp(device_id, self.transaction_id)
            }
            proto => ModbusRequest::new(device_id, proto),
        }
    }

    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError<S::Error>> {
        trace!(message = "sending frame", buffer = ?frame);
        self.link.write_all(frame).map_err(TransportError::Link)?;
        self.link.flush().map_err(TransportError::Link)
    }

    /// Fill `buf` completely. Returns `Ok(false)` if the device stayed silent.
    fn receive(&mut self, buf: &mut [u8]) -> Result<bool, TransportError<S::Error>> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.link.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => return Err(TransportError::Truncated),
                Ok(bytes_read) => filled += bytes_read,
                Err(e) if filled == 0 && e.kind() == embedded_io::ErrorKind::TimedOut => {
                    return Ok(false);
                }
                Err(e) => return Err(TransportError::Link(e)),
            }
        }
        Ok(true)
    }

    /// Read the bytes of one response frame. `Ok(None)` if nothing arrived.
    fn receive_frame(
        &mut self,
    ) -> Result<Option<heapless::Vec<u8, L>>, TransportError<S::Error>> {
        let proto = self.link.protocol();
        let header_len = match proto {
            ModbusProto::Rtu => RTU_HEADER_LEN,
            _ => TCP_HEADER_LEN,
        };
        let mut header = [0u8; TCP_HEADER_LEN];
        if !self.receive(&mut header[..header_len])? {
            return Ok(None);
        }

        let remaining = match proto {
            ModbusProto::Rtu => {
                let function = header[1];
                if function & EXCEPTION_FLAG != 0 {
                    // Exception code was the third header byte, only the CRC is left.
                    2
                } else {
                    match function {
                        READ_INPUTS => usize::from(header[2]) + 2,
                        WRITE_SINGLE_HOLDING => 5,
                        other => return Err(TransportError::UnexpectedFunction(other)),
                    }
                }
            }
            _ => {
                let length = usize::from(u16::from_be_bytes([header[4], header[5]]));
                // The MBAP length counts the unit id, which is already in the header.
                length.checked_sub(1).ok_or(TransportError::Truncated)?
            }
        };

        let mut frame: heapless::Vec<u8, L> = heapless::Vec::new();
        frame
            .extend_from_slice(&header[..header_len])
            .map_err(|_| TransportError::BufferOverflow)?;
        frame
            .resize(header_len + remaining, 0)
            .map_err(|_| TransportError::BufferOverflow)?;
        if !self.receive(&mut frame[header_len..])? {
            return Err(TransportError::Truncated);
        }
        trace!(message = "received frame", buffer = ?frame.as_slice());
        Ok(Some(frame))
    }

    /// Send `request` and wait for the answer to it. `Ok(None)` if nothing arrived.
    fn exchange(
        &mut self,
        req: &ModbusRequest,
        request: &[u8],
    ) -> Result<Option<Frame<L>>, TransportError<S::Error>> {
        self.link.discard_input().map_err(TransportError::Link)?;
        self.send(request)?;

        loop {
            let Some(frame) = self.receive_frame()? else {
                return Ok(None);
            };
            let function_at = match self.link.protocol() {
                ModbusProto::Rtu => 1,
                _ => {
                    let transaction_id = u16::from_be_bytes([frame[0], frame[1]]);
                    if transaction_id != req.tr_id {
                        trace!(message = "skipping stale frame", transaction_id);
                        continue;
                    }
                    TCP_HEADER_LEN
                }
            };

            let function = *frame.get(function_at).ok_or(TransportError::Truncated)?;
            if function & EXCEPTION_FLAG == 0 {
                return Ok(Some(Frame::Data(frame)));
            }
            let code = *frame.get(function_at + 1).ok_or(TransportError::Truncated)?;
            // rmodbus checks checksum, unit and transaction id before it reports the exception.
            return match req.parse_ok(&frame) {
                Err(kind) if kind.is_modbus_error() || kind == rmodbus::ErrorKind::UnknownError => {
                    Ok(Some(Frame::Exception(ExceptionCode(code))))
                }
                Err(kind) => Err(TransportError::Frame(kind)),
                Ok(()) => Err(TransportError::UnexpectedFunction(function)),
            };
        }
    }
}

impl<S: Link, const L: usize> Transport for ModbusTransport<S, L> {
    type Error = TransportError<S::Error>;

    fn connect(&mut self) -> Result<(), Self::Error> {
        self.link.open().map_err(TransportError::Link)
    }

    fn close(&mut self) {
        self.link.close();
    }

    fn read_input_registers(
        &mut self,
        address: u16,
        count: u16,
        device_id: u8,
    ) -> Result<Option<RegisterResponse>, Self::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = self.request(device_id);
        req.generate_get_inputs(address, count, &mut request)?;

        let frame = match self.exchange(&req, &request)? {
            None => return Ok(None),
            Some(Frame::Exception(code)) => return Ok(Some(RegisterResponse::exception(code))),
            Some(Frame::Data(frame)) => frame,
        };

        let mut registers: heapless::Vec<u16, L> = heapless::Vec::new();
        req.parse_u16(&frame, &mut registers)?;
        Ok(Some(RegisterResponse::new(registers.to_vec())))
    }

    fn write_register(
        &mut self,
        address: u16,
        value: u16,
        device_id: u8,
    ) -> Result<WriteResponse, Self::Error> {
        let mut request: heapless::Vec<u8, L> = heapless::Vec::new();
        let mut req = self.request(device_id);
        req.generate_set_holding(address, value, &mut request)?;

        match self.exchange(&req, &request)? {
            // A write always expects the echo, silence is a broken exchange.
            None => Err(TransportError::Truncated),
            Some(Frame::Exception(code)) => Ok(WriteResponse::exception(code)),
            Some(Frame::Data(frame)) => {
                req.parse_ok(&frame)?;
                Ok(WriteResponse::ok())
            }
        }
    }
}
