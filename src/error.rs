//! Our error types for the CPA1110 client.

use core::fmt::Debug;

use thiserror::Error;

use crate::transport::ExceptionCode;

/// Result of a client operation, `E` is the error type of the transport in use.
pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Custom error type for CPA1110 communications.
#[derive(Error, Debug)]
pub enum Error<E: Debug> {
    #[error("Device is not connected, call connect() first")]
    NotConnected,
    #[error("Failed to connect to CPA1110")]
    ConnectFailed(E),
    #[error("I/O error while {operation}")]
    Io { operation: &'static str, cause: E },
    #[error("No response received from CPA1110")]
    NoResponse,
    #[error("Modbus exception response: {0}")]
    Exception(ExceptionCode),
    #[error("Unexpected register payload from CPA1110: {0} registers")]
    UnexpectedPayload(usize),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Broad classes of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not connected, or the connection could not be established. Reconnect and retry.
    Connection,
    /// The device or link answered with something unusable.
    Protocol,
    /// The client was used incorrectly, the device was not involved.
    Usage,
}

impl<E: Debug> Error<E> {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotConnected | Error::ConnectFailed(_) => ErrorKind::Connection,
            Error::Io { .. }
            | Error::NoResponse
            | Error::Exception(_)
            | Error::UnexpectedPayload(_) => ErrorKind::Protocol,
            Error::InvalidConfig(_) => ErrorKind::Usage,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        self.kind() == ErrorKind::Connection
    }

    pub fn is_protocol_error(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }

    /// The transport error behind this one, if any.
    pub fn transport_error(&self) -> Option<&E> {
        match self {
            Error::ConnectFailed(cause) | Error::Io { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
