//! Connection settings for a CPA1110 client.

use std::net::{IpAddr, SocketAddr};

use fugit::MillisDurationU32;

use crate::link::{DeviceLink, SerialLink, TcpLink};

/// Default Modbus TCP port.
pub const DEFAULT_TCP_PORT: u16 = 502;

/// Factory default Modbus device id of the CPA1110.
pub const DEFAULT_DEVICE_ID: u8 = 16;

/// How long a link waits for the controller by default.
pub const DEFAULT_RESPONSE_TIMEOUT: MillisDurationU32 = MillisDurationU32::millis(1000);

/// How the controller is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Modbus RTU over a serial port, `resource_name` is the port path.
    Serial,
    /// Modbus TCP, `resource_name` is the IP address of the controller.
    Tcp,
}

/// Settings used to construct a [`Cpa1110`](crate::device::Cpa1110).
#[derive(Debug, Clone)]
pub struct CpaConfig {
    /// TCP host IP address or serial port path.
    pub resource_name: String,
    pub connection_type: ConnectionType,
    /// Only used with [`ConnectionType::Tcp`].
    pub tcp_port: u16,
    pub device_id: u8,
    /// Read the registers again before every accessor call.
    pub auto_refresh: bool,
    /// Connect and read the registers once when the client is constructed.
    pub auto_connect: bool,
    /// Read and write timeout of the link.
    pub response_timeout: MillisDurationU32,
}

impl CpaConfig {
    fn new(resource_name: impl Into<String>, connection_type: ConnectionType) -> Self {
        Self {
            resource_name: resource_name.into(),
            connection_type,
            tcp_port: DEFAULT_TCP_PORT,
            device_id: DEFAULT_DEVICE_ID,
            auto_refresh: true,
            auto_connect: true,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    /// Settings for a controller at `ip`, with every other option at its default.
    pub fn tcp(ip: impl Into<String>) -> Self {
        Self::new(ip, ConnectionType::Tcp)
    }

    /// Settings for a controller on the serial port at `path`.
    pub fn serial(path: impl Into<String>) -> Self {
        Self::new(path, ConnectionType::Serial)
    }

    /// Set the TCP port.
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    /// Set the Modbus device id.
    pub fn with_device_id(mut self, device_id: u8) -> Self {
        self.device_id = device_id;
        self
    }

    /// Set whether accessors read the device every time.
    pub fn with_auto_refresh(mut self, auto_refresh: bool) -> Self {
        self.auto_refresh = auto_refresh;
        self
    }

    /// Set whether construction connects and reads the device.
    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }

    /// Set the link timeout.
    pub fn with_response_timeout(mut self, timeout: MillisDurationU32) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Build the (still closed) link these settings describe.
    ///
    /// A TCP resource must be an IP address, host names are not resolved.
    pub fn link(&self) -> Result<DeviceLink, &'static str> {
        let timeout = std::time::Duration::from_millis(self.response_timeout.to_millis().into());
        match self.connection_type {
            ConnectionType::Tcp => {
                let ip: IpAddr = self
                    .resource_name
                    .parse()
                    .map_err(|_| "TCP resource name is not an IP address")?;
                let address = SocketAddr::new(ip, self.tcp_port);
                Ok(DeviceLink::Tcp(TcpLink::new(address, timeout)))
            }
            ConnectionType::Serial => {
                if self.resource_name.is_empty() {
                    return Err("serial port path is empty");
                }
                Ok(DeviceLink::Serial(SerialLink::new(
                    self.resource_name.as_str(),
                    timeout,
                )))
            }
        }
    }
}
