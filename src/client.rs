//! Field protocol client seam.
//!
//! The engine never speaks the wire protocol itself. It consumes a
//! [`BitClient`], a connected session able to read and write bit ranges, and
//! obtains one from a [`Connector`] given an [`Endpoint`]. Each call produces
//! exactly one request and one response; retries are the caller's business.
//!
//! [`TcpConnector`](crate::TcpConnector) is the Modbus TCP implementation.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use crate::config::{DEFAULT_TIMEOUT, DEFAULT_UNIT_ID};
use crate::error::ClientError;

/// Where and how to reach the field device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Unit (slave) id.
    pub unit_id: u8,
    /// Response timeout applied to every request.
    pub timeout: Duration,
}

impl Endpoint {
    /// Creates an endpoint with the default unit id and timeout.
    ///
    /// # Example
    ///
    /// ```
    /// use modbus_bitsync::Endpoint;
    /// use std::time::Duration;
    ///
    /// let endpoint = Endpoint::new("192.168.1.20", 502)
    ///     .with_unit_id(3)
    ///     .with_timeout(Duration::from_millis(250));
    /// assert_eq!(endpoint.to_string(), "192.168.1.20:502");
    /// ```
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            unit_id: DEFAULT_UNIT_ID,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the unit id.
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Sets the response timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves the endpoint to its first socket address.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidEndpoint` if the host cannot be resolved.
    pub fn socket_addr(&self) -> Result<SocketAddr, ClientError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ClientError::invalid_endpoint(self.to_string(), e.to_string()))?
            .next()
            .ok_or_else(|| ClientError::invalid_endpoint(self.to_string(), "no address found"))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A connected field protocol session addressing single bits.
///
/// Reads return exactly `count` values starting at `start`.
pub trait BitClient {
    /// Reads `count` discrete inputs.
    fn read_discrete_inputs(&mut self, start: u16, count: u16) -> Result<Vec<bool>, ClientError>;

    /// Reads `count` coils.
    fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, ClientError>;

    /// Writes one coil.
    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ClientError>;

    /// Writes consecutive coils starting at `start`.
    fn write_coils(&mut self, start: u16, values: &[bool]) -> Result<(), ClientError>;

    /// Closes the session. The default drops it.
    fn close(self)
    where
        Self: Sized,
    {
    }
}

/// Creates connected [`BitClient`]s.
pub trait Connector {
    /// Session type produced by this connector.
    type Client: BitClient;

    /// Opens a session: resolves the endpoint, applies the unit id and
    /// response timeout, and performs a single connection attempt.
    fn connect(&self, endpoint: &Endpoint) -> Result<Self::Client, ClientError>;
}
