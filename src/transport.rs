//! Modbus TCP transport.
//!
//! This module provides [`TcpConnector`] and the [`TcpBitClient`] session it
//! opens. Framing, transaction ids and the socket are handled by
//! `tokio-modbus`; its blocking context is used so every call here is
//! synchronous with the endpoint's response timeout.
//!
//! # Constants
//!
//! - [`MAX_READ_BITS`] - Largest bit count a single read may request (2000)
//! - [`MAX_WRITE_BITS`] - Largest coil count a single write may carry (1968)
//!
//! # Example
//!
//! ```no_run
//! use modbus_bitsync::{BitClient, Connector, Endpoint, TcpConnector};
//!
//! let endpoint = Endpoint::new("192.168.1.20", 502).with_unit_id(1);
//! let mut client = TcpConnector.connect(&endpoint)?;
//!
//! let inputs = client.read_discrete_inputs(0, 8)?;
//! client.write_coil(3, true)?;
//! # Ok::<(), modbus_bitsync::ClientError>(())
//! ```

use std::io;

use tokio_modbus::client::sync::{self, Reader as _, Writer as _};
use tokio_modbus::prelude::Slave;

use crate::client::{BitClient, Connector, Endpoint};
use crate::error::ClientError;

/// Largest bit count of a single read request.
pub const MAX_READ_BITS: usize = 2000;

/// Largest coil count of a single write request.
pub const MAX_WRITE_BITS: usize = 1968;

/// Opens Modbus TCP sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Client = TcpBitClient;

    fn connect(&self, endpoint: &Endpoint) -> Result<TcpBitClient, ClientError> {
        let socket_addr = endpoint.socket_addr()?;
        let ctx = sync::tcp::connect_slave_with_timeout(
            socket_addr,
            Slave(endpoint.unit_id),
            Some(endpoint.timeout),
        )
        .map_err(map_io)?;

        Ok(TcpBitClient {
            ctx,
            endpoint: endpoint.clone(),
        })
    }
}

/// A connected Modbus TCP session.
pub struct TcpBitClient {
    ctx: sync::Context,
    endpoint: Endpoint,
}

impl TcpBitClient {
    /// Returns the endpoint this session is connected to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl BitClient for TcpBitClient {
    fn read_discrete_inputs(&mut self, start: u16, count: u16) -> Result<Vec<bool>, ClientError> {
        check_range(start, usize::from(count), MAX_READ_BITS)?;
        let bits = flatten(self.ctx.read_discrete_inputs(start, count))?;
        fit(bits, count)
    }

    fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, ClientError> {
        check_range(start, usize::from(count), MAX_READ_BITS)?;
        let bits = flatten(self.ctx.read_coils(start, count))?;
        fit(bits, count)
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ClientError> {
        flatten(self.ctx.write_single_coil(address, value))
    }

    fn write_coils(&mut self, start: u16, values: &[bool]) -> Result<(), ClientError> {
        check_range(start, values.len(), MAX_WRITE_BITS)?;
        flatten(self.ctx.write_multiple_coils(start, values))
    }
}

impl std::fmt::Debug for TcpBitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpBitClient")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Validates a request before it reaches the wire.
fn check_range(start: u16, count: usize, limit: usize) -> Result<(), ClientError> {
    if count == 0 {
        return Err(ClientError::invalid_range(start, count, "count must be at least 1"));
    }
    if count > limit {
        return Err(ClientError::invalid_range(
            start,
            count,
            format!("at most {limit} bits per request"),
        ));
    }
    if usize::from(start) + count - 1 > usize::from(u16::MAX) {
        return Err(ClientError::invalid_range(start, count, "range exceeds address space"));
    }
    Ok(())
}

/// Bit responses arrive padded to whole bytes.
fn fit(mut bits: Vec<bool>, count: u16) -> Result<Vec<bool>, ClientError> {
    let count = usize::from(count);
    if bits.len() < count {
        return Err(ClientError::protocol(format!(
            "expected {count} bits, received {}",
            bits.len()
        )));
    }
    bits.truncate(count);
    Ok(bits)
}

fn flatten<T>(result: tokio_modbus::Result<T>) -> Result<T, ClientError> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(exception)) => Err(ClientError::exception(exception.to_string())),
        Err(tokio_modbus::Error::Transport(e)) => Err(map_io(e)),
        Err(other) => Err(ClientError::protocol(other.to_string())),
    }
}

fn map_io(e: io::Error) -> ClientError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ClientError::Timeout,
        _ => ClientError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        assert_eq!(MAX_READ_BITS, 2000);
        assert_eq!(MAX_WRITE_BITS, 1968);
    }

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 1, MAX_READ_BITS).is_ok());
        assert!(check_range(0, 2000, MAX_READ_BITS).is_ok());
        assert!(check_range(0, 2001, MAX_READ_BITS).is_err());
        assert!(check_range(0, 0, MAX_READ_BITS).is_err());
        assert!(check_range(u16::MAX, 1, MAX_READ_BITS).is_ok());
        assert!(check_range(u16::MAX, 2, MAX_READ_BITS).is_err());
        assert!(check_range(0, 1969, MAX_WRITE_BITS).is_err());
    }

    #[test]
    fn test_fit_truncates_padding() {
        let bits = vec![true, false, true, false, false, false, false, false];
        assert_eq!(fit(bits, 3).unwrap(), vec![true, false, true]);
    }

    #[test]
    fn test_fit_short_response() {
        let err = fit(vec![true], 4).unwrap_err();
        assert!(matches!(err, ClientError::Protocol { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_map_io_timeout() {
        let err = map_io(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(matches!(err, ClientError::Timeout));
        let err = map_io(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"));
        assert!(matches!(err, ClientError::Io(_)));
    }

    #[test]
    fn test_connect_refused() {
        // Nothing listens on port 1 of the loopback interface.
        let endpoint = Endpoint::new("127.0.0.1", 1)
            .with_timeout(std::time::Duration::from_millis(200));
        let result = TcpConnector.connect(&endpoint);
        assert!(result.is_err());
    }
}
