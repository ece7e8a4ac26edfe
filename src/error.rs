//! Error types for the synchronization engine.
//!
//! Two layers exist: [`ClientError`] is what a field protocol client reports
//! for a single request, and [`Error`] is what the engine's operations return,
//! carrying the failing request's context (endpoint, area, address).

use std::io;
use thiserror::Error;

use crate::memory::BitArea;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by a field protocol client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The device did not answer within the response timeout.
    #[error("Communication timeout")]
    Timeout,

    /// I/O error on the underlying connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The device answered with a Modbus exception.
    #[error("Device exception: {code}")]
    Exception {
        /// Exception description as reported by the protocol stack.
        code: String,
    },

    /// Malformed or unexpected response.
    #[error("Protocol error: {reason}")]
    Protocol {
        /// Description of the protocol violation.
        reason: String,
    },

    /// The host/port pair could not be turned into a socket address.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        /// The endpoint as configured.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A request covers a range the protocol cannot express.
    #[error("Invalid range at {start} (count {count}): {reason}")]
    InvalidRange {
        /// First address of the request.
        start: u16,
        /// Number of bits requested.
        count: usize,
        /// Why it was rejected.
        reason: String,
    },
}

impl ClientError {
    /// Creates a new `Exception` error.
    pub fn exception(code: impl Into<String>) -> Self {
        Self::Exception { code: code.into() }
    }

    /// Creates a new `Protocol` error.
    pub fn protocol(reason: impl Into<String>) -> Self {
        Self::Protocol {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidEndpoint` error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidRange` error.
    pub fn invalid_range(start: u16, count: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            start,
            count,
            reason: reason.into(),
        }
    }

    /// Returns whether the connection can no longer be trusted after this error.
    ///
    /// Timeouts and transport failures leave request/response pairing in an
    /// unknown state, so the session has to be rebuilt. A device exception is a
    /// well-formed answer and keeps the session usable.
    pub fn is_fatal(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::Io(_) | ClientError::Protocol { .. } => true,
            ClientError::Exception { .. }
            | ClientError::InvalidEndpoint { .. }
            | ClientError::InvalidRange { .. } => false,
        }
    }
}

/// Errors returned by engine operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The session could not be established.
    #[error("Connection to {endpoint} failed: {source}")]
    Connect {
        /// `host:port` of the device.
        endpoint: String,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },

    /// A bulk read failed; no mapping value was touched.
    #[error("Failed to read {count} {area}: {source}")]
    Poll {
        /// Area being read.
        area: BitArea,
        /// Number of bits requested.
        count: usize,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },

    /// A coil write failed.
    #[error("Failed to write {count} coil(s) at address {address}: {source}")]
    Write {
        /// First coil address of the request.
        address: u16,
        /// Number of coils written.
        count: usize,
        /// Underlying client failure.
        #[source]
        source: ClientError,
    },

    /// Local I/O error (export, configuration file).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
