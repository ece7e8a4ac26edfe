//! Connection lifecycle for the single field device session.
//!
//! A [`Session`] is either disconnected or holds one connected client. It
//! connects lazily on first use and then keeps the connection; liveness is not
//! re-validated, so a dropped connection surfaces at the next failing request.
//! There is no retry or backoff here: a failed connect leaves the session
//! disconnected and the caller decides when to try again.

use tracing::{error, info};

use crate::client::{BitClient, Connector, Endpoint};
use crate::error::{ClientError, Error, Result};

/// Owner of the protocol session for one engine instance.
pub struct Session<K: Connector> {
    connector: K,
    endpoint: Endpoint,
    client: Option<K::Client>,
}

impl<K: Connector> Session<K> {
    /// Creates a disconnected session.
    pub fn new(connector: K, endpoint: Endpoint) -> Self {
        Self {
            connector,
            endpoint,
            client: None,
        }
    }

    /// Returns the connected client, connecting first if needed.
    ///
    /// An existing session is returned as is. Otherwise a single connection
    /// attempt is made.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` if the attempt fails; the session stays
    /// disconnected.
    pub fn ensure_connected(&mut self) -> Result<&mut K::Client> {
        let client = match self.client.take() {
            Some(client) => client,
            None => self.connect()?,
        };
        Ok(self.client.insert(client))
    }

    fn connect(&self) -> Result<K::Client> {
        match self.connector.connect(&self.endpoint) {
            Ok(client) => {
                info!(
                    endpoint = %self.endpoint,
                    unit_id = self.endpoint.unit_id,
                    "Connected to Modbus server"
                );
                Ok(client)
            }
            Err(source) => {
                error!(endpoint = %self.endpoint, error = %source, "Connection failed");
                Err(Error::Connect {
                    endpoint: self.endpoint.to_string(),
                    source,
                })
            }
        }
    }

    /// Returns the connected client without attempting to connect.
    pub(crate) fn client_mut(&mut self) -> Option<&mut K::Client> {
        self.client.as_mut()
    }

    /// Drops the connection after a failure that leaves it unusable.
    pub(crate) fn discard_if_fatal(&mut self, err: &ClientError) {
        if err.is_fatal() && self.client.is_some() {
            self.client = None;
            info!(endpoint = %self.endpoint, "Session dropped after transport failure");
        }
    }

    /// Returns whether a connection is held.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Closes the connection, if any.
    pub fn close(&mut self) {
        if let Some(client) = self.client.take() {
            client.close();
            info!(endpoint = %self.endpoint, "Modbus connection closed");
        }
    }

    /// Returns the endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl<K: Connector> Drop for Session<K> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<K: Connector> std::fmt::Debug for Session<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.is_connected())
            .finish()
    }
}
