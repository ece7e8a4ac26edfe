//! Device configuration and its INI-style source.
//!
//! A configuration source has three bracketed sections:
//!
//! ```text
//! [ModbusConfig]
//! server_ip=192.168.1.20
//! port=502
//! slave_id=1
//!
//! [InputMappings]
//! out_RT01_Accept=5
//!
//! [OutputMappings]
//! in_RT01_Request=3
//! ```
//!
//! Mapping keys become entry names and values become bit addresses. Values are
//! read the way C's `atoi` reads them: a non-numeric value is address 0, not an
//! error. A missing source is not an error either: [`DeviceConfig::load`]
//! returns defaults and tries to write a default file for later editing.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::client::Endpoint;
use crate::mapping::{Direction, MappingTable};
use crate::write::WriteStrategy;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "config.ini";

/// Default device host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default Modbus TCP port.
pub const DEFAULT_PORT: u16 = 502;

/// Default unit (slave) id.
pub const DEFAULT_UNIT_ID: u8 = 1;

/// Default response timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

/// Minimum time between two device reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const CONNECTION_SECTION: &str = "ModbusConfig";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Connection,
    Mappings(Direction),
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        let name = line.trim().trim_start_matches('[').split(']').next()?.trim();
        if name == CONNECTION_SECTION {
            return Some(Section::Connection);
        }
        [Direction::Input, Direction::Output]
            .into_iter()
            .find(|direction| direction.section() == name)
            .map(Section::Mappings)
    }
}

/// Connection parameters and mapping tables for one field device.
///
/// # Example
///
/// ```
/// use modbus_bitsync::DeviceConfig;
///
/// let config = DeviceConfig::parse(
///     "[ModbusConfig]\nserver_ip=10.0.0.7\n[InputMappings]\nA=5\n[OutputMappings]\nB=3\n",
/// );
/// assert_eq!(config.host, "10.0.0.7");
/// assert_eq!(config.port, 502);
/// assert_eq!(config.inputs.max_address(), 5);
/// assert_eq!(config.outputs.get("B").map(|e| e.address), Some(3));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Device host name or IP address.
    pub host: String,
    /// Device TCP port.
    pub port: u16,
    /// Unit (slave) id addressed on the device.
    pub unit_id: u8,
    /// Response timeout for every request.
    pub timeout: Duration,
    /// Minimum time between two device reads.
    pub poll_interval: Duration,
    /// Write strategy used by [`SyncEngine::synchronize`](crate::SyncEngine::synchronize).
    pub write_strategy: WriteStrategy,
    /// Device → context mappings (discrete inputs).
    pub inputs: MappingTable,
    /// Context → device mappings (coils).
    pub outputs: MappingTable,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            unit_id: DEFAULT_UNIT_ID,
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            write_strategy: WriteStrategy::default(),
            inputs: MappingTable::new(Direction::Input),
            outputs: MappingTable::new(Direction::Output),
        }
    }
}

impl DeviceConfig {
    /// Loads a configuration file.
    ///
    /// Never fails: a missing file yields defaults and a default file is
    /// created in its place (failure to create it is only logged); any other
    /// read failure yields defaults without touching the file.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(bytes) => {
                let config = Self::parse(&String::from_utf8_lossy(&bytes));
                info!(
                    path = %path.display(),
                    inputs = config.inputs.len(),
                    outputs = config.outputs.len(),
                    "Config loaded successfully"
                );
                config
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                let config = Self::default();
                match write_default_source(path) {
                    Ok(()) => info!(path = %path.display(), "Default config file created"),
                    Err(err) => error!(
                        path = %path.display(),
                        error = %err,
                        "Unable to create default config file"
                    ),
                }
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Parses configuration text.
    ///
    /// Blank lines and lines starting with `;` are skipped. An unrecognized
    /// section header does not switch sections: its lines are read as part of
    /// the previous section. Unknown connection keys and mappings beyond
    /// [`MAX_MAPPINGS`](crate::MAX_MAPPINGS) per direction are ignored.
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();
        let mut section = Section::Connection;

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            let trimmed = line.trim_start();

            if trimmed.starts_with('[') {
                match Section::from_header(trimmed) {
                    Some(next) => section = next,
                    None => warn!(header = trimmed, "Unknown config section, keeping previous section"),
                }
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }

            let Some((key, value)) = split_pair(line) else {
                debug!(line, "Skipping malformed config line");
                continue;
            };

            match section {
                Section::Connection => config.apply_connection_key(key, value),
                Section::Mappings(direction) => config.add_mapping(direction, key, value),
            }
        }

        config
    }

    fn apply_connection_key(&mut self, key: &str, value: &str) {
        match key {
            "server_ip" => self.host = value.to_string(),
            "port" => self.port = parse_or(key, value, DEFAULT_PORT),
            "slave_id" => self.unit_id = parse_or(key, value, DEFAULT_UNIT_ID),
            "timeout_ms" => {
                self.timeout = Duration::from_millis(parse_or(key, value, 500));
            }
            "poll_interval_ms" => {
                self.poll_interval = Duration::from_millis(parse_or(key, value, 1000));
            }
            "write_strategy" => match value.parse() {
                Ok(strategy) => self.write_strategy = strategy,
                Err(_) => warn!(value, "Unknown write_strategy, keeping {}", self.write_strategy),
            },
            _ => {}
        }
    }

    fn add_mapping(&mut self, direction: Direction, name: &str, value: &str) {
        let address = parse_address(name, value);
        let table = self.table_mut(direction);
        if table.push(name, address) {
            debug!(name, address, "Added {} mapping", direction.to_string().to_lowercase());
        } else {
            warn!(name, address, "{} mapping table full, entry dropped", direction);
        }
    }

    fn table_mut(&mut self, direction: Direction) -> &mut MappingTable {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }

    /// Returns the table for a direction.
    pub fn table(&self, direction: Direction) -> &MappingTable {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    /// Returns the connection endpoint described by this configuration.
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
            .with_unit_id(self.unit_id)
            .with_timeout(self.timeout)
    }

    /// Sets the device host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the device port (default is 502).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the unit id (default is 1).
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Sets the response timeout (default is 500 ms).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the minimum time between device reads (default is 1 s).
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the write strategy.
    pub fn with_write_strategy(mut self, strategy: WriteStrategy) -> Self {
        self.write_strategy = strategy;
        self
    }

    /// Adds a mapping; ignored once the table is full.
    pub fn with_mapping(mut self, direction: Direction, name: &str, address: u16) -> Self {
        self.table_mut(direction).push(name, address);
        self
    }
}

/// Text written when a configuration file is missing.
pub fn default_source() -> String {
    format!(
        "[{CONNECTION_SECTION}]\nserver_ip={DEFAULT_HOST}\nport={DEFAULT_PORT}\nslave_id={DEFAULT_UNIT_ID}\n\n"
    )
}

fn write_default_source(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(default_source().as_bytes())?;
    file.flush()
}

/// Splits `key=value`, trimming both sides. Either side empty is malformed.
fn split_pair(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let (key, value) = (key.trim(), value.trim());
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

fn parse_or<T: std::str::FromStr>(key: &str, value: &str, default: T) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(key, value, "Invalid number in config, using default");
            default
        }
    }
}

/// Reads a leading, optionally signed, decimal integer; anything else is 0.
fn atoi(value: &str) -> i64 {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let magnitude = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, b| {
            acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
        });
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

fn parse_address(name: &str, value: &str) -> u16 {
    let raw = atoi(value);
    match u16::try_from(raw) {
        Ok(address) => address,
        Err(_) => {
            warn!(name, value, "Address out of range, using 0");
            0
        }
    }
}
