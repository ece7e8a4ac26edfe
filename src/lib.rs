//! # Modbus Bit Synchronization
//!
//! Mapping-driven synchronization between an in-memory control context and a
//! field device exposing discrete inputs and coils over Modbus TCP.
//!
//! The control logic owns a plain struct of boolean fields. A configuration
//! file binds each field name to a bit address. The engine then:
//!
//! - **polls** both bit ranges at most once per poll interval and copies every
//!   mapped bit into its field,
//! - **writes** output fields the logic changed back to the device's coils,
//!   either one coil per change or the whole range in one request.
//!
//! ## Features
//!
//! - **No global state**: every [`SyncEngine`] owns its configuration,
//!   session and cache
//! - **Typed field binding**: names resolve to [`FieldId`]s once, at load
//! - **All-or-nothing polls**: a failed read never leaves half-updated values
//! - **Reconnects lazily**: transport failures drop the session and the next
//!   cycle reconnects
//! - **No panics**: all errors returned as [`Result<T, Error>`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use modbus_bitsync::{control_context, SyncEngine, TcpConnector};
//!
//! #[derive(Default)]
//! struct Crossing {
//!     barrier_down: bool,
//!     train_near: bool,
//! }
//!
//! control_context!(Crossing { barrier_down, train_near });
//!
//! fn main() -> modbus_bitsync::Result<()> {
//!     let mut engine: SyncEngine<Crossing, _> = SyncEngine::open("config.ini", TcpConnector);
//!     let mut crossing = Crossing::default();
//!
//!     engine.poll(&mut crossing)?;
//!     crossing.barrier_down = crossing.train_near;
//!     engine.sync_diff(&mut crossing)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File
//!
//! ```ini
//! [ModbusConfig]
//! server_ip=192.168.1.10
//! port=502
//! slave_id=1
//! ; optional
//! timeout_ms=500
//! poll_interval_ms=1000
//! write_strategy=differential
//!
//! [InputMappings]
//! train_near=5
//!
//! [OutputMappings]
//! barrier_down=3
//! ```
//!
//! Names without a matching context field are kept in the tables but never
//! touch the context. See [`DeviceConfig`] for the parsing rules.
//!
//! ## Configuration in Code
//!
//! ```
//! use modbus_bitsync::{DeviceConfig, Direction, WriteStrategy};
//! use std::time::Duration;
//!
//! let config = DeviceConfig::default()
//!     .with_host("10.0.0.7")
//!     .with_port(1502)                             // default: 502
//!     .with_unit_id(3)                             // default: 1
//!     .with_poll_interval(Duration::from_millis(250))
//!     .with_write_strategy(WriteStrategy::Bulk)
//!     .with_mapping(Direction::Input, "train_near", 5)
//!     .with_mapping(Direction::Output, "barrier_down", 3);
//!
//! assert_eq!(config.outputs.max_address(), 3);
//! assert_eq!(config.endpoint().to_string(), "10.0.0.7:1502");
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use modbus_bitsync::{control_context, ClientError, Error, SyncEngine, TcpConnector};
//!
//! #[derive(Default)]
//! struct Crossing { barrier_down: bool }
//! control_context!(Crossing { barrier_down });
//!
//! let mut engine: SyncEngine<Crossing, _> = SyncEngine::open("config.ini", TcpConnector);
//! let mut crossing = Crossing::default();
//!
//! match engine.poll(&mut crossing) {
//!     Ok(()) => {}
//!     Err(Error::Connect { endpoint, .. }) => println!("{} unreachable", endpoint),
//!     Err(Error::Poll { area, source: ClientError::Timeout, .. }) => {
//!         println!("timed out reading {}", area);
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! Every load, bind, connect, read, write and value transition is reported
//! through `tracing`. [`logging::init`] installs a subscriber writing to
//! stderr and an append-only log file.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod client;
mod config;
mod context;
mod engine;
mod error;
pub mod export;
pub mod logging;
mod mapping;
mod memory;
mod poll;
mod registry;
mod session;
mod transport;
pub mod utils;
mod write;

#[cfg(test)]
mod mock;

// Public re-exports
pub use client::{BitClient, Connector, Endpoint};
pub use config::{
    default_source, DeviceConfig, CONFIG_FILE, DEFAULT_HOST, DEFAULT_POLL_INTERVAL, DEFAULT_PORT,
    DEFAULT_TIMEOUT, DEFAULT_UNIT_ID,
};
pub use context::{BoolField, ControlContext, FieldId};
pub use engine::SyncEngine;
pub use error::{ClientError, Error, Result};
pub use mapping::{Direction, MappingEntry, MappingTable, MAX_MAPPINGS};
pub use memory::BitArea;
pub use poll::PollCache;
pub use registry::Registry;
pub use session::Session;
pub use transport::{TcpBitClient, TcpConnector, MAX_READ_BITS, MAX_WRITE_BITS};
pub use write::WriteStrategy;
