//! The synchronization engine instance.
//!
//! [`SyncEngine`] owns everything one field device needs: the loaded
//! configuration, the bound mapping tables, the protocol session and the poll
//! cache. Several engines can coexist; nothing is global.
//!
//! The engine is driven by a single caller on its own cadence:
//!
//! ```no_run
//! use modbus_bitsync::{control_context, SyncEngine, TcpConnector};
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Panel {
//!     out_RT01_Accept: bool,
//!     in_RT01_Request: bool,
//! }
//!
//! control_context!(Panel { out_RT01_Accept, in_RT01_Request });
//!
//! let mut engine: SyncEngine<Panel, _> = SyncEngine::open("config.ini", TcpConnector);
//! let mut panel = Panel::default();
//!
//! loop {
//!     // A failed cycle is logged and retried on the next tick.
//!     let _ = engine.synchronize(&mut panel);
//!     std::thread::sleep(Duration::from_millis(50));
//! }
//! ```
//!
//! # Thread Safety
//!
//! Operations take `&mut self` and the context by reference, so a poll and a
//! write can never interleave. Callers sharing an engine across threads must
//! lock around the whole `synchronize` call.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::info;

use crate::client::Connector;
use crate::config::DeviceConfig;
use crate::context::ControlContext;
use crate::error::Result;
use crate::export;
use crate::mapping::MappingTable;
use crate::poll::{self, PollCache};
use crate::registry::Registry;
use crate::session::Session;
use crate::write::{self, WriteStrategy};

/// Bit synchronization between a context of type `C` and one field device.
pub struct SyncEngine<C, K: Connector> {
    config: DeviceConfig,
    registry: Registry<C>,
    session: Session<K>,
    cache: PollCache,
}

impl<C: ControlContext, K: Connector> SyncEngine<C, K> {
    /// Creates an engine and binds its mappings. No connection is made yet.
    pub fn new(config: DeviceConfig, connector: K) -> Self {
        let registry = Registry::new(config.inputs.clone(), config.outputs.clone());
        let session = Session::new(connector, config.endpoint());
        let cache = PollCache::new(config.poll_interval);
        Self {
            config,
            registry,
            session,
            cache,
        }
    }

    /// Loads `path` (falling back to defaults) and creates an engine.
    pub fn open(path: impl AsRef<Path>, connector: K) -> Self {
        Self::new(DeviceConfig::load(path), connector)
    }

    /// Connects if no session is held.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` on failure; call again to retry.
    pub fn ensure_connected(&mut self) -> Result<()> {
        self.session.ensure_connected().map(|_| ())
    }

    /// Reads both bit ranges into the mappings and the context.
    ///
    /// Returns immediately if the last successful poll is younger than the
    /// poll interval.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connect` or `Error::Poll`; nothing is updated then.
    pub fn poll(&mut self, ctx: &mut C) -> Result<()> {
        poll::poll(&mut self.registry, &mut self.session, &mut self.cache, ctx)
    }

    /// Polls, then writes every changed output field with its own request.
    ///
    /// Returns `Ok(true)` if at least one coil was written.
    pub fn sync_diff(&mut self, ctx: &mut C) -> Result<bool> {
        self.poll(ctx)?;
        write::write_changed(&mut self.registry, &mut self.session, ctx)
    }

    /// Polls, then writes the whole output range if any output field changed.
    ///
    /// Returns `Ok(true)` if the range was written.
    pub fn sync_bulk(&mut self, ctx: &mut C) -> Result<bool> {
        self.poll(ctx)?;
        write::write_all(&mut self.registry, &mut self.session, ctx)
    }

    /// Runs one cycle with the configured [`WriteStrategy`].
    pub fn synchronize(&mut self, ctx: &mut C) -> Result<bool> {
        match self.config.write_strategy {
            WriteStrategy::Differential => self.sync_diff(ctx),
            WriteStrategy::Bulk => self.sync_bulk(ctx),
        }
    }

    /// Re-resolves field bindings.
    pub fn rebind(&mut self) {
        self.registry.bind();
    }

    /// Writes the mapping tables as CSV to `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be written.
    pub fn export_mappings(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        export::write_csv(&self.registry, &mut writer)?;
        Ok(())
    }

    /// Closes the session. The next operation reconnects.
    pub fn close(&mut self) {
        self.session.close();
        self.cache.invalidate();
        info!("Engine session released");
    }

    /// The configuration the engine was created from.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// The strategy used by [`synchronize`](Self::synchronize).
    pub fn write_strategy(&self) -> WriteStrategy {
        self.config.write_strategy
    }

    /// Live device → context mappings.
    pub fn inputs(&self) -> &MappingTable {
        self.registry.inputs()
    }

    /// Live context → device mappings.
    pub fn outputs(&self) -> &MappingTable {
        self.registry.outputs()
    }

    /// The bound registry.
    pub fn registry(&self) -> &Registry<C> {
        &self.registry
    }

    /// The protocol session.
    pub fn session(&self) -> &Session<K> {
        &self.session
    }

    /// Returns whether a connection is held.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }
}

impl<C, K: Connector> std::fmt::Debug for SyncEngine<C, K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("session", &self.session)
            .field("registry", &self.registry)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::memory::BitArea;
    use crate::mock::{Fault, MockConnector, Request, TestContext};
    use std::time::Duration;

    const SCENARIO: &str = "[InputMappings]\nA=5\n[OutputMappings]\nB=3\n";

    type TestEngine = SyncEngine<TestContext, MockConnector>;

    fn engine(text: &str, interval: Duration) -> (TestEngine, MockConnector) {
        let connector = MockConnector::new();
        let config = DeviceConfig::parse(text).with_poll_interval(interval);
        (SyncEngine::new(config, connector.clone()), connector)
    }

    fn scenario_device(connector: &MockConnector) {
        connector.set_discrete_inputs(&[false, false, false, false, false, true]);
        connector.set_coils(&[false, false, false, true]);
    }

    #[test]
    fn test_new_does_not_connect() {
        let (engine, connector) = engine(SCENARIO, Duration::ZERO);
        assert!(!engine.is_connected());
        assert_eq!(connector.connect_count(), 0);
        assert_eq!(engine.inputs().max_address(), 5);
        assert_eq!(engine.outputs().max_address(), 3);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let (mut engine, connector) = engine(SCENARIO, Duration::from_secs(3600));
        scenario_device(&connector);
        let mut ctx = TestContext::default();

        engine.poll(&mut ctx).unwrap();
        assert!(engine.inputs().get("A").unwrap().value);
        assert!(engine.outputs().get("B").unwrap().value);
        assert!(ctx.a);
        assert!(ctx.b);

        // B read as ON while its previous value was OFF: one write to address 3.
        connector.clear_requests();
        assert!(engine.sync_diff(&mut ctx).unwrap());
        assert_eq!(
            connector.requests(),
            vec![Request::WriteCoil { address: 3, value: true }]
        );

        // The control logic drops B; the next cycle pushes exactly that bit.
        connector.clear_requests();
        ctx.b = false;
        assert!(engine.sync_diff(&mut ctx).unwrap());
        assert_eq!(
            connector.requests(),
            vec![Request::WriteCoil { address: 3, value: false }]
        );
        assert!(!engine.outputs().get("B").unwrap().previous_value);

        connector.clear_requests();
        assert!(!engine.sync_diff(&mut ctx).unwrap());
        assert!(connector.requests().is_empty());
    }

    #[test]
    fn test_repeated_poll_within_interval() {
        let (mut engine, connector) = engine(SCENARIO, Duration::from_secs(3600));
        scenario_device(&connector);
        let mut ctx = TestContext::default();

        engine.poll(&mut ctx).unwrap();
        let inputs = engine.inputs().clone();
        let outputs = engine.outputs().clone();

        connector.set_discrete_inputs(&[false; 6]);
        for _ in 0..5 {
            engine.poll(&mut ctx).unwrap();
        }
        assert_eq!(engine.inputs(), &inputs);
        assert_eq!(engine.outputs(), &outputs);
        assert_eq!(connector.reads().len(), 2);
    }

    #[test]
    fn test_sync_bulk_single_change() {
        let (mut engine, connector) = engine(
            "[OutputMappings]\nB=3\nlamp=0\n",
            Duration::from_secs(3600),
        );
        let mut ctx = TestContext::default();
        engine.poll(&mut ctx).unwrap();
        connector.clear_requests();

        ctx.lamp = true;
        assert!(engine.sync_bulk(&mut ctx).unwrap());
        assert_eq!(
            connector.writes(),
            vec![Request::WriteCoils {
                start: 0,
                values: vec![true, false, false, false],
            }]
        );
        assert!(engine.outputs().get("lamp").unwrap().previous_value);
    }

    #[test]
    fn test_sync_bulk_failure_is_retry_safe() {
        let (mut engine, connector) =
            engine("[OutputMappings]\nB=3\nlamp=0\n", Duration::from_secs(3600));
        let mut ctx = TestContext::default();
        engine.poll(&mut ctx).unwrap();

        connector.fail_bulk_writes(Some(Fault::Exception));
        ctx.b = true;
        assert!(matches!(engine.sync_bulk(&mut ctx), Err(Error::Write { .. })));
        assert!(engine.outputs().iter().all(|e| !e.previous_value));

        connector.fail_bulk_writes(None);
        assert!(engine.sync_bulk(&mut ctx).unwrap());
        assert!(engine.outputs().get("B").unwrap().previous_value);
    }

    #[test]
    fn test_synchronize_uses_configured_strategy() {
        let connector = MockConnector::new();
        let config = DeviceConfig::parse("[OutputMappings]\nB=3\n")
            .with_poll_interval(Duration::from_secs(3600))
            .with_write_strategy(WriteStrategy::Bulk);
        let mut engine: SyncEngine<TestContext, _> = SyncEngine::new(config, connector.clone());
        let mut ctx = TestContext::default();
        assert_eq!(engine.write_strategy(), WriteStrategy::Bulk);

        engine.poll(&mut ctx).unwrap();
        ctx.b = true;
        assert!(engine.synchronize(&mut ctx).unwrap());
        assert!(matches!(connector.writes().as_slice(), [Request::WriteCoils { .. }]));
    }

    #[test]
    fn test_poll_failure_blocks_writes() {
        let (mut engine, connector) = engine(SCENARIO, Duration::ZERO);
        connector.fail_reads(Some((BitArea::DiscreteInputs, Fault::Exception)));
        let mut ctx = TestContext {
            b: true,
            ..TestContext::default()
        };

        assert!(matches!(engine.sync_diff(&mut ctx), Err(Error::Poll { .. })));
        assert!(matches!(engine.sync_bulk(&mut ctx), Err(Error::Poll { .. })));
        assert!(connector.writes().is_empty());
    }

    #[test]
    fn test_connect_failure_then_recovery() {
        let (mut engine, connector) = engine(SCENARIO, Duration::ZERO);
        scenario_device(&connector);
        connector.fail_connects(true);
        let mut ctx = TestContext::default();

        assert!(matches!(engine.synchronize(&mut ctx), Err(Error::Connect { .. })));
        assert!(!ctx.a);

        connector.fail_connects(false);
        engine.synchronize(&mut ctx).unwrap();
        assert!(ctx.a);
        assert_eq!(connector.connect_count(), 2);
    }

    #[test]
    fn test_close_releases_session() {
        let (mut engine, connector) = engine(SCENARIO, Duration::from_secs(3600));
        let mut ctx = TestContext::default();
        engine.poll(&mut ctx).unwrap();
        engine.close();
        assert!(!engine.is_connected());
        assert_eq!(connector.requests().last(), Some(&Request::Close));

        // The cache is cleared with the session, so the next poll reads again.
        engine.poll(&mut ctx).unwrap();
        assert_eq!(connector.reads().len(), 4);
    }

    #[test]
    fn test_open_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let engine: SyncEngine<TestContext, _> = SyncEngine::open(&path, MockConnector::new());
        assert_eq!(engine.config(), &DeviceConfig::default());
        assert!(engine.inputs().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_export_mappings_file() {
        let (mut engine, connector) = engine(SCENARIO, Duration::ZERO);
        scenario_device(&connector);
        let mut ctx = TestContext::default();
        engine.poll(&mut ctx).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mappings.csv");
        engine.export_mappings(&path).unwrap();
        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            csv,
            "Type,Name,Address,Current Value\nInput,A,5,1\nOutput,B,3,1\n"
        );
    }

    #[test]
    fn test_independent_instances() {
        let (mut first, first_device) = engine(SCENARIO, Duration::ZERO);
        let (mut second, second_device) = engine(SCENARIO, Duration::ZERO);
        scenario_device(&first_device);
        let (mut ctx1, mut ctx2) = (TestContext::default(), TestContext::default());

        first.poll(&mut ctx1).unwrap();
        second.poll(&mut ctx2).unwrap();
        assert!(ctx1.a);
        assert!(!ctx2.a);
        assert_eq!(second_device.connect_count(), 1);
    }
}
