//! Example: Route request interlocking against a track circuit
//!
//! Run with: cargo run --example track_circuit [config.ini]
//!
//! This example demonstrates:
//! - Declaring a control context with `control_context!`
//! - Loading mappings from a configuration file (a sample is written on first run)
//! - Running the poll/write cycle at a fixed cadence
//! - Logging to stderr and `trackcircuit.log`

use modbus_bitsync::logging::{self, LogConfig};
use modbus_bitsync::{control_context, default_source, SyncEngine, TcpConnector, CONFIG_FILE};
use std::time::Duration;

/// Fields shared between the interlocking logic and the field device.
///
/// Names follow the panel's point of view: `out_*` points are the panel's
/// outputs and arrive as discrete inputs (`[InputMappings]`), `in_*` points
/// are the panel's inputs and are written as coils (`[OutputMappings]`).
#[allow(non_snake_case)]
#[derive(Debug, Default)]
struct Interlocking {
    out_RT01_Accept: bool,
    out_RT01_Reject: bool,
    out_RT01_RejectAck: bool,
    out_RT01_Request: bool,
    out_RT01_Reserve: bool,

    in_RT01_RejectAck: bool,
    in_RT01_Request: bool,
    in_TC03_I_Occupied_hws: bool,
    in_RT02_RejectAck: bool,
    in_RT02_Request: bool,
}

control_context!(Interlocking {
    out_RT01_Accept,
    out_RT01_Reject,
    out_RT01_RejectAck,
    out_RT01_Request,
    out_RT01_Reserve,
    in_RT01_RejectAck,
    in_RT01_Request,
    in_TC03_I_Occupied_hws,
    in_RT02_RejectAck,
    in_RT02_Request,
});

/// Mappings written on first run when no configuration exists yet.
const SAMPLE_MAPPINGS: &str = "\
[InputMappings]
out_RT01_Accept=0
out_RT01_Reject=1
out_RT01_RejectAck=2
out_RT01_Request=3
out_RT01_Reserve=4

[OutputMappings]
in_RT01_RejectAck=0
in_RT01_Request=1
in_TC03_I_Occupied_hws=2
in_RT02_RejectAck=3
in_RT02_Request=4
";

impl Interlocking {
    /// Derives the panel inputs from what the panel reported.
    ///
    /// RT01 stays requested until the panel accepts or rejects it; a reject is
    /// acknowledged on the next cycle. The track circuit reads as occupied
    /// once the route is both accepted and reserved.
    fn step(&mut self) {
        let settled = self.out_RT01_Accept || self.out_RT01_Reject;

        self.in_RT01_Request = !settled;
        self.in_RT01_RejectAck = self.out_RT01_Reject && !self.out_RT01_RejectAck;
        self.in_TC03_I_Occupied_hws = self.out_RT01_Accept && self.out_RT01_Reserve;
        self.in_RT02_Request = self.out_RT01_Reject;
        self.in_RT02_RejectAck = false;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _guard = logging::init(LogConfig::default())?;

    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_FILE.to_string());
    if !std::path::Path::new(&path).exists() {
        std::fs::write(&path, format!("{}{}", default_source(), SAMPLE_MAPPINGS))?;
    }
    let mut engine: SyncEngine<Interlocking, _> = SyncEngine::open(&path, TcpConnector);

    println!("Device:   {}", engine.config().endpoint());
    println!("Strategy: {}", engine.write_strategy());
    println!(
        "Mappings: {} input(s), {} output(s)\n",
        engine.inputs().len(),
        engine.outputs().len()
    );

    let mut state = Interlocking::default();

    loop {
        // Failures are already logged; the next cycle retries.
        if engine.poll(&mut state).is_ok() {
            state.step();
            let _ = engine.synchronize(&mut state);
        }

        std::thread::sleep(Duration::from_millis(100));
    }
}
