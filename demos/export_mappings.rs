//! Example: Exporting mapping tables to CSV
//!
//! Run with: cargo run --example export_mappings [config.ini] [mappings.csv]
//!
//! Loads the mapping tables, prints a summary and writes the CSV export.
//! Nothing is sent to the device.

use modbus_bitsync::export::EXPORT_FILE;
use modbus_bitsync::utils::{format_bits, on_addresses};
use modbus_bitsync::{BoolField, ControlContext, MappingTable, SyncEngine, TcpConnector, CONFIG_FILE};

/// A context without fields: every mapping stays unbound.
struct Unbound;

impl ControlContext for Unbound {
    fn fields() -> &'static [BoolField<Self>] {
        &[]
    }
}

fn print_table(table: &MappingTable) {
    println!("[{}] {} entries, max address {}", table.direction(), table.len(), table.max_address());

    let mut bits = vec![false; table.span()];
    for entry in table {
        println!("  {:<32} {:>5}  {}", entry.name, entry.address, u8::from(entry.value));
        if let Some(slot) = bits.get_mut(usize::from(entry.address)) {
            *slot = true;
        }
    }

    println!("  used: {}", format_bits(&bits));
    println!("  addresses: {:?}\n", on_addresses(&bits));
}

fn main() -> modbus_bitsync::Result<()> {
    let mut args = std::env::args().skip(1);
    let config = args.next().unwrap_or_else(|| CONFIG_FILE.to_string());
    let output = args.next().unwrap_or_else(|| EXPORT_FILE.to_string());

    let engine: SyncEngine<Unbound, _> = SyncEngine::open(&config, TcpConnector);

    print_table(engine.inputs());
    print_table(engine.outputs());

    engine.export_mappings(&output)?;
    println!("Exported to {}", output);

    Ok(())
}
