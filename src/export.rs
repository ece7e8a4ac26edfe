//! Tabular export of the mapping tables.
//!
//! Output is CSV with one row per entry, inputs first:
//!
//! ```text
//! Type,Name,Address,Current Value
//! Input,out_RT01_Accept,5,1
//! Output,in_RT01_Request,3,0
//! ```
//!
//! Export only reads the tables.

use std::io::{self, Write};

use crate::context::ControlContext;
use crate::mapping::{Direction, MappingTable};
use crate::registry::Registry;

/// Default export file name.
pub const EXPORT_FILE: &str = "mappings.csv";

const HEADER: &str = "Type,Name,Address,Current Value";

/// Writes both tables of `registry` as CSV.
pub fn write_csv<C: ControlContext, W: Write>(registry: &Registry<C>, out: &mut W) -> io::Result<()> {
    writeln!(out, "{HEADER}")?;
    write_rows(registry.table(Direction::Input), out)?;
    write_rows(registry.table(Direction::Output), out)?;
    out.flush()
}

fn write_rows<W: Write>(table: &MappingTable, out: &mut W) -> io::Result<()> {
    for entry in table {
        writeln!(
            out,
            "{},{},{},{}",
            table.direction(),
            escape(&entry.name),
            entry.address,
            u8::from(entry.value)
        )?;
    }
    Ok(())
}

/// Quotes a field containing a separator, quote or line break.
fn escape(field: &str) -> std::borrow::Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\"")).into()
    } else {
        field.into()
    }
}
