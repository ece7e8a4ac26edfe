//! Mapping registry: binds configured mappings to context fields.
//!
//! Binding matches each entry's name against the recognized field identifiers
//! of the context type. Names without a match are not an error: the entry
//! stays unbound and is never read into or written from, which lets a
//! configuration describe more points than a given context exposes.

use std::marker::PhantomData;

use tracing::{debug, info};

use crate::context::ControlContext;
use crate::mapping::{Direction, MappingEntry, MappingTable};

/// Input and output mapping tables bound to the fields of context `C`.
pub struct Registry<C> {
    inputs: MappingTable,
    outputs: MappingTable,
    _context: PhantomData<fn() -> C>,
}

impl<C: ControlContext> Registry<C> {
    /// Takes ownership of both tables and binds them.
    pub fn new(inputs: MappingTable, outputs: MappingTable) -> Self {
        let mut registry = Self {
            inputs,
            outputs,
            _context: PhantomData,
        };
        registry.bind();
        registry
    }

    /// Re-derives each table's maximum address and resolves every entry's
    /// field by name.
    ///
    /// Idempotent: binding again yields the same result.
    pub fn bind(&mut self) {
        let bound_inputs = bind_table::<C>(&mut self.inputs);
        let bound_outputs = bind_table::<C>(&mut self.outputs);
        info!(
            inputs = self.inputs.len(),
            bound_inputs,
            outputs = self.outputs.len(),
            bound_outputs,
            "Modbus input and output mappings initialized"
        );
    }

    /// Device → context mappings.
    pub fn inputs(&self) -> &MappingTable {
        &self.inputs
    }

    /// Context → device mappings.
    pub fn outputs(&self) -> &MappingTable {
        &self.outputs
    }

    /// Returns the table for a direction.
    pub fn table(&self, direction: Direction) -> &MappingTable {
        match direction {
            Direction::Input => &self.inputs,
            Direction::Output => &self.outputs,
        }
    }

    pub(crate) fn table_mut(&mut self, direction: Direction) -> &mut MappingTable {
        match direction {
            Direction::Input => &mut self.inputs,
            Direction::Output => &mut self.outputs,
        }
    }

    /// Reads the context field bound to `entry`; `None` when unbound.
    pub fn live_value(entry: &MappingEntry, ctx: &C) -> Option<bool> {
        entry.field.and_then(|id| ctx.get_field(id))
    }
}

impl<C> std::fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

fn bind_table<C: ControlContext>(table: &mut MappingTable) -> usize {
    let direction = table.direction();
    let mut max_address = table.max_address();
    let mut bound = 0;

    for entry in table.iter_mut() {
        max_address = max_address.max(entry.address);
        entry.field = C::lookup(&entry.name);
        if entry.is_bound() {
            bound += 1;
        } else {
            debug!(
                name = %entry.name,
                address = entry.address,
                "No context field for {} mapping, entry stays inert",
                direction.to_string().to_lowercase()
            );
        }
    }

    table.raise_max(max_address);
    bound
}
