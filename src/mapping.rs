//! Mapping tables: named bindings between bit addresses and context fields.
//!
//! A [`MappingTable`] holds the entries of one [`Direction`] in the order they
//! were first seen in the configuration. Addresses may repeat or leave gaps;
//! the table tracks the highest address so bulk transfers can be sized as
//! `max_address + 1` bits starting at address 0.

use crate::context::FieldId;
use crate::memory::BitArea;

/// Maximum number of mappings kept per direction.
///
/// Entries beyond this are dropped at load time.
pub const MAX_MAPPINGS: usize = 1024;

/// Data flow direction of a mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Device → context, backed by discrete inputs.
    Input,
    /// Context → device, backed by coils.
    Output,
}

impl Direction {
    /// Returns the device area read for this direction.
    pub fn area(self) -> BitArea {
        match self {
            Direction::Input => BitArea::DiscreteInputs,
            Direction::Output => BitArea::Coils,
        }
    }

    /// Returns the configuration section header for this direction.
    pub fn section(self) -> &'static str {
        match self {
            Direction::Input => "InputMappings",
            Direction::Output => "OutputMappings",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "Input"),
            Direction::Output => write!(f, "Output"),
        }
    }
}

/// A named binding between a device bit address and a context field.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingEntry {
    /// Name from the configuration, matched against context field identifiers.
    pub name: String,
    /// Protocol bit address.
    pub address: u16,
    /// Last value read from or written to the device.
    pub value: bool,
    /// Value held before the last update.
    pub previous_value: bool,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub(crate) field: Option<FieldId>,
}

impl MappingEntry {
    /// Creates an unbound entry with both values cleared.
    pub fn new(name: impl Into<String>, address: u16) -> Self {
        Self {
            name: name.into(),
            address,
            value: false,
            previous_value: false,
            field: None,
        }
    }

    /// Returns whether the entry resolved to a context field.
    pub fn is_bound(&self) -> bool {
        self.field.is_some()
    }

    /// Returns the bound context field, if any.
    pub fn field(&self) -> Option<FieldId> {
        self.field
    }
}

/// Ordered mapping entries of one direction.
///
/// # Example
///
/// ```
/// use modbus_bitsync::{Direction, MappingTable};
///
/// let mut table = MappingTable::new(Direction::Input);
/// table.push("A", 5);
/// table.push("B", 2);
///
/// assert_eq!(table.max_address(), 5);
/// assert_eq!(table.span(), 6);
/// assert_eq!(table.get("B").map(|e| e.address), Some(2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MappingTable {
    direction: Direction,
    entries: Vec<MappingEntry>,
    max_address: u16,
}

impl MappingTable {
    /// Creates an empty table.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            entries: Vec::new(),
            max_address: 0,
        }
    }

    /// Appends an entry, raising `max_address` if needed.
    ///
    /// Returns `false` without modifying the table once [`MAX_MAPPINGS`]
    /// entries are stored.
    pub fn push(&mut self, name: impl Into<String>, address: u16) -> bool {
        if self.entries.len() >= MAX_MAPPINGS {
            return false;
        }
        self.entries.push(MappingEntry::new(name, address));
        self.raise_max(address);
        true
    }

    pub(crate) fn raise_max(&mut self, address: u16) {
        if address > self.max_address {
            self.max_address = address;
        }
    }

    /// Returns the direction of this table.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Highest address among the entries, or 0 when empty.
    pub fn max_address(&self) -> u16 {
        self.max_address
    }

    /// Number of bits covered by a bulk transfer: `max_address + 1`.
    pub fn span(&self) -> usize {
        usize::from(self.max_address) + 1
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the first entry with the given name.
    pub fn get(&self, name: &str) -> Option<&MappingEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Iterates entries in configuration order.
    pub fn iter(&self) -> std::slice::Iter<'_, MappingEntry> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, MappingEntry> {
        self.entries.iter_mut()
    }

    /// Number of entries bound to a context field.
    pub fn bound_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_bound()).count()
    }
}

impl<'a> IntoIterator for &'a MappingTable {
    type Item = &'a MappingEntry;
    type IntoIter = std::slice::Iter<'a, MappingEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
