//! Bit areas of a Modbus field device.
//!
//! The synchronization engine only ever touches single-bit data, which
//! Modbus splits into two tables with separate function codes:
//!
//! | Area | Direction | Read | Write |
//! |------|-----------|:----:|:-----:|
//! | [`BitArea::DiscreteInputs`] | device → context | ✓ | ✗ |
//! | [`BitArea::Coils`] | context → device | ✓ | ✓ |
//!
//! # Example
//!
//! ```
//! use modbus_bitsync::{BitArea, Direction};
//!
//! assert_eq!(Direction::Input.area(), BitArea::DiscreteInputs);
//! assert_eq!(BitArea::Coils.to_string(), "coils");
//! ```

/// Bit tables exposed by a Modbus device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BitArea {
    /// Read-only single-bit inputs (function code 0x02).
    DiscreteInputs,
    /// Read/write single-bit outputs (function codes 0x01, 0x05, 0x0F).
    Coils,
}

impl std::fmt::Display for BitArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BitArea::DiscreteInputs => write!(f, "discrete inputs"),
            BitArea::Coils => write!(f, "coils"),
        }
    }
}
