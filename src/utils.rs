//! Helpers for bit buffers.
//!
//! # Example
//!
//! ```
//! use modbus_bitsync::utils::{bit_at, format_bits, on_addresses};
//!
//! let bits = [false, true, false, true];
//!
//! assert!(bit_at(&bits, 1));
//! assert!(!bit_at(&bits, 9)); // outside the buffer reads as OFF
//! assert_eq!(format_bits(&bits), "0101");
//! assert_eq!(on_addresses(&bits), vec![1, 3]);
//! ```

/// Returns the bit at `address`, or `false` past the end of the buffer.
#[inline]
pub fn bit_at(bits: &[bool], address: u16) -> bool {
    bits.get(usize::from(address)).copied().unwrap_or(false)
}

/// Renders bits as `0`/`1`, lowest address first.
///
/// # Example
///
/// ```
/// use modbus_bitsync::utils::format_bits;
///
/// assert_eq!(format_bits(&[true, true, false]), "110");
/// assert_eq!(format_bits(&[]), "");
/// ```
pub fn format_bits(bits: &[bool]) -> String {
    bits.iter().map(|&b| if b { '1' } else { '0' }).collect()
}

/// Returns the addresses of all set bits.
pub fn on_addresses(bits: &[bool]) -> Vec<u16> {
    bits.iter()
        .enumerate()
        .filter(|(_, &b)| b)
        .filter_map(|(i, _)| u16::try_from(i).ok())
        .collect()
}
