//! Field registry for the live control context.
//!
//! The control logic owns a plain struct of boolean fields. Instead of
//! aliasing those fields by address, a context type publishes a fixed table
//! of named accessors ([`BoolField`]); mapping entries bind to a position in
//! that table ([`FieldId`]) and all reads and writes go through it.
//!
//! # Example
//!
//! ```
//! use modbus_bitsync::{control_context, ControlContext};
//!
//! #[derive(Default)]
//! struct Panel {
//!     lamp: bool,
//!     pump_request: bool,
//! }
//!
//! control_context!(Panel { lamp, pump_request });
//!
//! let mut panel = Panel::default();
//! let id = Panel::lookup("pump_request").unwrap();
//! panel.set_field(id, true);
//! assert!(panel.pump_request);
//! assert_eq!(panel.get_field(id), Some(true));
//! assert!(Panel::lookup("unknown").is_none());
//! ```

/// Position of a field in a context's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(usize);

impl FieldId {
    /// Index into [`ControlContext::fields`].
    pub fn index(self) -> usize {
        self.0
    }
}

/// Named get/set accessor pair for one boolean field of a context `C`.
pub struct BoolField<C> {
    name: &'static str,
    get: fn(&C) -> bool,
    set: fn(&mut C, bool),
}

impl<C> BoolField<C> {
    /// Creates an accessor pair.
    pub const fn new(name: &'static str, get: fn(&C) -> bool, set: fn(&mut C, bool)) -> Self {
        Self { name, get, set }
    }

    /// Field identifier matched against mapping names.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Reads the field.
    pub fn get(&self, ctx: &C) -> bool {
        (self.get)(ctx)
    }

    /// Writes the field.
    pub fn set(&self, ctx: &mut C, value: bool) {
        (self.set)(ctx, value)
    }
}

impl<C> Clone for BoolField<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for BoolField<C> {}

impl<C> std::fmt::Debug for BoolField<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoolField").field("name", &self.name).finish()
    }
}

/// A context exposing a closed set of named boolean fields.
///
/// Implement it with [`control_context!`](crate::control_context) for plain
/// structs, or by hand when field names differ from the configured names.
pub trait ControlContext: Sized + 'static {
    /// The recognized field identifiers and their accessors.
    fn fields() -> &'static [BoolField<Self>];

    /// Resolves a configured name to a field.
    fn lookup(name: &str) -> Option<FieldId> {
        Self::fields()
            .iter()
            .position(|field| field.name() == name)
            .map(FieldId)
    }

    /// Reads a field by id; `None` if the id is out of range.
    fn get_field(&self, id: FieldId) -> Option<bool> {
        Self::fields().get(id.0).map(|field| field.get(self))
    }

    /// Writes a field by id; returns `false` if the id is out of range.
    fn set_field(&mut self, id: FieldId, value: bool) -> bool {
        match Self::fields().get(id.0) {
            Some(field) => {
                field.set(self, value);
                true
            }
            None => false,
        }
    }
}

/// Implements [`ControlContext`] for a struct whose listed fields are `bool`.
///
/// Each field is registered under its own identifier.
#[macro_export]
macro_rules! control_context {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl $crate::ControlContext for $ty {
            fn fields() -> &'static [$crate::BoolField<Self>] {
                const FIELDS: &[$crate::BoolField<$ty>] = &[
                    $(
                        $crate::BoolField::new(
                            stringify!($field),
                            |ctx: &$ty| ctx.$field,
                            |ctx: &mut $ty, value: bool| ctx.$field = value,
                        ),
                    )*
                ];
                FIELDS
            }
        }
    };
}
