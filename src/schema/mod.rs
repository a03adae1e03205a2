//! Schema Module
//!
//! Describes frame types and derives their fixed binary layout.
//!
//! ## Responsibilities
//! - Declare a frame's fields and annotations ([`FrameDefinition`])
//! - Derive and cache the immutable layout ([`FrameInfo`])
//! - Move frame data across the codec as ordered [`Value`]s
//!
//! ## Example
//! ```
//! use fwob::schema::{DeclaredType, FieldDecl, FieldValues, Frame, FrameDefinition, Value};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Tick {
//!     time: i64,
//!     price: f64,
//! }
//!
//! impl Frame for Tick {
//!     type Key = i64;
//!
//!     fn definition() -> FrameDefinition {
//!         FrameDefinition::new("Tick")
//!             .field(FieldDecl::new("Time", DeclaredType::I64).key())
//!             .field(FieldDecl::new("Price", DeclaredType::F64))
//!     }
//!
//!     fn write_values(&self, values: &mut Vec<Value>) {
//!         values.push(self.time.into());
//!         values.push(self.price.into());
//!     }
//!
//!     fn read_values(values: &mut FieldValues<'_>) -> fwob::Result<Self> {
//!         Ok(Tick { time: values.next()?, price: values.next()? })
//!     }
//! }
//! ```

mod definition;
mod frame_info;
mod value;

use std::fmt::Debug;

use crate::error::Result;

pub use definition::{DeclaredType, FieldDecl, FrameDefinition};
pub use frame_info::{
    FieldInfo, FieldType, FrameInfo, MAX_FIELDS, MAX_FIELD_NAME_LENGTH, MAX_FRAME_TYPE_LENGTH,
    MAX_STRING_FIELD_LENGTH,
};
pub use value::{FieldValues, FromValue, Value};

/// A fixed-width record stored in a FWOB file
pub trait Frame: Sized + 'static {
    /// Sort key type; must match the declared type of the key field
    type Key: FrameKey;

    /// Declared fields, in layout order
    fn definition() -> FrameDefinition;

    /// Push one value per non-ignored field, in declaration order
    fn write_values(&self, values: &mut Vec<Value>);

    /// Rebuild a frame from its non-ignored field values
    fn read_values(values: &mut FieldValues<'_>) -> Result<Self>;
}

/// Scalar types usable as a frame sort key
pub trait FrameKey: Copy + PartialOrd + Debug + 'static {
    /// Declared field type matching this key
    const DECLARED: DeclaredType;

    /// Decode from little-endian bytes (at least the key's width)
    fn from_le_slice(bytes: &[u8]) -> Self;
}
