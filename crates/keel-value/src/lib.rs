//! Scalar field values for Keel.
//!
//! Every row that crosses the connector boundary is a map of field name to
//! [`FieldValue`]. This crate defines those values and the null-safe wrapper
//! [`Null`] used wherever an encoding has to tell "absent" apart from every
//! representable value, including zero, empty and false.
//!
//! # Key Types
//!
//! - [`ScalarType`]: the declared kind of a column
//! - [`FieldValue`]: one tagged scalar, or a typed null
//! - [`Null`]: optional scalar with text and JSON codecs
//!
//! # Codec Rules
//!
//! 1. A valid value renders as canonical text / the native JSON scalar.
//! 2. An invalid value renders as `""` in text and `null` in JSON.
//! 3. Text `""` and `"null"` decode to the invalid state without error.
//! 4. JSON decoding dispatches on the declared kind, so 64-bit integers never
//!    pass through a float and fractional numbers never land in an integer.

pub mod error;
pub mod field;
pub mod null;
pub mod scalar;

pub use error::{NullError, NullResult, ValueError, ValueResult};
pub use field::{optional, required, FieldValue, FieldValues};
pub use null::{
    Null, NullBlob, NullBool, NullDouble, NullInt32, NullInt64, NullScalar, NullString,
    NullTimestamp, NullUuid,
};
pub use scalar::{Scalar, ScalarType};
