use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field::FieldValue;

/// Declared kind of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Bool,
    Int32,
    Int64,
    Double,
    String,
    Blob,
    Uuid,
    Timestamp,
}

impl ScalarType {
    /// All kinds, in declaration order.
    pub const ALL: [ScalarType; 8] = [
        ScalarType::Bool,
        ScalarType::Int32,
        ScalarType::Int64,
        ScalarType::Double,
        ScalarType::String,
        ScalarType::Blob,
        ScalarType::Uuid,
        ScalarType::Timestamp,
    ];

    /// Lowercase name, as used in schema descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Double => "double",
            ScalarType::String => "string",
            ScalarType::Blob => "blob",
            ScalarType::Uuid => "uuid",
            ScalarType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScalarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScalarType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown scalar type: {s}"))
    }
}

/// A Rust type that maps onto exactly one [`ScalarType`].
pub trait Scalar: Clone + PartialEq + fmt::Debug + Sized {
    /// The declared kind this type stores as.
    const KIND: ScalarType;

    /// Wrap into a [`FieldValue`].
    fn into_field_value(self) -> FieldValue;

    /// Borrow out of a [`FieldValue`]. Returns `None` for a different kind or
    /// a null.
    fn from_field_value(value: &FieldValue) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($ty:ty, $kind:ident) => {
        impl Scalar for $ty {
            const KIND: ScalarType = ScalarType::$kind;

            fn into_field_value(self) -> FieldValue {
                FieldValue::$kind(self)
            }

            fn from_field_value(value: &FieldValue) -> Option<Self> {
                match value {
                    FieldValue::$kind(v) => Some(v.clone()),
                    _ => None,
                }
            }
        }
    };
}

impl_scalar!(bool, Bool);
impl_scalar!(i32, Int32);
impl_scalar!(i64, Int64);
impl_scalar!(f64, Double);
impl_scalar!(String, String);
impl_scalar!(Vec<u8>, Blob);
impl_scalar!(Uuid, Uuid);
impl_scalar!(DateTime<Utc>, Timestamp);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip_through_from_str() {
        for kind in ScalarType::ALL {
            assert_eq!(kind.as_str().parse::<ScalarType>().unwrap(), kind);
        }
        assert_eq!("INT64".parse::<ScalarType>().unwrap(), ScalarType::Int64);
        assert!("decimal".parse::<ScalarType>().is_err());
    }

    #[test]
    fn scalar_extracts_only_its_own_kind() {
        let v = 7i64.into_field_value();
        assert_eq!(i64::from_field_value(&v), Some(7));
        assert_eq!(i32::from_field_value(&v), None);
        assert_eq!(i64::from_field_value(&FieldValue::Null(ScalarType::Int64)), None);
    }
}
