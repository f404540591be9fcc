use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ValueError, ValueResult};
use crate::null::Null;
use crate::scalar::{Scalar, ScalarType};

/// One row: field name to value, ordered by field name.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// One scalar value for one field of one row.
///
/// `Null` carries the declared kind so an absent value is still typed and can
/// never be confused with a zero, empty or false value of any kind.
///
/// Equality and ordering are total: doubles compare with IEEE total ordering,
/// values of different kinds order by kind, and nulls sort before everything.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Null(ScalarType),
}

impl FieldValue {
    /// The declared kind of this value (also for nulls).
    pub fn kind(&self) -> ScalarType {
        match self {
            FieldValue::Bool(_) => ScalarType::Bool,
            FieldValue::Int32(_) => ScalarType::Int32,
            FieldValue::Int64(_) => ScalarType::Int64,
            FieldValue::Double(_) => ScalarType::Double,
            FieldValue::String(_) => ScalarType::String,
            FieldValue::Blob(_) => ScalarType::Blob,
            FieldValue::Uuid(_) => ScalarType::Uuid,
            FieldValue::Timestamp(_) => ScalarType::Timestamp,
            FieldValue::Null(kind) => *kind,
        }
    }

    /// Whether this is a typed null.
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null(_))
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null(_) => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Int32(_) => 2,
            FieldValue::Int64(_) => 3,
            FieldValue::Double(_) => 4,
            FieldValue::String(_) => 5,
            FieldValue::Blob(_) => 6,
            FieldValue::Uuid(_) => 7,
            FieldValue::Timestamp(_) => 8,
        }
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FieldValue {}

impl PartialOrd for FieldValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Int32(a), FieldValue::Int32(b)) => a.cmp(b),
            (FieldValue::Int64(a), FieldValue::Int64(b)) => a.cmp(b),
            (FieldValue::Double(a), FieldValue::Double(b)) => a.total_cmp(b),
            (FieldValue::String(a), FieldValue::String(b)) => a.cmp(b),
            (FieldValue::Blob(a), FieldValue::Blob(b)) => a.cmp(b),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => a.cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Null(a), FieldValue::Null(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Int32(v) => write!(f, "{v}"),
            FieldValue::Int64(v) => write!(f, "{v}"),
            FieldValue::Double(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v:?}"),
            FieldValue::Blob(v) => write!(f, "0x{}", hex::encode(v)),
            FieldValue::Uuid(v) => write!(f, "{v}"),
            FieldValue::Timestamp(v) => {
                f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            FieldValue::Null(kind) => write!(f, "null({kind})"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Double(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Blob(v)
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        FieldValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(v)
    }
}

/// Decode a required, non-null field from a row.
pub fn required<T: Scalar>(values: &FieldValues, field: &str) -> ValueResult<T> {
    let value = values
        .get(field)
        .ok_or_else(|| ValueError::MissingField(field.to_string()))?;
    if value.is_null() {
        return Err(ValueError::NullField(field.to_string()));
    }
    T::from_field_value(value).ok_or_else(|| ValueError::TypeMismatch {
        field: field.to_string(),
        expected: T::KIND,
        found: value.kind(),
    })
}

/// Decode an optional field from a row. A missing field decodes as null.
pub fn optional<T: Scalar>(values: &FieldValues, field: &str) -> ValueResult<Null<T>> {
    match values.get(field) {
        None => Ok(Null::null()),
        Some(value) if value.is_null() => {
            if value.kind() != T::KIND {
                return Err(ValueError::TypeMismatch {
                    field: field.to_string(),
                    expected: T::KIND,
                    found: value.kind(),
                });
            }
            Ok(Null::null())
        }
        Some(_) => required(values, field).map(Null::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_is_distinct_from_zero_values() {
        assert_ne!(FieldValue::Null(ScalarType::Int64), FieldValue::Int64(0));
        assert_ne!(FieldValue::Null(ScalarType::Bool), FieldValue::Bool(false));
        assert_ne!(
            FieldValue::Null(ScalarType::String),
            FieldValue::String(String::new())
        );
        assert_eq!(FieldValue::Null(ScalarType::Int64).kind(), ScalarType::Int64);
    }

    #[test]
    fn ordering_is_total() {
        let mut values = vec![
            FieldValue::Double(f64::NAN),
            FieldValue::Int64(3),
            FieldValue::Null(ScalarType::Int64),
            FieldValue::Double(-1.5),
            FieldValue::Int64(-3),
        ];
        values.sort();
        assert_eq!(values[0], FieldValue::Null(ScalarType::Int64));
        assert_eq!(values[1], FieldValue::Int64(-3));
        assert_eq!(values[2], FieldValue::Int64(3));
        assert_eq!(values[3], FieldValue::Double(-1.5));
        // NaN equals itself under total ordering.
        assert_eq!(values[4], FieldValue::Double(f64::NAN));
    }

    #[test]
    fn required_and_optional_fields() {
        let mut row = FieldValues::new();
        row.insert("id".into(), 7i64.into());
        row.insert("note".into(), FieldValue::Null(ScalarType::String));

        assert_eq!(required::<i64>(&row, "id").unwrap(), 7);
        assert_eq!(
            required::<i64>(&row, "missing"),
            Err(ValueError::MissingField("missing".into()))
        );
        assert_eq!(
            required::<String>(&row, "note"),
            Err(ValueError::NullField("note".into()))
        );
        assert!(matches!(
            required::<i32>(&row, "id"),
            Err(ValueError::TypeMismatch { expected: ScalarType::Int32, found: ScalarType::Int64, .. })
        ));

        assert!(!optional::<String>(&row, "note").unwrap().is_valid());
        assert!(!optional::<String>(&row, "missing").unwrap().is_valid());
        assert_eq!(optional::<i64>(&row, "id").unwrap().into_option(), Some(7));
        assert!(optional::<bool>(&row, "note").is_err());
    }

    #[test]
    fn display_renders_each_kind() {
        assert_eq!(FieldValue::Blob(vec![0xab, 0x01]).to_string(), "0xab01");
        assert_eq!(FieldValue::from("x").to_string(), "\"x\"");
        assert_eq!(FieldValue::Null(ScalarType::Uuid).to_string(), "null(uuid)");
    }

    #[test]
    fn serde_keeps_the_kind_tag() {
        let v = FieldValue::Int64(i64::MAX);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, r#"{"int64":9223372036854775807}"#);
        let back: FieldValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);

        let null = FieldValue::Null(ScalarType::Timestamp);
        let back: FieldValue =
            serde_json::from_str(&serde_json::to_string(&null).unwrap()).unwrap();
        assert_eq!(back, null);
    }
}
