//! Null-safe optional scalars.
//!
//! [`Null<T>`] is either valid (holding a `T`) or invalid. The invalid state
//! holds no value at all, so nothing stale can leak out of it. Text and JSON
//! codecs are provided for every [`NullScalar`] kind.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::ser::{self, Serializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{NullError, NullResult};
use crate::field::FieldValue;
use crate::scalar::Scalar;

/// An optional scalar whose absence is distinct from every representable
/// value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Null<T> {
    value: Option<T>,
}

pub type NullBool = Null<bool>;
pub type NullInt32 = Null<i32>;
pub type NullInt64 = Null<i64>;
pub type NullDouble = Null<f64>;
pub type NullString = Null<String>;
pub type NullBlob = Null<Vec<u8>>;
pub type NullUuid = Null<Uuid>;
pub type NullTimestamp = Null<DateTime<Utc>>;

impl<T> Null<T> {
    /// An invalid (null) value.
    pub const fn null() -> Self {
        Self { value: None }
    }

    /// A valid value.
    pub const fn new(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Mark valid and store `value`.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Mark invalid. The previous value is dropped.
    pub fn nullify(&mut self) {
        self.value = None;
    }

    /// Whether a value is stored.
    pub fn is_valid(&self) -> bool {
        self.value.is_some()
    }

    /// Borrow the stored value, if any.
    pub fn as_option(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Take the stored value, if any.
    pub fn into_option(self) -> Option<T> {
        self.value
    }
}

impl<T: Clone> Null<T> {
    /// The stored value, or [`NullError::NullValue`] when invalid.
    pub fn get(&self) -> NullResult<T> {
        self.value.clone().ok_or(NullError::NullValue)
    }
}

impl<T> Default for Null<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> From<Option<T>> for Null<T> {
    fn from(value: Option<T>) -> Self {
        Self { value }
    }
}

impl<T> From<Null<T>> for Option<T> {
    fn from(value: Null<T>) -> Self {
        value.value
    }
}

impl<T: NullScalar> Null<T> {
    /// Text rendering: canonical text when valid, `""` when invalid.
    pub fn to_text(&self) -> String {
        match &self.value {
            Some(v) => v.encode_text(),
            None => String::new(),
        }
    }

    /// Decode from text. `""` and `"null"` decode to the invalid state.
    pub fn from_text(text: &str) -> NullResult<Self> {
        let mut out = Self::null();
        out.decode_text(text)?;
        Ok(out)
    }

    /// Decode text in place. On failure the value is left invalid.
    pub fn decode_text(&mut self, text: &str) -> NullResult<()> {
        self.value = None;
        if text.is_empty() || text == "null" {
            return Ok(());
        }
        let value = T::decode_text(text).map_err(|reason| NullError::Parse {
            kind: T::KIND,
            text: text.to_string(),
            reason,
        })?;
        self.value = Some(value);
        Ok(())
    }

    /// JSON rendering: the native scalar when valid, `null` when invalid.
    pub fn to_json(&self) -> NullResult<String> {
        serde_json::to_string(self).map_err(|e| NullError::TypeMismatch {
            expected: T::KIND,
            detail: e.to_string(),
        })
    }

    /// Decode from JSON. `null` decodes to the invalid state.
    ///
    /// Malformed input is [`NullError::Json`]; well-formed JSON of the wrong
    /// kind is [`NullError::TypeMismatch`].
    pub fn from_json(json: &str) -> NullResult<Self> {
        serde_json::from_str::<de::IgnoredAny>(json)
            .map_err(|e| NullError::Json(e.to_string()))?;
        serde_json::from_str(json).map_err(|e| match e.classify() {
            serde_json::error::Category::Data => NullError::TypeMismatch {
                expected: T::KIND,
                detail: e.to_string(),
            },
            _ => NullError::Json(e.to_string()),
        })
    }

    /// Decode JSON in place. On failure the value is left invalid.
    pub fn decode_json(&mut self, json: &str) -> NullResult<()> {
        self.value = None;
        *self = Self::from_json(json)?;
        Ok(())
    }
}

impl<T: NullScalar> fmt::Display for Null<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl<T: NullScalar> FromStr for Null<T> {
    type Err = NullError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_text(s)
    }
}

impl<T: NullScalar> Serialize for Null<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.value {
            Some(v) => v.encode_json(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de, T: NullScalar> Deserialize<'de> for Null<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::decode_json(deserializer).map(Self::from)
    }
}

impl<T: Scalar> From<Null<T>> for FieldValue {
    fn from(value: Null<T>) -> Self {
        match value.value {
            Some(v) => v.into_field_value(),
            None => FieldValue::Null(T::KIND),
        }
    }
}

impl<T: Scalar> TryFrom<&FieldValue> for Null<T> {
    type Error = NullError;

    fn try_from(value: &FieldValue) -> Result<Self, Self::Error> {
        if value.kind() != T::KIND {
            return Err(NullError::TypeMismatch {
                expected: T::KIND,
                detail: format!("found {}", value.kind()),
            });
        }
        Ok(Self {
            value: T::from_field_value(value),
        })
    }
}

/// A scalar kind with text and JSON codecs.
pub trait NullScalar: Scalar {
    /// Canonical text for a valid value.
    fn encode_text(&self) -> String;

    /// Parse canonical text. `""` and `"null"` never reach this.
    fn decode_text(text: &str) -> Result<Self, String>;

    /// Serialize as the native JSON scalar.
    fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>;

    /// Deserialize, mapping JSON `null` to `None`.
    fn decode_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Self>, D::Error>;
}

// ---------------------------------------------------------------------------
// Visitors
// ---------------------------------------------------------------------------

/// Per-kind JSON visitor. JSON `null` visits as `None`.
struct KindVisitor<T> {
    _marker: PhantomData<T>,
}

impl<T> KindVisitor<T> {
    fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

macro_rules! null_visits {
    ($de:lifetime) => {
        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<$de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    };
}

impl<'de> Visitor<'de> for KindVisitor<bool> {
    type Value = Option<bool>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean or null")
    }

    null_visits!('de);

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(Some(v))
    }
}

macro_rules! int_visitor {
    ($ty:ty, $expecting:literal) => {
        impl<'de> Visitor<'de> for KindVisitor<$ty> {
            type Value = Option<$ty>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($expecting)
            }

            null_visits!('de);

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                <$ty>::try_from(v)
                    .map(Some)
                    .map_err(|_| E::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                <$ty>::try_from(v)
                    .map(Some)
                    .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                // Upper bound is exclusive: -(MIN as f64) is 2^(bits-1).
                let in_range = v >= <$ty>::MIN as f64 && v < -(<$ty>::MIN as f64);
                if v.is_finite() && v.fract() == 0.0 && in_range {
                    Ok(Some(v as $ty))
                } else {
                    Err(E::invalid_type(Unexpected::Float(v), &self))
                }
            }
        }
    };
}

int_visitor!(i32, "a 32-bit integer or null");
int_visitor!(i64, "a 64-bit integer or null");

impl<'de> Visitor<'de> for KindVisitor<f64> {
    type Value = Option<f64>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or null")
    }

    null_visits!('de);

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }
}

impl<'de> Visitor<'de> for KindVisitor<String> {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or null")
    }

    null_visits!('de);

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(Some(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(Some(v))
    }
}

impl<'de> Visitor<'de> for KindVisitor<Vec<u8>> {
    type Value = Option<Vec<u8>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hex string or null")
    }

    null_visits!('de);

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        hex::decode(v)
            .map(Some)
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Visitor<'de> for KindVisitor<Uuid> {
    type Value = Option<Uuid>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a UUID string or null")
    }

    null_visits!('de);

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Uuid::parse_str(v)
            .map(Some)
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

impl<'de> Visitor<'de> for KindVisitor<DateTime<Utc>> {
    type Value = Option<DateTime<Utc>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 timestamp string or null")
    }

    null_visits!('de);

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_timestamp(v)
            .map(Some)
            .map_err(|_| E::invalid_value(Unexpected::Str(v), &self))
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|ts| ts.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// NullScalar impls
// ---------------------------------------------------------------------------

macro_rules! impl_null_scalar {
    ($ty:ty, $serialize:ident, |$v:ident| $encode:expr, |$t:ident| $decode:expr) => {
        impl NullScalar for $ty {
            fn encode_text(&self) -> String {
                let $v = self;
                $encode
            }

            fn decode_text($t: &str) -> Result<Self, String> {
                $decode
            }

            fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.$serialize(self.clone())
            }

            fn decode_json<'de, D: Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Option<Self>, D::Error> {
                deserializer.deserialize_any(KindVisitor::<$ty>::new())
            }
        }
    };
}

impl_null_scalar!(
    bool,
    serialize_bool,
    |v| v.to_string(),
    |t| t.parse().map_err(|e: std::str::ParseBoolError| e.to_string())
);
impl_null_scalar!(
    i32,
    serialize_i32,
    |v| v.to_string(),
    |t| t.parse().map_err(|e: std::num::ParseIntError| e.to_string())
);
impl_null_scalar!(
    i64,
    serialize_i64,
    |v| v.to_string(),
    |t| t.parse().map_err(|e: std::num::ParseIntError| e.to_string())
);

impl NullScalar for f64 {
    fn encode_text(&self) -> String {
        self.to_string()
    }

    fn decode_text(text: &str) -> Result<Self, String> {
        text.parse().map_err(|e: std::num::ParseFloatError| e.to_string())
    }

    fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if !self.is_finite() {
            return Err(ser::Error::custom(format!(
                "{self} has no JSON representation"
            )));
        }
        serializer.serialize_f64(*self)
    }

    fn decode_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Self>, D::Error> {
        deserializer.deserialize_any(KindVisitor::<f64>::new())
    }
}

impl NullScalar for String {
    fn encode_text(&self) -> String {
        self.clone()
    }

    fn decode_text(text: &str) -> Result<Self, String> {
        Ok(text.to_string())
    }

    fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self)
    }

    fn decode_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Self>, D::Error> {
        deserializer.deserialize_any(KindVisitor::<String>::new())
    }
}

/// Blobs are lowercase hex in both codecs.
impl NullScalar for Vec<u8> {
    fn encode_text(&self) -> String {
        hex::encode(self)
    }

    fn decode_text(text: &str) -> Result<Self, String> {
        hex::decode(text).map_err(|e| e.to_string())
    }

    fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self))
    }

    fn decode_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Self>, D::Error> {
        deserializer.deserialize_any(KindVisitor::<Vec<u8>>::new())
    }
}

impl NullScalar for Uuid {
    fn encode_text(&self) -> String {
        self.hyphenated().to_string()
    }

    fn decode_text(text: &str) -> Result<Self, String> {
        Uuid::parse_str(text).map_err(|e| e.to_string())
    }

    fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode_text())
    }

    fn decode_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Self>, D::Error> {
        deserializer.deserialize_any(KindVisitor::<Uuid>::new())
    }
}

impl NullScalar for DateTime<Utc> {
    fn encode_text(&self) -> String {
        format_timestamp(self)
    }

    fn decode_text(text: &str) -> Result<Self, String> {
        parse_timestamp(text).map_err(|e| e.to_string())
    }

    fn encode_json<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(self))
    }

    fn decode_json<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Self>, D::Error> {
        deserializer.deserialize_any(KindVisitor::<DateTime<Utc>>::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::ScalarType;
    use chrono::TimeZone;
    use proptest::prelude::*;

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[test]
    fn set_get_nullify() {
        let mut v = NullBool::new(true);
        assert_eq!(v.get(), Ok(true));

        v.set(false);
        assert_eq!(v.get(), Ok(false));

        v.nullify();
        assert_eq!(v.get(), Err(NullError::NullValue));
        assert_eq!(NullError::NullValue.to_string(), "value is null");
    }

    macro_rules! nullify_then_get_fails {
        ($name:ident, $ty:ty, $value:expr) => {
            #[test]
            fn $name() {
                let mut v = <Null<$ty>>::new($value);
                assert!(v.get().is_ok());
                v.nullify();
                assert!(!v.is_valid());
                assert_eq!(v.get(), Err(NullError::NullValue));
            }
        };
    }

    nullify_then_get_fails!(nullify_bool, bool, false);
    nullify_then_get_fails!(nullify_int32, i32, 0);
    nullify_then_get_fails!(nullify_int64, i64, 0);
    nullify_then_get_fails!(nullify_double, f64, 0.0);
    nullify_then_get_fails!(nullify_string, String, String::new());
    nullify_then_get_fails!(nullify_blob, Vec<u8>, Vec::new());
    nullify_then_get_fails!(nullify_uuid, Uuid, Uuid::nil());
    nullify_then_get_fails!(nullify_timestamp, DateTime<Utc>, DateTime::<Utc>::UNIX_EPOCH);

    #[test]
    fn default_is_null() {
        assert!(!NullInt64::default().is_valid());
        assert_eq!(NullInt64::from(Some(3)).into_option(), Some(3));
        assert_eq!(Option::<i64>::from(NullInt64::null()), None);
    }

    // -----------------------------------------------------------------------
    // Text codec
    // -----------------------------------------------------------------------

    #[test]
    fn bool_text() {
        assert_eq!(NullBool::new(true).to_text(), "true");
        assert_eq!(NullBool::new(false).to_text(), "false");
        assert_eq!(NullBool::null().to_text(), "");

        assert_eq!(NullBool::from_text("true").unwrap().get(), Ok(true));
        assert_eq!(NullBool::from_text("false").unwrap().get(), Ok(false));
    }

    #[test]
    fn empty_and_null_text_decode_to_invalid() {
        for text in ["", "null"] {
            let mut v = NullInt64::new(5);
            v.decode_text(text).unwrap();
            assert_eq!(v.get(), Err(NullError::NullValue));

            assert!(!NullBool::from_text(text).unwrap().is_valid());
            assert!(!NullUuid::from_text(text).unwrap().is_valid());
            assert!(!NullTimestamp::from_text(text).unwrap().is_valid());
        }
    }

    #[test]
    fn unparsable_text_fails_and_leaves_invalid() {
        let mut v = NullInt64::new(5);
        let err = v.decode_text("12abc").unwrap_err();
        assert!(matches!(err, NullError::Parse { kind: ScalarType::Int64, .. }));
        assert!(!v.is_valid());

        assert!(NullBool::from_text("yes").is_err());
        assert!(NullInt32::from_text("4294967296").is_err());
        assert!(NullUuid::from_text("not-a-uuid").is_err());
    }

    #[test]
    fn display_and_from_str_use_text_codec() {
        let v: NullInt32 = "-17".parse().unwrap();
        assert_eq!(v.get(), Ok(-17));
        assert_eq!(v.to_string(), "-17");
        assert_eq!(NullInt32::null().to_string(), "");
    }

    #[test]
    fn timestamp_text_keeps_nanoseconds() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let v = NullTimestamp::new(ts);
        assert_eq!(v.to_text(), "2023-11-14T22:13:20.123456789Z");
        assert_eq!(NullTimestamp::from_text(&v.to_text()).unwrap(), v);
    }

    // -----------------------------------------------------------------------
    // JSON codec
    // -----------------------------------------------------------------------

    #[test]
    fn int64_json_scenario() {
        let mut v = NullInt64::new(42);
        assert_eq!(v.to_json().unwrap(), "42");

        v.nullify();
        assert_eq!(v.to_json().unwrap(), "null");

        let decoded = NullInt64::from_json("null").unwrap();
        assert_eq!(decoded.get(), Err(NullError::NullValue));
    }

    #[test]
    fn bool_json() {
        assert_eq!(NullBool::new(true).to_json().unwrap(), "true");
        assert_eq!(NullBool::new(false).to_json().unwrap(), "false");
        assert_eq!(NullBool::null().to_json().unwrap(), "null");
        assert_eq!(NullBool::from_json("true").unwrap().get(), Ok(true));

        let err = NullBool::from_json("3.14").unwrap_err();
        assert!(matches!(err, NullError::TypeMismatch { expected: ScalarType::Bool, .. }));
    }

    #[test]
    fn fractional_json_into_integer_fails() {
        let err = NullInt64::from_json("3.5").unwrap_err();
        assert!(matches!(err, NullError::TypeMismatch { expected: ScalarType::Int64, .. }));
        assert!(NullInt32::from_json("-0.25").is_err());
    }

    #[test]
    fn integral_json_into_integer_succeeds() {
        assert_eq!(NullInt64::from_json("42").unwrap().get(), Ok(42));
        assert_eq!(NullInt64::from_json("42.0").unwrap().get(), Ok(42));
        assert_eq!(NullInt64::from_json("-7").unwrap().get(), Ok(-7));
        assert_eq!(NullInt32::from_json("1e3").unwrap().get(), Ok(1000));
    }

    #[test]
    fn large_int64_keeps_precision() {
        let big = (1i64 << 53) + 1;
        let v = NullInt64::new(big);
        assert_eq!(NullInt64::from_json(&v.to_json().unwrap()).unwrap().get(), Ok(big));

        let max = NullInt64::new(i64::MAX);
        assert_eq!(max.to_json().unwrap(), "9223372036854775807");
        assert_eq!(NullInt64::from_json("9223372036854775807").unwrap(), max);
        assert_eq!(NullInt64::from_json("-9223372036854775808").unwrap().get(), Ok(i64::MIN));
    }

    #[test]
    fn out_of_range_integers_fail() {
        assert!(NullInt64::from_json("9223372036854775808").is_err());
        assert!(NullInt32::from_json("2147483648").is_err());
        assert_eq!(NullInt32::from_json("2147483647").unwrap().get(), Ok(i32::MAX));
    }

    #[test]
    fn wrong_json_kind_is_a_type_mismatch() {
        assert!(matches!(
            NullInt64::from_json("\"42\"").unwrap_err(),
            NullError::TypeMismatch { .. }
        ));
        assert!(matches!(
            NullString::from_json("12").unwrap_err(),
            NullError::TypeMismatch { .. }
        ));
        assert!(matches!(
            NullUuid::from_json("\"xyz\"").unwrap_err(),
            NullError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn malformed_json_is_reported_as_json_error() {
        assert!(matches!(NullInt64::from_json("{").unwrap_err(), NullError::Json(_)));
        assert!(matches!(NullString::from_json("[1,").unwrap_err(), NullError::Json(_)));
        assert!(matches!(NullBool::from_json("").unwrap_err(), NullError::Json(_)));

        // Well-formed but the wrong shape stays a kind mismatch.
        assert!(matches!(
            NullInt64::from_json("{}").unwrap_err(),
            NullError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn double_json_is_exact_at_the_last_digit() {
        for v in [8.001353252008331e299, 8.001353252008332e299, 0.1, -2.2250738585072014e-308] {
            let json = NullDouble::new(v).to_json().unwrap();
            assert_eq!(NullDouble::from_json(&json).unwrap().get(), Ok(v));
        }
    }

    #[test]
    fn blob_codecs_use_hex() {
        let v = NullBlob::new(vec![0xde, 0xad, 0x00, 0x01]);
        assert_eq!(v.to_text(), "dead0001");
        assert_eq!(v.to_json().unwrap(), "\"dead0001\"");
        assert_eq!(NullBlob::from_text("DEAD0001").unwrap(), v);
        assert_eq!(NullBlob::from_json("\"dead0001\"").unwrap(), v);

        assert!(matches!(
            NullBlob::from_text("abc").unwrap_err(),
            NullError::Parse { kind: ScalarType::Blob, .. }
        ));
        assert!(matches!(
            NullBlob::from_json("[1,2]").unwrap_err(),
            NullError::TypeMismatch { expected: ScalarType::Blob, .. }
        ));
        assert_eq!(FieldValue::from(v.clone()), FieldValue::Blob(vec![0xde, 0xad, 0x00, 0x01]));
    }

    #[test]
    fn decode_json_failure_leaves_invalid() {
        let mut v = NullInt64::new(1);
        assert!(v.decode_json("1.5").is_err());
        assert!(!v.is_valid());
        v.decode_json("8").unwrap();
        assert_eq!(v.get(), Ok(8));
    }

    #[test]
    fn non_finite_double_has_no_json_form() {
        assert!(NullDouble::new(f64::NAN).to_json().is_err());
        assert!(NullDouble::new(f64::INFINITY).to_json().is_err());
        assert_eq!(NullDouble::from_json("3").unwrap().get(), Ok(3.0));
    }

    #[test]
    fn uuid_and_timestamp_json_are_strings() {
        let id = Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0);
        let v = NullUuid::new(id);
        assert_eq!(v.to_json().unwrap(), "\"12345678-9abc-def0-1234-56789abcdef0\"");
        assert_eq!(NullUuid::from_json(&v.to_json().unwrap()).unwrap(), v);

        let ts = NullTimestamp::new(Utc.timestamp_opt(0, 0).unwrap());
        assert_eq!(ts.to_json().unwrap(), "\"1970-01-01T00:00:00Z\"");
    }

    #[test]
    fn null_embeds_in_structs() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Row {
            id: NullInt64,
            name: NullString,
        }

        let row = Row {
            id: NullInt64::new(9),
            name: NullString::null(),
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"id":9,"name":null}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }

    // -----------------------------------------------------------------------
    // FieldValue bridge
    // -----------------------------------------------------------------------

    #[test]
    fn field_value_bridge() {
        assert_eq!(FieldValue::from(NullInt64::new(3)), FieldValue::Int64(3));
        assert_eq!(
            FieldValue::from(NullInt64::null()),
            FieldValue::Null(ScalarType::Int64)
        );

        let back = NullInt64::try_from(&FieldValue::Null(ScalarType::Int64)).unwrap();
        assert!(!back.is_valid());
        assert_eq!(NullInt64::try_from(&FieldValue::Int64(3)).unwrap().get(), Ok(3));
        assert!(NullInt64::try_from(&FieldValue::Int32(3)).is_err());
    }

    // -----------------------------------------------------------------------
    // Round-trip properties
    // -----------------------------------------------------------------------

    fn assert_roundtrips<T: NullScalar>(v: Null<T>) {
        assert_eq!(Null::<T>::from_text(&v.to_text()).unwrap(), v);
        assert_eq!(Null::<T>::from_json(&v.to_json().unwrap()).unwrap(), v);
    }

    #[test]
    fn invalid_state_roundtrips() {
        assert_roundtrips(NullBool::null());
        assert_roundtrips(NullInt32::null());
        assert_roundtrips(NullInt64::null());
        assert_roundtrips(NullDouble::null());
        assert_roundtrips(NullString::null());
        assert_roundtrips(NullBlob::null());
        assert_roundtrips(NullUuid::null());
        assert_roundtrips(NullTimestamp::null());
    }

    proptest! {
        #[test]
        fn bool_roundtrips(v in any::<bool>()) {
            assert_roundtrips(NullBool::new(v));
        }

        #[test]
        fn int32_roundtrips(v in any::<i32>()) {
            assert_roundtrips(NullInt32::new(v));
        }

        #[test]
        fn int64_roundtrips(v in any::<i64>()) {
            assert_roundtrips(NullInt64::new(v));
        }

        #[test]
        fn double_roundtrips(v in -1e300f64..1e300f64) {
            assert_roundtrips(NullDouble::new(v));
        }

        #[test]
        fn string_roundtrips(v in "[^\\x00]{1,32}".prop_filter("shares the null text form", |s| s != "null")) {
            assert_roundtrips(NullString::new(v));
        }

        #[test]
        fn blob_roundtrips(v in proptest::collection::vec(any::<u8>(), 1..64)) {
            assert_roundtrips(NullBlob::new(v));
        }

        #[test]
        fn uuid_roundtrips(v in any::<u128>()) {
            assert_roundtrips(NullUuid::new(Uuid::from_u128(v)));
        }

        #[test]
        fn timestamp_roundtrips(secs in -62_135_596_800i64..253_402_300_799i64, nanos in 0u32..1_000_000_000) {
            let ts = Utc.timestamp_opt(secs, nanos).unwrap();
            assert_roundtrips(NullTimestamp::new(ts));
        }
    }
}
