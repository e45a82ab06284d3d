//! Unified SQL value type for parameters and result cells
//!
//! Every adapter binds from and extracts into this enum so callers never see
//! driver-specific types.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Canonical text form for date-time cells
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Generic SQL value type for parameter binding and result extraction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,

    Bool(bool),

    // Integer variants
    TinyInt(i8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),

    // Unsigned integers (MySQL)
    UnsignedTinyInt(u8),
    UnsignedSmallInt(u16),
    UnsignedInt(u32),
    UnsignedBigInt(u64),

    Float(f32),
    Double(f64),
    Decimal(Decimal),

    String(String),

    Bytes(Vec<u8>),

    Enum(String),
    Uuid(String),
    Json(JsonValue),
    Date(String),     // "2024-01-15"
    Time(String),     // "14:30:00"
    DateTime(String), // "2024-01-15 10:30:00"
}

impl SqlValue {
    /// Check if this value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Convert to a boolean if possible
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(b) => Some(*b),
            SqlValue::String(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" => Some(true),
                "false" | "f" | "no" | "n" | "0" => Some(false),
                _ => None,
            },
            other => other.as_i64().map(|i| i != 0),
        }
    }

    /// Convert to an i64 if possible
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Bool(b) => Some(*b as i64),
            SqlValue::TinyInt(i) => Some(*i as i64),
            SqlValue::SmallInt(i) => Some(*i as i64),
            SqlValue::Int(i) => Some(*i as i64),
            SqlValue::BigInt(i) => Some(*i),
            SqlValue::UnsignedTinyInt(i) => Some(*i as i64),
            SqlValue::UnsignedSmallInt(i) => Some(*i as i64),
            SqlValue::UnsignedInt(i) => Some(*i as i64),
            SqlValue::UnsignedBigInt(i) => i64::try_from(*i).ok(),
            SqlValue::Decimal(d) if d.fract().is_zero() => d.to_i64(),
            SqlValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert to an f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Float(f) => Some(*f as f64),
            SqlValue::Double(f) => Some(*f),
            SqlValue::Decimal(d) => d.to_f64(),
            SqlValue::String(s) => s.trim().parse().ok(),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    /// Text form of the value; `None` for NULL and binary data
    pub fn as_string(&self) -> Option<String> {
        match self {
            SqlValue::Null | SqlValue::Bytes(_) => None,
            SqlValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            SqlValue::Json(j) => Some(j.to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(b) => JsonValue::Bool(*b),
            SqlValue::TinyInt(i) => JsonValue::Number((*i).into()),
            SqlValue::SmallInt(i) => JsonValue::Number((*i).into()),
            SqlValue::Int(i) => JsonValue::Number((*i).into()),
            SqlValue::BigInt(i) => JsonValue::Number((*i).into()),
            SqlValue::UnsignedTinyInt(i) => JsonValue::Number((*i).into()),
            SqlValue::UnsignedSmallInt(i) => JsonValue::Number((*i).into()),
            SqlValue::UnsignedInt(i) => JsonValue::Number((*i).into()),
            SqlValue::UnsignedBigInt(i) => JsonValue::Number((*i).into()),
            SqlValue::Float(f) => serde_json::Number::from_f64(*f as f64)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::Decimal(d) => JsonValue::String(d.to_string()),
            SqlValue::String(s)
            | SqlValue::Enum(s)
            | SqlValue::Uuid(s)
            | SqlValue::Date(s)
            | SqlValue::Time(s)
            | SqlValue::DateTime(s) => JsonValue::String(s.clone()),
            SqlValue::Json(j) => j.clone(),
            SqlValue::Bytes(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Length of the value when rendered as text, used for field max-length reporting
    pub fn display_len(&self) -> usize {
        match self {
            SqlValue::Null => 0,
            SqlValue::Bytes(b) => b.len(),
            other => other.as_string().map(|s| s.chars().count()).unwrap_or(0),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::TinyInt(i) => write!(f, "{}", i),
            SqlValue::SmallInt(i) => write!(f, "{}", i),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::BigInt(i) => write!(f, "{}", i),
            SqlValue::UnsignedTinyInt(i) => write!(f, "{}", i),
            SqlValue::UnsignedSmallInt(i) => write!(f, "{}", i),
            SqlValue::UnsignedInt(i) => write!(f, "{}", i),
            SqlValue::UnsignedBigInt(i) => write!(f, "{}", i),
            SqlValue::Float(fl) => write!(f, "{}", fl),
            SqlValue::Double(d) => write!(f, "{}", d),
            SqlValue::Decimal(d) => write!(f, "{}", d),
            SqlValue::String(s)
            | SqlValue::Enum(s)
            | SqlValue::Uuid(s)
            | SqlValue::Date(s)
            | SqlValue::Time(s)
            | SqlValue::DateTime(s) => write!(f, "{}", s),
            SqlValue::Json(j) => write!(f, "{}", j),
            SqlValue::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i8> for SqlValue {
    fn from(v: i8) -> Self {
        SqlValue::TinyInt(v)
    }
}

impl From<i16> for SqlValue {
    fn from(v: i16) -> Self {
        SqlValue::SmallInt(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::BigInt(v)
    }
}

impl From<u8> for SqlValue {
    fn from(v: u8) -> Self {
        SqlValue::UnsignedTinyInt(v)
    }
}

impl From<u16> for SqlValue {
    fn from(v: u16) -> Self {
        SqlValue::UnsignedSmallInt(v)
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::UnsignedInt(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::UnsignedBigInt(v)
    }
}

impl From<f32> for SqlValue {
    fn from(v: f32) -> Self {
        SqlValue::Float(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Double(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(d: Decimal) -> Self {
        SqlValue::Decimal(d)
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<&String> for SqlValue {
    fn from(s: &String) -> Self {
        SqlValue::String(s.clone())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(v)
    }
}

impl From<JsonValue> for SqlValue {
    fn from(v: JsonValue) -> Self {
        SqlValue::Json(v)
    }
}

impl<T> From<Option<T>> for SqlValue
where
    T: Into<SqlValue>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => SqlValue::Null,
        }
    }
}

impl From<chrono::NaiveDate> for SqlValue {
    fn from(date: chrono::NaiveDate) -> Self {
        SqlValue::Date(date.to_string())
    }
}

impl From<chrono::NaiveTime> for SqlValue {
    fn from(time: chrono::NaiveTime) -> Self {
        SqlValue::Time(time.to_string())
    }
}

impl From<chrono::NaiveDateTime> for SqlValue {
    fn from(dt: chrono::NaiveDateTime) -> Self {
        SqlValue::DateTime(dt.format(DATETIME_FORMAT).to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
    fn from(dt: chrono::DateTime<chrono::Utc>) -> Self {
        dt.naive_utc().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_numeric_coercions() {
        assert_eq!(SqlValue::from(7i32).as_i64(), Some(7));
        assert_eq!(SqlValue::from("42").as_i64(), Some(42));
        assert_eq!(SqlValue::from(u64::MAX).as_i64(), None);
        assert_eq!(SqlValue::from(2.5f64).as_f64(), Some(2.5));
        assert_eq!(SqlValue::Null.as_i64(), None);
    }

    #[test]
    fn test_as_bool_accepts_integers_and_words() {
        assert_eq!(SqlValue::from(1i64).as_bool(), Some(true));
        assert_eq!(SqlValue::from(0u8).as_bool(), Some(false));
        assert_eq!(SqlValue::from("yes").as_bool(), Some(true));
        assert_eq!(SqlValue::from("maybe").as_bool(), None);
    }

    #[test]
    fn test_datetime_uses_space_separated_form() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(15, 15, 0)
            .unwrap();
        assert_eq!(
            SqlValue::from(dt),
            SqlValue::DateTime("2024-01-05 15:15:00".to_string())
        );
    }

    #[test]
    fn test_display_len_counts_characters() {
        assert_eq!(SqlValue::from("héllo").display_len(), 5);
        assert_eq!(SqlValue::from(12345i32).display_len(), 5);
        assert_eq!(SqlValue::Null.display_len(), 0);
    }

    #[test]
    fn test_option_maps_none_to_null() {
        let value: SqlValue = Option::<i32>::None.into();
        assert!(value.is_null());
        assert_eq!(value.to_json(), JsonValue::Null);
    }
}
