//! SQLite-specific type converter implementation

use super::converter::TypeConverter;
use super::value::SqlValue;
use crate::error::{Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite, TypeInfo, ValueRef};

/// SQLite type converter
#[derive(Clone, Default)]
pub struct SqliteTypeConverter;

/// SQLite type affinity (https://www.sqlite.org/datatype3.html)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqliteAffinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl SqliteTypeConverter {
    /// Determine the affinity of a declared or storage type name
    pub fn type_affinity(type_name: &str) -> SqliteAffinity {
        let upper = type_name.to_uppercase();

        if upper.contains("INT") {
            SqliteAffinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            SqliteAffinity::Text
        } else if upper.contains("BLOB") || upper.is_empty() {
            SqliteAffinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            SqliteAffinity::Real
        } else {
            SqliteAffinity::Numeric
        }
    }

    /// Cells are dynamically typed, so try decodings in affinity order
    fn extract_by_affinity(
        row: &SqliteRow,
        index: usize,
        affinity: SqliteAffinity,
    ) -> Option<SqlValue> {
        let as_integer = || {
            row.try_get::<i64, _>(index).ok().map(|val| {
                if val >= i32::MIN as i64 && val <= i32::MAX as i64 {
                    SqlValue::Int(val as i32)
                } else {
                    SqlValue::BigInt(val)
                }
            })
        };
        let as_real = || row.try_get::<f64, _>(index).ok().map(SqlValue::Double);
        let as_text = || row.try_get::<String, _>(index).ok().map(SqlValue::String);
        let as_blob = || row.try_get::<Vec<u8>, _>(index).ok().map(SqlValue::Bytes);

        match affinity {
            SqliteAffinity::Integer => as_integer()
                .or_else(as_real)
                .or_else(as_text)
                .or_else(as_blob),
            SqliteAffinity::Real => as_real()
                .or_else(as_integer)
                .or_else(as_text)
                .or_else(as_blob),
            SqliteAffinity::Text => as_text()
                .or_else(as_integer)
                .or_else(as_real)
                .or_else(as_blob),
            SqliteAffinity::Blob => as_blob().or_else(as_text),
            SqliteAffinity::Numeric => as_integer()
                .or_else(as_real)
                .or_else(as_text)
                .or_else(as_blob),
        }
    }

    /// Bind a SqlValue to a SQLite query
    pub fn bind_param<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: SqlValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            SqlValue::Null => query.bind(None::<i32>),
            SqlValue::Bool(b) => query.bind(b as i32),

            SqlValue::TinyInt(i) => query.bind(i as i32),
            SqlValue::SmallInt(i) => query.bind(i as i32),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::BigInt(i) => query.bind(i),

            SqlValue::UnsignedTinyInt(i) => query.bind(i as i32),
            SqlValue::UnsignedSmallInt(i) => query.bind(i as i32),
            SqlValue::UnsignedInt(i) => query.bind(i as i64),
            SqlValue::UnsignedBigInt(i) => match i64::try_from(i) {
                Ok(v) => query.bind(v),
                Err(_) => query.bind(i.to_string()),
            },

            SqlValue::Float(f) => query.bind(f as f64),
            SqlValue::Double(f) => query.bind(f),
            SqlValue::Decimal(d) => query.bind(d.to_string()),

            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j.to_string()),

            SqlValue::String(s)
            | SqlValue::Enum(s)
            | SqlValue::Uuid(s)
            | SqlValue::Date(s)
            | SqlValue::Time(s)
            | SqlValue::DateTime(s) => query.bind(s),
        }
    }
}

impl TypeConverter for SqliteTypeConverter {
    type Row = SqliteRow;

    fn column_count(row: &SqliteRow) -> usize {
        row.len()
    }

    fn extract_column_value(row: &SqliteRow, index: usize) -> Result<SqlValue> {
        let affinity = {
            let raw = row.try_get_raw(index).map_err(|e| {
                Error::driver(format!("Failed to get raw value at column {}: {}", index, e))
            })?;
            if raw.is_null() {
                return Ok(SqlValue::Null);
            }
            Self::type_affinity(raw.type_info().name())
        };

        Self::extract_by_affinity(row, index, affinity).ok_or_else(|| {
            Error::driver(format!(
                "Failed to extract SQLite value at column {} ({:?} affinity)",
                index, affinity
            ))
        })
    }
}
