//! MySQL-specific type converter implementation

use super::converter::TypeConverter;
use super::value::{SqlValue, DATETIME_FORMAT};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row, TypeInfo, ValueRef};

/// MySQL type converter
#[derive(Clone, Default)]
pub struct MySqlTypeConverter;

impl MySqlTypeConverter {
    /// TINYINT(1) may come back as bool from newer servers
    fn extract_tinyint(row: &MySqlRow, index: usize) -> Result<SqlValue> {
        if let Ok(val) = row.try_get::<i8, _>(index) {
            return Ok(SqlValue::TinyInt(val));
        }
        if let Ok(val) = row.try_get::<bool, _>(index) {
            log::trace!("TINYINT at index {} extracted as bool: {}", index, val);
            return Ok(SqlValue::TinyInt(val as i8));
        }
        Self::extract_fallback(row, index, "TINYINT")
    }

    fn extract_datetime(row: &MySqlRow, index: usize) -> Result<SqlValue> {
        if let Ok(dt) = row.try_get::<NaiveDateTime, _>(index) {
            return Ok(SqlValue::DateTime(dt.format(DATETIME_FORMAT).to_string()));
        }

        // TIMESTAMP columns decode as UTC
        if let Ok(dt) = row.try_get::<DateTime<Utc>, _>(index) {
            return Ok(SqlValue::DateTime(
                dt.naive_utc().format(DATETIME_FORMAT).to_string(),
            ));
        }

        // Zero dates and text-protocol rows arrive as strings
        if let Ok(s) = row.try_get::<String, _>(index) {
            return Ok(SqlValue::DateTime(s));
        }

        Self::extract_fallback(row, index, "DATETIME")
    }

    fn extract_date(row: &MySqlRow, index: usize) -> Result<SqlValue> {
        if let Ok(date) = row.try_get::<NaiveDate, _>(index) {
            return Ok(SqlValue::Date(date.to_string()));
        }
        Self::extract_fallback(row, index, "DATE")
    }

    fn extract_time(row: &MySqlRow, index: usize) -> Result<SqlValue> {
        if let Ok(time) = row.try_get::<NaiveTime, _>(index) {
            return Ok(SqlValue::Time(time.to_string()));
        }
        Self::extract_fallback(row, index, "TIME")
    }

    fn extract_decimal(row: &MySqlRow, index: usize) -> Result<SqlValue> {
        if let Ok(d) = row.try_get::<rust_decimal::Decimal, _>(index) {
            return Ok(SqlValue::Decimal(d));
        }

        if let Ok(s) = row.try_get::<String, _>(index) {
            if let Ok(d) = s.parse::<rust_decimal::Decimal>() {
                return Ok(SqlValue::Decimal(d));
            }
            return Ok(SqlValue::String(s));
        }

        if let Ok(f) = row.try_get::<f64, _>(index) {
            return Ok(SqlValue::Double(f));
        }

        Self::extract_fallback(row, index, "DECIMAL")
    }

    fn extract_unsigned(row: &MySqlRow, index: usize, type_name: &str) -> Result<SqlValue> {
        let value = if type_name.contains("TINYINT") {
            row.try_get::<u8, _>(index).map(SqlValue::UnsignedTinyInt)
        } else if type_name.contains("SMALLINT") {
            row.try_get::<u16, _>(index).map(SqlValue::UnsignedSmallInt)
        } else if type_name.contains("BIGINT") {
            row.try_get::<u64, _>(index).map(SqlValue::UnsignedBigInt)
        } else {
            row.try_get::<u32, _>(index).map(SqlValue::UnsignedInt)
        };

        match value {
            Ok(v) => Ok(v),
            Err(_) => Self::extract_fallback(row, index, type_name),
        }
    }

    /// Last resort for types the driver reports loosely (text protocol, expressions)
    fn extract_fallback(row: &MySqlRow, index: usize, type_name: &str) -> Result<SqlValue> {
        if let Ok(i) = row.try_get::<i64, _>(index) {
            return Ok(SqlValue::BigInt(i));
        }
        if let Ok(u) = row.try_get::<u64, _>(index) {
            return Ok(SqlValue::UnsignedBigInt(u));
        }
        if let Ok(f) = row.try_get::<f64, _>(index) {
            return Ok(SqlValue::Double(f));
        }
        if let Ok(s) = row.try_get::<String, _>(index) {
            return Ok(SqlValue::String(s));
        }
        if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
            return Ok(match String::from_utf8(bytes) {
                Ok(s) => SqlValue::String(s),
                Err(e) => SqlValue::Bytes(e.into_bytes()),
            });
        }

        Err(Error::driver(format!(
            "Failed to extract MySQL value of type '{}' at column {}",
            type_name, index
        )))
    }

    /// Bind a SqlValue to a MySQL query
    pub fn bind_param<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: SqlValue,
    ) -> Query<'q, MySql, MySqlArguments> {
        match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),

            SqlValue::TinyInt(i) => query.bind(i),
            SqlValue::SmallInt(i) => query.bind(i),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::BigInt(i) => query.bind(i),

            SqlValue::UnsignedTinyInt(i) => query.bind(i),
            SqlValue::UnsignedSmallInt(i) => query.bind(i),
            SqlValue::UnsignedInt(i) => query.bind(i),
            SqlValue::UnsignedBigInt(i) => query.bind(i),

            SqlValue::Float(f) => query.bind(f),
            SqlValue::Double(f) => query.bind(f),
            SqlValue::Decimal(d) => query.bind(d),

            SqlValue::String(s) | SqlValue::Enum(s) | SqlValue::Uuid(s) => query.bind(s),
            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j),

            SqlValue::Date(s) => match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                Ok(date) => query.bind(date),
                Err(_) => query.bind(s),
            },
            SqlValue::Time(s) => match NaiveTime::parse_from_str(&s, "%H:%M:%S%.f") {
                Ok(time) => query.bind(time),
                Err(_) => query.bind(s),
            },
            SqlValue::DateTime(s) => match NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT) {
                Ok(ndt) => query.bind(ndt),
                Err(_) => query.bind(s),
            },
        }
    }
}

impl TypeConverter for MySqlTypeConverter {
    type Row = MySqlRow;

    fn column_count(row: &MySqlRow) -> usize {
        row.len()
    }

    fn extract_column_value(row: &MySqlRow, index: usize) -> Result<SqlValue> {
        let raw = row.try_get_raw(index).map_err(|e| {
            Error::driver(format!("Failed to get raw value at column {}: {}", index, e))
        })?;
        if raw.is_null() {
            return Ok(SqlValue::Null);
        }

        let column = row.column(index);
        let type_info = column.type_info();
        let type_name = type_info.name();

        match type_name {
            "BOOLEAN" | "BOOL" | "TINYINT" => Self::extract_tinyint(row, index),
            "SMALLINT" | "YEAR" => match row.try_get::<i16, _>(index) {
                Ok(v) => Ok(SqlValue::SmallInt(v)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "MEDIUMINT" | "INT" | "INTEGER" => match row.try_get::<i32, _>(index) {
                Ok(v) => Ok(SqlValue::Int(v)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "BIGINT" => match row.try_get::<i64, _>(index) {
                Ok(v) => Ok(SqlValue::BigInt(v)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "FLOAT" => match row.try_get::<f32, _>(index) {
                Ok(v) => Ok(SqlValue::Float(v)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "DOUBLE" | "REAL" => match row.try_get::<f64, _>(index) {
                Ok(v) => Ok(SqlValue::Double(v)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "DECIMAL" | "NUMERIC" => Self::extract_decimal(row, index),
            "JSON" => match row.try_get::<JsonValue, _>(index) {
                Ok(v) => Ok(SqlValue::Json(v)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "DATE" => Self::extract_date(row, index),
            "TIME" => Self::extract_time(row, index),
            "DATETIME" | "TIMESTAMP" => Self::extract_datetime(row, index),
            "ENUM" | "SET" => match row.try_get::<String, _>(index) {
                Ok(s) => Ok(SqlValue::Enum(s)),
                Err(_) => Self::extract_fallback(row, index, type_name),
            },
            "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
                match row.try_get::<Vec<u8>, _>(index) {
                    Ok(bytes) => Ok(SqlValue::Bytes(bytes)),
                    Err(_) => Self::extract_fallback(row, index, type_name),
                }
            }
            name if name.contains("UNSIGNED") => Self::extract_unsigned(row, index, name),
            _ => Self::extract_fallback(row, index, type_name),
        }
    }
}
