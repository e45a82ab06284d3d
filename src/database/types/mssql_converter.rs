//! SQL Server type converter implementation (tiberius rows)

use super::converter::TypeConverter;
use super::value::{SqlValue, DATETIME_FORMAT};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tiberius::numeric::Numeric;
use tiberius::{ColumnType, Query, Row};

/// SQL Server type converter
#[derive(Clone, Default)]
pub struct MssqlTypeConverter;

impl MssqlTypeConverter {
    /// Lowercase SQL Server type name for a TDS column type
    pub fn column_type_name(column_type: &ColumnType) -> &'static str {
        match column_type {
            ColumnType::Null => "null",
            ColumnType::Int1 => "tinyint",
            ColumnType::Int2 => "smallint",
            ColumnType::Int4 | ColumnType::Intn => "int",
            ColumnType::Int8 => "bigint",
            ColumnType::Float4 => "real",
            ColumnType::Float8 | ColumnType::Floatn => "float",
            ColumnType::Decimaln => "decimal",
            ColumnType::Numericn => "numeric",
            ColumnType::Money => "money",
            ColumnType::Money4 => "smallmoney",
            ColumnType::Bit | ColumnType::Bitn => "bit",
            ColumnType::BigVarChar => "varchar",
            ColumnType::BigChar => "char",
            ColumnType::NVarchar => "nvarchar",
            ColumnType::NChar => "nchar",
            ColumnType::Text => "text",
            ColumnType::NText => "ntext",
            ColumnType::BigVarBin => "varbinary",
            ColumnType::BigBinary => "binary",
            ColumnType::Image => "image",
            ColumnType::Datetime | ColumnType::Datetimen => "datetime",
            ColumnType::Datetime2 => "datetime2",
            ColumnType::Datetime4 => "smalldatetime",
            ColumnType::Daten => "date",
            ColumnType::Timen => "time",
            ColumnType::DatetimeOffsetn => "datetimeoffset",
            ColumnType::Guid => "uniqueidentifier",
            ColumnType::Xml => "xml",
            _ => "sql_variant",
        }
    }

    fn extract_integer(row: &Row, index: usize) -> Option<SqlValue> {
        // Intn columns carry whichever width the value needs
        row.try_get::<i64, _>(index)
            .ok()
            .flatten()
            .map(SqlValue::BigInt)
            .or_else(|| row.try_get::<i32, _>(index).ok().flatten().map(SqlValue::Int))
            .or_else(|| {
                row.try_get::<i16, _>(index)
                    .ok()
                    .flatten()
                    .map(SqlValue::SmallInt)
            })
            .or_else(|| {
                row.try_get::<u8, _>(index)
                    .ok()
                    .flatten()
                    .map(SqlValue::UnsignedTinyInt)
            })
    }

    fn extract_float(row: &Row, index: usize) -> Option<SqlValue> {
        row.try_get::<f64, _>(index)
            .ok()
            .flatten()
            .map(SqlValue::Double)
            .or_else(|| row.try_get::<f32, _>(index).ok().flatten().map(SqlValue::Float))
    }

    fn extract_numeric(row: &Row, index: usize) -> Option<SqlValue> {
        row.try_get::<Numeric, _>(index).ok().flatten().map(|n| {
            match n.to_string().parse::<rust_decimal::Decimal>() {
                Ok(d) => SqlValue::Decimal(d),
                Err(_) => SqlValue::Double(f64::from(n)),
            }
        })
    }

    fn extract_text(row: &Row, index: usize) -> Option<SqlValue> {
        row.try_get::<&str, _>(index)
            .ok()
            .flatten()
            .map(|s| SqlValue::String(s.to_string()))
    }

    fn extract_datetime(row: &Row, index: usize) -> Option<SqlValue> {
        row.try_get::<NaiveDateTime, _>(index)
            .ok()
            .flatten()
            .map(|dt| SqlValue::DateTime(dt.format(DATETIME_FORMAT).to_string()))
    }

    /// Bind a SqlValue to a tiberius query
    pub fn bind_param(query: &mut Query<'_>, value: SqlValue) {
        match value {
            SqlValue::Null => query.bind(Option::<String>::None),
            SqlValue::Bool(b) => query.bind(b),

            SqlValue::TinyInt(i) => query.bind(i as i16),
            SqlValue::SmallInt(i) => query.bind(i),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::BigInt(i) => query.bind(i),

            SqlValue::UnsignedTinyInt(i) => query.bind(i),
            SqlValue::UnsignedSmallInt(i) => query.bind(i as i32),
            SqlValue::UnsignedInt(i) => query.bind(i as i64),
            SqlValue::UnsignedBigInt(i) => match i64::try_from(i) {
                Ok(v) => query.bind(v),
                Err(_) => query.bind(i.to_string()),
            },

            SqlValue::Float(f) => query.bind(f),
            SqlValue::Double(f) => query.bind(f),
            // Implicit nvarchar -> decimal conversion keeps full precision
            SqlValue::Decimal(d) => query.bind(d.to_string()),

            SqlValue::Bytes(b) => query.bind(b),
            SqlValue::Json(j) => query.bind(j.to_string()),
            SqlValue::String(s) | SqlValue::Enum(s) | SqlValue::Uuid(s) => query.bind(s),

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

impl TypeConverter for MssqlTypeConverter {
    type Row = Row;

    fn column_count(row: &Row) -> usize {
        row.len()
    }

    fn extract_column_value(row: &Row, index: usize) -> Result<SqlValue> {
        let column_type = row
            .columns()
            .get(index)
            .map(|c| c.column_type())
            .ok_or_else(|| Error::driver(format!("Column index {} out of bounds", index)))?;

        let value = match column_type {
            ColumnType::Null => return Ok(SqlValue::Null),
            ColumnType::Int1
            | ColumnType::Int2
            | ColumnType::Int4
            | ColumnType::Int8
            | ColumnType::Intn => Self::extract_integer(row, index),
            ColumnType::Float4 | ColumnType::Float8 | ColumnType::Floatn => {
                Self::extract_float(row, index)
            }
            ColumnType::Decimaln | ColumnType::Numericn => Self::extract_numeric(row, index),
            ColumnType::Money | ColumnType::Money4 => Self::extract_float(row, index),
            ColumnType::Bit | ColumnType::Bitn => {
                row.try_get::<bool, _>(index).ok().flatten().map(SqlValue::Bool)
            }
            ColumnType::Datetime
            | ColumnType::Datetime2
            | ColumnType::Datetimen
            | ColumnType::Datetime4 => Self::extract_datetime(row, index),
            ColumnType::DatetimeOffsetn => row
                .try_get::<DateTime<Utc>, _>(index)
                .ok()
                .flatten()
                .map(SqlValue::from),
            ColumnType::Daten => row
                .try_get::<NaiveDate, _>(index)
                .ok()
                .flatten()
                .map(SqlValue::from),
            ColumnType::Timen => row
                .try_get::<NaiveTime, _>(index)
                .ok()
                .flatten()
                .map(SqlValue::from),
            ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => row
                .try_get::<&[u8], _>(index)
                .ok()
                .flatten()
                .map(|b| SqlValue::Bytes(b.to_vec())),
            ColumnType::Guid => row
                .try_get::<tiberius::Uuid, _>(index)
                .ok()
                .flatten()
                .map(|u| SqlValue::Uuid(u.to_string())),
            ColumnType::Xml => row
                .try_get::<&tiberius::xml::XmlData, _>(index)
                .ok()
                .flatten()
                .map(|xml| SqlValue::String(xml.to_owned().into_string())),
            _ => Self::extract_text(row, index),
        };

        // A failed or empty decode is a NULL cell
        Ok(value.unwrap_or(SqlValue::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_names() {
        assert_eq!(MssqlTypeConverter::column_type_name(&ColumnType::Int4), "int");
        assert_eq!(MssqlTypeConverter::column_type_name(&ColumnType::Money), "money");
        assert_eq!(MssqlTypeConverter::column_type_name(&ColumnType::NVarchar), "nvarchar");
        assert_eq!(MssqlTypeConverter::column_type_name(&ColumnType::Datetimen), "datetime");
        assert_eq!(MssqlTypeConverter::column_type_name(&ColumnType::Bitn), "bit");
    }
}
