//! Row conversion trait
//!
//! Each adapter owns a converter that turns one driver row into the unified
//! `SqlValue` cells carried by a `ResultSet`.

use super::value::SqlValue;
use crate::error::Result;

/// Trait for database-specific row extraction
pub trait TypeConverter {
    /// Driver row type this converter understands
    type Row;

    /// Number of cells in a row
    fn column_count(row: &Self::Row) -> usize;

    /// Extract a single cell and convert it to a `SqlValue`
    fn extract_column_value(row: &Self::Row, index: usize) -> Result<SqlValue>;

    /// Convert every cell of a row, in column order
    fn row_values(row: &Self::Row) -> Result<Vec<SqlValue>> {
        (0..Self::column_count(row))
            .map(|index| Self::extract_column_value(row, index))
            .collect()
    }
}
