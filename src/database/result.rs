//! Materialized statement results
//!
//! Every successful statement produces a `ResultSet`: the field metadata the
//! driver reported plus all rows, decoded into `SqlValue` cells. Rows are read
//! forward with `fetch_row`/`fetch_object`; `data_seek` repositions the cursor
//! on backends that allow random access.

use super::dialects::DatabaseBackend;
use super::types::SqlValue;
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Per-column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    /// Lowercase engine type name (`int`, `varchar`, `money`, ...)
    pub type_name: String,
    /// Longest rendered value in the column; `None` until rows are known
    pub max_length: Option<i64>,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into().to_lowercase(),
            max_length: None,
        }
    }
}

/// One result row, addressable by position and by column name
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn get(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }

    /// Look a cell up by column name; exact match first, then case-insensitive
    pub fn get_by_name(&self, name: &str) -> Option<&SqlValue> {
        let position = self
            .columns
            .iter()
            .position(|c| c == name)
            .or_else(|| self.columns.iter().position(|c| c.eq_ignore_ascii_case(name)))?;
        self.values.get(position)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<SqlValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Row as a JSON object keyed by column name
    pub fn to_json(&self) -> JsonValue {
        let mut object = Map::with_capacity(self.values.len());
        for (column, value) in self.columns.iter().zip(&self.values) {
            object.insert(column.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }
}

/// Result of a successful statement
#[derive(Debug, Clone)]
pub struct ResultSet {
    backend: DatabaseBackend,
    fields: Vec<FieldInfo>,
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<SqlValue>>,
    cursor: usize,
    seekable: bool,
}

impl ResultSet {
    pub fn new(
        backend: DatabaseBackend,
        mut fields: Vec<FieldInfo>,
        rows: Vec<Vec<SqlValue>>,
        seekable: bool,
    ) -> Self {
        for (index, field) in fields.iter_mut().enumerate() {
            if field.max_length.is_none() {
                let longest = rows
                    .iter()
                    .filter_map(|row| row.get(index))
                    .map(SqlValue::display_len)
                    .max()
                    .unwrap_or(0);
                field.max_length = Some(longest as i64);
            }
        }
        let columns = Arc::new(fields.iter().map(|f| f.name.clone()).collect());

        Self {
            backend,
            fields,
            columns,
            rows,
            cursor: 0,
            seekable,
        }
    }

    /// Result of a statement that returned no columns
    pub fn empty(backend: DatabaseBackend, seekable: bool) -> Self {
        Self::new(backend, Vec::new(), Vec::new(), seekable)
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    pub fn fetch_field(&self, index: usize) -> Option<&FieldInfo> {
        self.fields.get(index)
    }

    pub fn field_type(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.type_name.as_str())
    }

    pub fn field_name(&self, index: usize) -> Option<&str> {
        self.fields.get(index).map(|f| f.name.as_str())
    }

    /// Next row, or `None` once the rows are exhausted
    pub fn fetch_row(&mut self) -> Option<Row> {
        let values = self.rows.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(Row {
            columns: Arc::clone(&self.columns),
            values,
        })
    }

    /// Next row as a JSON object keyed by column name
    pub fn fetch_object(&mut self) -> Option<JsonValue> {
        self.fetch_row().map(|row| row.to_json())
    }

    /// Move the cursor to `position`; `Ok(false)` when out of range
    pub fn data_seek(&mut self, position: usize) -> Result<bool> {
        if !self.seekable {
            return Err(Error::unsupported(self.backend.as_str(), "data_seek"));
        }
        if position >= self.rows.len() {
            return Ok(false);
        }
        self.cursor = position;
        Ok(true)
    }

    /// First cell of the first row
    pub fn scalar(&self) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.first())
    }

    /// All rows, independent of the cursor
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        self.rows.iter().map(|values| Row {
            columns: Arc::clone(&self.columns),
            values: values.clone(),
        })
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.fetch_row()
    }
}
