//! Table metadata decoded from catalog queries

use super::dialects::SqlDialect;
use super::result::Row;
use super::types::SqlValue;
use indexmap::IndexMap;
use serde::Serialize;

/// A flag some engines cannot report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriState {
    True,
    False,
    Unknown,
}

impl TriState {
    /// Read a catalog flag cell; NULL means the engine could not tell
    pub fn from_value(value: Option<&SqlValue>) -> Self {
        match value {
            None | Some(SqlValue::Null) => TriState::Unknown,
            Some(v) => match v.as_i64().map(|n| n != 0).or_else(|| v.as_bool()) {
                Some(flag) => TriState::from(flag),
                None => TriState::Unknown,
            },
        }
    }

    pub fn is_true(self) -> bool {
        self == TriState::True
    }

    pub fn is_known(self) -> bool {
        self != TriState::Unknown
    }
}

impl From<bool> for TriState {
    fn from(flag: bool) -> Self {
        if flag {
            TriState::True
        } else {
            TriState::False
        }
    }
}

/// Column entry of a detailed table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    /// Declared type with its size baked in, e.g. `VARCHAR(30)` or `DECIMAL(10,2)`
    pub type_name: String,
    pub increment: TriState,
    pub primary_key: TriState,
    pub default: Option<String>,
}

/// Ordered column name -> definition
pub type TableSchema = IndexMap<String, ColumnDefinition>;

/// One row of a dialect's column catalog query
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogColumn {
    pub name: String,
    pub data_type: String,
    pub char_length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub unsigned: bool,
    pub identity: TriState,
    pub primary: TriState,
    pub raw_default: Option<String>,
}

impl CatalogColumn {
    pub fn from_row(row: &Row) -> Option<Self> {
        let text = |column: &str| row.get_by_name(column).and_then(cell_text);
        let number = |column: &str| row.get_by_name(column).and_then(SqlValue::as_i64);

        Some(Self {
            name: text("column_name")?,
            data_type: text("data_type").unwrap_or_default(),
            char_length: number("char_length"),
            precision: number("num_precision"),
            scale: number("num_scale"),
            unsigned: number("is_unsigned").map(|n| n != 0).unwrap_or(false),
            identity: TriState::from_value(row.get_by_name("is_identity")),
            primary: TriState::from_value(row.get_by_name("is_primary")),
            raw_default: text("column_default"),
        })
    }

    pub fn decorated_type(&self) -> String {
        decorate_type(
            &self.data_type,
            self.char_length,
            self.precision,
            self.scale,
            self.unsigned,
        )
    }

    pub fn definition(&self, dialect: &dyn SqlDialect) -> ColumnDefinition {
        ColumnDefinition {
            type_name: self.decorated_type(),
            increment: self.identity,
            primary_key: self.primary,
            default: self
                .raw_default
                .as_deref()
                .and_then(|raw| dialect.normalize_default(raw)),
        }
    }
}

/// Text of a catalog cell; some servers send catalog strings as binary
pub(crate) fn cell_text(value: &SqlValue) -> Option<String> {
    match value {
        SqlValue::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        other => other.as_string(),
    }
}

/// Uppercase a catalog type and attach its size where the size means something
pub fn decorate_type(
    data_type: &str,
    char_length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
    unsigned: bool,
) -> String {
    let base = data_type.trim().to_uppercase();

    // sized declarations and integer kinds stay as declared
    let mut decorated = if base.contains('(') || base.contains("INT") {
        base.clone()
    } else if base.ends_with("CHAR") || base.ends_with("BINARY") {
        match char_length {
            Some(len) if len > 0 => format!("{}({})", base, len),
            // SQL Server reports (max) widths as -1
            Some(-1) => format!("{}(MAX)", base),
            _ => base.clone(),
        }
    } else if base == "DECIMAL" || base == "NUMERIC" {
        match precision {
            Some(p) if p > 0 => format!("{}({},{})", base, p, scale.unwrap_or(0)),
            _ => base.clone(),
        }
    } else {
        base.clone()
    };

    if unsigned && !base.contains("UNSIGNED") {
        decorated.push_str(" UNSIGNED");
    }
    decorated
}
