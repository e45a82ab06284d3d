//! Unified type system for database operations
//!
//! Parameters and result cells cross the adapter boundary as `SqlValue`;
//! each backend has a converter that maps its driver rows and bind types.

pub mod converter;
pub mod mssql_converter;
pub mod mysql_converter;
pub mod sqlite_converter;
pub mod value;

// Re-export the main types
pub use converter::TypeConverter;
pub use mssql_converter::MssqlTypeConverter;
pub use mysql_converter::MySqlTypeConverter;
pub use sqlite_converter::{SqliteAffinity, SqliteTypeConverter};
pub use value::{SqlValue, DATETIME_FORMAT};
