//! sqlbridge - A cross-database SQL manager
//!
//! sqlbridge keeps named connections to MySQL, SQL Server and SQLite
//! databases behind one facade, with:
//! - A connection registry with create-on-missing bootstrap
//! - Dialect translation of dates, limits, concatenation and quoting
//! - Schema introspection through each engine's catalog
//! - Schema-aware inserts/updates and cross-connection table transfer
//! - A query failure log with optional throw-on-failure

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

#[cfg(feature = "config")]
pub mod config;
pub mod database;
pub mod error;
pub mod manager;

// Re-export main types for public API
#[cfg(feature = "config")]
pub use config::{ConnectionConfig, ManagerConfig};
pub use database::{
    ColumnDefinition, ConnectRequest, DatabaseBackend, FieldInfo, ResultSet, Row, SqlValue,
    TableSchema, TriState,
};
pub use error::{Error, QueryLog, Result};
pub use manager::{clean_date_time, Params, PreparedStatement, SqlManager};
