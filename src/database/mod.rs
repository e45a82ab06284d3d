//! Multi-database support for sqlbridge
//!
//! Adapters wrap one driver connection each, dialects turn abstract
//! operations into engine SQL, and the registry keeps named connections.

pub mod adapter;
pub mod adapters;
pub mod dialects;
pub mod registry;
pub mod result;
pub mod schema;
pub mod types;

pub use adapter::{DatabaseAdapter, StatementOutcome};
pub use adapters::{ConnectParams, MssqlAdapter, MySqlAdapter, SqliteAdapter};
pub use dialects::{DatabaseBackend, MssqlDialect, MySqlDialect, SqlDialect, SqliteDialect};
pub use registry::{
    ConnectRequest, Connection, ConnectionRegistry, LastStatement, RegistryStats, Slot,
};
pub use result::{FieldInfo, ResultSet, Row};
pub use schema::{ColumnDefinition, TableSchema, TriState};
pub use types::{SqlValue, TypeConverter};
