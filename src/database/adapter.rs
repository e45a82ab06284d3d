//! Database adapter trait for multi-backend support
//!
//! An adapter owns exactly one driver connection. The registry stores adapters
//! as `Box<dyn DatabaseAdapter>` so the manager can run the same operations
//! against MySQL, SQL Server and SQLite.

use crate::database::dialects::{DatabaseBackend, SqlDialect};
use crate::database::result::FieldInfo;
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Everything a single statement produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementOutcome {
    /// Column metadata; empty for statements that return no rows
    pub fields: Vec<FieldInfo>,
    pub rows: Vec<Vec<SqlValue>>,
    /// Rows changed by a write, or rows returned by a query
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

impl StatementOutcome {
    /// Outcome of a row-returning statement
    pub fn rows(fields: Vec<FieldInfo>, rows: Vec<Vec<SqlValue>>) -> Self {
        let rows_affected = rows.len() as u64;
        Self {
            fields,
            rows,
            rows_affected,
            last_insert_id: None,
        }
    }

    /// Outcome of a write
    pub fn write(rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows_affected,
            last_insert_id,
            ..Self::default()
        }
    }
}

/// Unified database adapter trait
///
/// Statements use `?` markers for positional parameters on every backend;
/// adapters rewrite them when the driver expects another syntax.
#[async_trait]
pub trait DatabaseAdapter: Send {
    /// Logical name this connection is registered under
    fn name(&self) -> &str;

    fn backend(&self) -> DatabaseBackend;

    fn dialect(&self) -> &'static dyn SqlDialect {
        self.backend().dialect()
    }

    /// Whether result sets from this backend allow `data_seek`
    fn supports_seek(&self) -> bool {
        true
    }

    /// Prepare a statement server-side and describe its result columns
    async fn prepare(&mut self, sql: &str) -> Result<Vec<FieldInfo>>;

    /// Run a statement with positional parameters
    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<StatementOutcome>;

    /// Run a statement as plain text with no parameters; returns rows affected
    async fn execute_raw(&mut self, sql: &str) -> Result<u64>;

    async fn begin(&mut self) -> Result<()> {
        let sql = self.dialect().begin_transaction();
        self.execute_raw(sql).await.map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        let sql = self.dialect().commit_transaction();
        self.execute_raw(sql).await.map(|_| ())
    }

    async fn rollback(&mut self) -> Result<()> {
        let sql = self.dialect().rollback_transaction();
        self.execute_raw(sql).await.map(|_| ())
    }

    /// Create a database on the server this adapter is connected to
    async fn create_database(&mut self, database: &str) -> Result<()> {
        match self.dialect().create_database(database) {
            Some(sql) => self.execute_raw(&sql).await.map(|_| ()),
            None => Err(Error::unsupported(self.backend().as_str(), "create database")),
        }
    }

    /// Switch the session to `database`
    async fn use_database(&mut self, database: &str) -> Result<()> {
        match self.dialect().use_database(database) {
            Some(sql) => self.execute_raw(&sql).await.map(|_| ()),
            None => Err(Error::unsupported(self.backend().as_str(), "use database")),
        }
    }
}
