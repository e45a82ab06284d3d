//! SQLite database adapter implementation
//!
//! The connection host names a directory holding one `<database>.db` file per
//! logical database, or `:memory:` for private in-memory databases.

use super::{is_insert, ConnectParams};
use crate::database::adapter::{DatabaseAdapter, StatementOutcome};
use crate::database::dialects::DatabaseBackend;
use crate::database::result::FieldInfo;
use crate::database::types::{SqlValue, SqliteTypeConverter, TypeConverter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteStatement};
use sqlx::{Column, ConnectOptions, Executor, Statement, TypeInfo};
use std::path::PathBuf;
use std::str::FromStr;

/// Where database files live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteLocation {
    Memory,
    Directory(PathBuf),
}

impl SqliteLocation {
    pub fn from_host(host: &str) -> Self {
        match host.trim() {
            "" | ":memory:" | "memory" => SqliteLocation::Memory,
            dir => SqliteLocation::Directory(PathBuf::from(dir)),
        }
    }

    /// File backing `database`; `None` for in-memory databases
    pub fn file_for(&self, database: &str) -> Option<PathBuf> {
        match self {
            SqliteLocation::Memory => None,
            SqliteLocation::Directory(dir) => Some(dir.join(format!("{}.db", database))),
        }
    }
}

/// SQLite database adapter
pub struct SqliteAdapter {
    name: String,
    location: SqliteLocation,
    conn: SqliteConnection,
}

impl SqliteAdapter {
    /// Open `database` inside the location named by the host; the file must already exist
    pub async fn connect(
        name: impl Into<String>,
        params: &ConnectParams,
        database: Option<&str>,
    ) -> Result<Self> {
        let name = name.into();
        let location = SqliteLocation::from_host(&params.host);
        let conn = Self::open(&location, database, false).await?;

        log::info!(
            "SQLite connection '{}' opened ({:?}, database: {})",
            name,
            location,
            database.unwrap_or("<none>")
        );

        Ok(Self {
            name,
            location,
            conn,
        })
    }

    async fn open(
        location: &SqliteLocation,
        database: Option<&str>,
        create: bool,
    ) -> Result<SqliteConnection> {
        let options = match database.and_then(|db| location.file_for(db)) {
            Some(path) => SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(create),
            None => SqliteConnectOptions::from_str("sqlite::memory:")?,
        };

        options
            .connect()
            .await
            .map_err(|e| Error::connection(format!("Failed to open SQLite database: {}", e)))
    }

    fn describe(statement: &SqliteStatement<'_>) -> Vec<FieldInfo> {
        statement
            .columns()
            .iter()
            .map(|c| FieldInfo::new(c.name(), c.type_info().name()))
            .collect()
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn prepare(&mut self, sql: &str) -> Result<Vec<FieldInfo>> {
        log::debug!("SQLite PREPARE: {}", sql);
        let statement = self.conn.prepare(sql).await?;
        Ok(Self::describe(&statement))
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<StatementOutcome> {
        log::debug!("SQLite RUN: {}", sql);
        log::debug!("  Parameters: {:?}", params);

        let statement = self.conn.prepare(sql).await?;
        let fields = Self::describe(&statement);

        let mut query = statement.query();
        for param in params {
            query = SqliteTypeConverter::bind_param(query, param.clone());
        }

        if fields.is_empty() {
            let result = query.execute(&mut self.conn).await?;
            // last_insert_rowid survives UPDATE and DELETE
            let last_insert_id = match result.last_insert_rowid() {
                id if id != 0 && is_insert(sql) => Some(id),
                _ => None,
            };
            return Ok(StatementOutcome::write(result.rows_affected(), last_insert_id));
        }

        let rows = query.fetch_all(&mut self.conn).await?;
        let values = rows
            .iter()
            .map(SqliteTypeConverter::row_values)
            .collect::<Result<Vec<_>>>()?;
        Ok(StatementOutcome::rows(fields, values))
    }

    async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        log::debug!("SQLite EXECUTE: {}", sql);
        let result = sqlx::query(sql).persistent(false).execute(&mut self.conn).await?;
        Ok(result.rows_affected())
    }

    async fn create_database(&mut self, database: &str) -> Result<()> {
        if let Some(path) = self.location.file_for(database) {
            log::info!("Creating SQLite database file {}", path.display());
            // opening with create_if_missing writes the file
            Self::open(&self.location, Some(database), true).await?;
        }
        Ok(())
    }

    async fn use_database(&mut self, database: &str) -> Result<()> {
        if self.location.file_for(database).is_some() {
            self.conn = Self::open(&self.location, Some(database), false).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_host() {
        assert_eq!(SqliteLocation::from_host(":memory:"), SqliteLocation::Memory);
        assert_eq!(SqliteLocation::from_host(""), SqliteLocation::Memory);
        assert_eq!(
            SqliteLocation::from_host("/var/lib/pos").file_for("core_op"),
            Some(PathBuf::from("/var/lib/pos/core_op.db"))
        );
    }

    #[tokio::test]
    async fn test_missing_file_fails_without_creating() {
        let dir = tempfile::tempdir().unwrap();
        let params = ConnectParams::new(dir.path().to_string_lossy(), "", "");

        let result = SqliteAdapter::connect("trans", &params, Some("trans")).await;
        assert!(matches!(result, Err(Error::Connection(_))));
        assert!(!dir.path().join("trans.db").exists());
    }

    #[tokio::test]
    async fn test_create_then_use_database() {
        let dir = tempfile::tempdir().unwrap();
        let params = ConnectParams::new(dir.path().to_string_lossy(), "", "");

        let mut adapter = SqliteAdapter::connect("trans", &params, None).await.unwrap();
        adapter.create_database("trans").await.unwrap();
        adapter.use_database("trans").await.unwrap();
        adapter
            .execute_raw("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .unwrap();

        assert!(dir.path().join("trans.db").exists());
        let outcome = adapter
            .run("INSERT INTO t (name) VALUES (?)", &[SqlValue::from("a")])
            .await
            .unwrap();
        assert_eq!(outcome.rows_affected, 1);
        assert_eq!(outcome.last_insert_id, Some(1));
    }

    #[tokio::test]
    async fn test_select_reports_fields_and_rows() {
        let params = ConnectParams::new(":memory:", "", "");
        let mut adapter = SqliteAdapter::connect("mem", &params, Some("mem")).await.unwrap();
        adapter
            .execute_raw("CREATE TABLE p (upc VARCHAR(13), price DECIMAL(10,2))")
            .await
            .unwrap();
        adapter
            .execute_raw("INSERT INTO p VALUES ('0001', 1.5), ('0002', 2)")
            .await
            .unwrap();

        let outcome = adapter.run("SELECT upc, price FROM p ORDER BY upc", &[]).await.unwrap();
        assert_eq!(outcome.fields.len(), 2);
        assert_eq!(outcome.fields[0].name, "upc");
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.rows_affected, 2);
        assert_eq!(outcome.rows[0][0], SqlValue::from("0001"));
    }
}
