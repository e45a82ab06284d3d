//! MySQL database adapter implementation

use super::ConnectParams;
use crate::database::adapter::{DatabaseAdapter, StatementOutcome};
use crate::database::dialects::DatabaseBackend;
use crate::database::result::FieldInfo;
use crate::database::types::{MySqlTypeConverter, SqlValue, TypeConverter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError, MySqlStatement};
use sqlx::{Column, ConnectOptions, Either, Executor, Statement, TypeInfo};

/// "This command is not supported in the prepared statement protocol yet"
const ER_UNSUPPORTED_PS: u16 = 1295;

/// MySQL database adapter
pub struct MySqlAdapter {
    name: String,
    conn: MySqlConnection,
}

impl MySqlAdapter {
    /// Connect to a MySQL server, selecting `database` when given
    pub async fn connect(
        name: impl Into<String>,
        params: &ConnectParams,
        database: Option<&str>,
    ) -> Result<Self> {
        let name = name.into();
        let (host, port) = params.host_and_port(3306);

        let mut options = MySqlConnectOptions::new()
            .host(&host)
            .port(port)
            .username(&params.user);
        if !params.password.is_empty() {
            options = options.password(&params.password);
        }
        if let Some(database) = database {
            options = options.database(database);
        }

        let conn = options.connect().await.map_err(|e| {
            Error::connection(format!("Failed to connect to MySQL at {}:{}: {}", host, port, e))
        })?;

        log::info!(
            "MySQL connection '{}' opened on {}:{} (database: {})",
            name,
            host,
            port,
            database.unwrap_or("<none>")
        );

        Ok(Self { name, conn })
    }

    fn describe(statement: &MySqlStatement<'_>) -> Vec<FieldInfo> {
        statement
            .columns()
            .iter()
            .map(|c| FieldInfo::new(c.name(), c.type_info().name()))
            .collect()
    }

    fn is_unsupported_prepare(err: &sqlx::Error) -> bool {
        err.as_database_error()
            .and_then(|e| e.try_downcast_ref::<MySqlDatabaseError>())
            .map(|e| e.number() == ER_UNSUPPORTED_PS)
            .unwrap_or(false)
    }

    /// Run a statement over the text protocol
    async fn run_text(&mut self, sql: &str) -> Result<StatementOutcome> {
        let mut fields = Vec::new();
        let mut rows = Vec::new();
        let mut rows_affected = 0;
        let mut last_insert_id = None;

        let mut stream = sqlx::raw_sql(sql).fetch_many(&mut self.conn);
        while let Some(item) = stream.try_next().await? {
            match item {
                Either::Left(done) => {
                    rows_affected += done.rows_affected();
                    if done.last_insert_id() > 0 {
                        last_insert_id = Some(done.last_insert_id() as i64);
                    }
                }
                Either::Right(row) => {
                    if fields.is_empty() {
                        fields = sqlx::Row::columns(&row)
                            .iter()
                            .map(|c| FieldInfo::new(c.name(), c.type_info().name()))
                            .collect();
                    }
                    log::trace!("MySQL text row with {} columns", fields.len());
                    rows.push(MySqlTypeConverter::row_values(&row)?);
                }
            }
        }

        if fields.is_empty() {
            Ok(StatementOutcome::write(rows_affected, last_insert_id))
        } else {
            Ok(StatementOutcome::rows(fields, rows))
        }
    }
}

#[async_trait]
impl DatabaseAdapter for MySqlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
    }

    async fn prepare(&mut self, sql: &str) -> Result<Vec<FieldInfo>> {
        log::debug!("MySQL PREPARE: {}", sql);
        match self.conn.prepare(sql).await {
            Ok(statement) => Ok(Self::describe(&statement)),
            // runs over the text protocol later
            Err(e) if Self::is_unsupported_prepare(&e) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<StatementOutcome> {
        log::debug!("MySQL RUN: {}", sql);
        log::debug!("  Parameters: {:?}", params);

        let statement = match self.conn.prepare(sql).await {
            Ok(statement) => statement,
            Err(e) if params.is_empty() && Self::is_unsupported_prepare(&e) => {
                log::debug!("Statement not preparable, using text protocol");
                return self.run_text(sql).await;
            }
            Err(e) => return Err(e.into()),
        };

        let fields = Self::describe(&statement);
        let mut query = statement.query();
        for param in params {
            query = MySqlTypeConverter::bind_param(query, param.clone());
        }

        if fields.is_empty() {
            let result = query.execute(&mut self.conn).await?;
            let last_insert_id = match result.last_insert_id() {
                0 => None,
                id => Some(id as i64),
            };
            return Ok(StatementOutcome::write(result.rows_affected(), last_insert_id));
        }

        let rows = query.fetch_all(&mut self.conn).await?;
        let values = rows
            .iter()
            .map(MySqlTypeConverter::row_values)
            .collect::<Result<Vec<_>>>()?;
        Ok(StatementOutcome::rows(fields, values))
    }

    /// USE cannot be prepared, so this always goes over the text protocol
    async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        log::debug!("MySQL EXECUTE: {}", sql);
        let outcome = self.run_text(sql).await?;
        Ok(outcome.rows_affected)
    }
}
