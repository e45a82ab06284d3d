//! Statement execution, status queries and transactions

use super::{display_name, SqlManager};
use crate::database::{FieldInfo, LastStatement, ResultSet, SqlValue};
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Positional parameters for `execute`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(pub Vec<SqlValue>);

impl Params {
    pub fn as_slice(&self) -> &[SqlValue] {
        &self.0
    }
}

impl From<Vec<SqlValue>> for Params {
    fn from(values: Vec<SqlValue>) -> Self {
        Params(values)
    }
}

impl From<&[SqlValue]> for Params {
    fn from(values: &[SqlValue]) -> Self {
        Params(values.to_vec())
    }
}

impl From<&Vec<SqlValue>> for Params {
    fn from(values: &Vec<SqlValue>) -> Self {
        Params(values.clone())
    }
}

/// A single value is treated as a one-element list
impl From<SqlValue> for Params {
    fn from(value: SqlValue) -> Self {
        Params(vec![value])
    }
}

impl From<()> for Params {
    fn from(_: ()) -> Self {
        Params::default()
    }
}

/// A statement prepared on one connection
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStatement {
    sql: String,
    connection: String,
    fields: Vec<FieldInfo>,
}

impl PreparedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Name of the connection it was prepared on
    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Result columns the server described; empty for writes
    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }
}

impl AsRef<str> for PreparedStatement {
    fn as_ref(&self) -> &str {
        &self.sql
    }
}

#[derive(Debug, Clone, Copy)]
enum TransactionStep {
    Begin,
    Commit,
    Rollback,
}

impl SqlManager {
    /// Run `sql` on the connection named `which` (`""` for the default)
    ///
    /// # Returns
    /// * `Ok(Some(result))` - The statement succeeded; writes give a result with no rows
    /// * `Ok(None)` - The statement failed and was logged
    /// * `Err(Error::QueryFailed)` - The statement failed while throw-on-failure is on
    pub async fn query(
        &mut self,
        sql: &str,
        which: &str,
        params: Option<&[SqlValue]>,
    ) -> Result<Option<ResultSet>> {
        match self.run_statement(sql, which, params.unwrap_or(&[])).await {
            Ok(result) => Ok(Some(result)),
            Err(e) => self.failure(sql, &e),
        }
    }

    async fn run_statement(
        &mut self,
        sql: &str,
        which: &str,
        params: &[SqlValue],
    ) -> Result<ResultSet> {
        let connection = self
            .registry
            .live_mut(which)
            .ok_or_else(|| Error::connection(format!("No database connection ({})", display_name(which))))?;

        let backend = connection.backend();
        let seekable = connection.supports_seek();
        let outcome = connection.run(sql, params).await?;
        log::debug!("{} [{}]: {} rows", connection.name(), backend, outcome.rows_affected);

        Ok(ResultSet::new(backend, outcome.fields, outcome.rows, seekable))
    }

    /// Run `sql` on every registered connection
    ///
    /// Unusable entries and failures map to `None`; this never raises.
    pub async fn query_all(&mut self, sql: &str) -> IndexMap<String, Option<ResultSet>> {
        let mut results = IndexMap::new();
        for name in self.registry.names() {
            let result = if self.registry.is_connected(&name) {
                match self.run_statement(sql, &name, &[]).await {
                    Ok(result) => Some(result),
                    Err(e) => {
                        self.log.record_failure(sql, &e.backend_message());
                        None
                    }
                }
            } else {
                None
            };
            results.insert(name, result);
        }
        results
    }

    /// Error text of the most recent statement on a connection
    pub fn error(&self, which: &str) -> String {
        match self.registry.live(which) {
            None => "No database connection".to_string(),
            Some(connection) => match connection.last_statement() {
                LastStatement::None => "No recent queries logged".to_string(),
                LastStatement::Succeeded => String::new(),
                LastStatement::Failed(message) => message.clone(),
            },
        }
    }

    /// Auto-increment value generated by the most recent insert
    pub fn insert_id(&self, which: &str) -> Option<i64> {
        self.registry
            .live(which)
            .and_then(|connection| connection.last_insert_id())
    }

    /// Rows changed by the most recent write, or returned by the most recent query
    pub fn affected_rows(&self, which: &str) -> u64 {
        self.registry
            .live(which)
            .map(|connection| connection.rows_affected())
            .unwrap_or(0)
    }

    /// Prepare `sql` on a connection; failures follow the same rules as `query`
    pub async fn prepare(&mut self, sql: &str, which: &str) -> Result<Option<PreparedStatement>> {
        let prepared = match self.registry.live_mut(which) {
            Some(connection) => {
                let name = connection.name().to_string();
                connection.prepare(sql).await.map(|fields| PreparedStatement {
                    sql: sql.to_string(),
                    connection: name,
                    fields,
                })
            }
            None => Err(Error::connection(format!(
                "No database connection ({})",
                display_name(which)
            ))),
        };

        match prepared {
            Ok(statement) => Ok(Some(statement)),
            Err(e) => self.failure(sql, &e),
        }
    }

    /// Run a statement (SQL text or a `PreparedStatement`) with positional parameters
    pub async fn execute(
        &mut self,
        statement: impl AsRef<str>,
        params: impl Into<Params>,
        which: &str,
    ) -> Result<Option<ResultSet>> {
        let params = params.into();
        self.query(statement.as_ref(), which, Some(params.as_slice()))
            .await
    }

    pub async fn start_transaction(&mut self, which: &str) -> Result<bool> {
        self.transaction_step(which, TransactionStep::Begin).await
    }

    pub async fn commit_transaction(&mut self, which: &str) -> Result<bool> {
        self.transaction_step(which, TransactionStep::Commit).await
    }

    pub async fn rollback_transaction(&mut self, which: &str) -> Result<bool> {
        self.transaction_step(which, TransactionStep::Rollback).await
    }

    async fn transaction_step(&mut self, which: &str, step: TransactionStep) -> Result<bool> {
        let Some(connection) = self.registry.live_mut(which) else {
            return Ok(false);
        };

        let dialect = connection.dialect();
        let (sql, result) = match step {
            TransactionStep::Begin => (dialect.begin_transaction(), connection.begin().await),
            TransactionStep::Commit => (dialect.commit_transaction(), connection.commit().await),
            TransactionStep::Rollback => {
                (dialect.rollback_transaction(), connection.rollback().await)
            }
        };

        match result {
            Ok(()) => Ok(true),
            Err(e) => self.failure::<()>(sql, &e).map(|_| false),
        }
    }
}
