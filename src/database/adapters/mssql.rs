//! SQL Server database adapter implementation (tiberius over tokio TCP)

use super::{is_insert, leading_keyword, ConnectParams};
use crate::database::adapter::{DatabaseAdapter, StatementOutcome};
use crate::database::dialects::{
    bind_placeholders, count_placeholders, DatabaseBackend, MssqlDialect,
};
use crate::database::result::FieldInfo;
use crate::database::types::{MssqlTypeConverter, SqlValue, TypeConverter};
use crate::error::{Error, Result};
use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

/// Statements whose first keyword produces a result set
const ROW_KEYWORDS: [&str; 4] = ["SELECT", "WITH", "EXEC", "EXECUTE"];

/// Statements that change session state and must run as a plain batch
const SESSION_KEYWORDS: [&str; 6] = ["USE", "SET", "BEGIN", "COMMIT", "ROLLBACK", "SAVE"];

/// SQL Server database adapter
pub struct MssqlAdapter {
    name: String,
    client: Client<Compat<TcpStream>>,
}

impl MssqlAdapter {
    /// Connect to a SQL Server instance, selecting `database` when given
    pub async fn connect(
        name: impl Into<String>,
        params: &ConnectParams,
        database: Option<&str>,
    ) -> Result<Self> {
        let name = name.into();
        let (host, port) = params.host_and_port(1433);

        let mut config = Config::new();
        config.host(&host);
        config.port(port);
        config.authentication(AuthMethod::sql_server(&params.user, &params.password));
        config.trust_cert();
        config.encryption(EncryptionLevel::Off);
        if let Some(database) = database {
            config.database(database);
        }

        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            Error::connection(format!("Failed to reach SQL Server at {}:{}: {}", host, port, e))
        })?;
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| Error::connection(format!("SQL Server login failed: {}", e)))?;

        log::info!(
            "SQL Server connection '{}' opened on {}:{} (database: {})",
            name,
            host,
            port,
            database.unwrap_or("<none>")
        );

        Ok(Self { name, client })
    }

    fn returns_rows(sql: &str) -> bool {
        let first = leading_keyword(sql);
        ROW_KEYWORDS.iter().any(|k| first.eq_ignore_ascii_case(k))
    }

    // sp_executesql scopes USE and SET to the call
    fn changes_session(sql: &str) -> bool {
        let first = leading_keyword(sql);
        SESSION_KEYWORDS.iter().any(|k| first.eq_ignore_ascii_case(k))
    }

    /// Identity generated by the last insert on this session
    async fn last_identity(&mut self) -> Result<Option<i64>> {
        let row = self
            .client
            .simple_query("SELECT CAST(@@IDENTITY AS BIGINT)")
            .await?
            .into_row()
            .await?;
        Ok(row.and_then(|r| r.try_get::<i64, _>(0).ok().flatten()))
    }

    /// `@params` argument declaring `@P1..@Pn` for server-side describe
    fn parameter_declarations(count: usize) -> Option<String> {
        if count == 0 {
            return None;
        }
        Some(
            (1..=count)
                .map(|i| format!("@P{} sql_variant", i))
                .collect::<Vec<_>>()
                .join(", "),
        )
    }

    fn build_query<'a>(sql: String, params: &[SqlValue]) -> Query<'a> {
        let mut query = Query::new(sql);
        for param in params {
            MssqlTypeConverter::bind_param(&mut query, param.clone());
        }
        query
    }
}

#[async_trait]
impl DatabaseAdapter for MssqlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Mssql
    }

    /// TDS streams are forward-only
    fn supports_seek(&self) -> bool {
        false
    }

    async fn prepare(&mut self, sql: &str) -> Result<Vec<FieldInfo>> {
        let declarations = Self::parameter_declarations(count_placeholders(sql, false));
        let sql = bind_placeholders(sql, &MssqlDialect);
        log::debug!("SQL Server PREPARE: {}", sql);

        let rows = self
            .client
            .query(
                "EXEC sp_describe_first_result_set @tsql = @P1, @params = @P2",
                &[&sql.as_str(), &declarations.as_deref()],
            )
            .await?
            .into_first_result()
            .await?;

        Ok(rows
            .iter()
            .filter_map(|row| {
                let name = row.try_get::<&str, _>("name").ok().flatten()?;
                let type_name = row
                    .try_get::<&str, _>("system_type_name")
                    .ok()
                    .flatten()
                    .unwrap_or("sql_variant");
                // "varchar(20)" -> "varchar"
                let base = type_name.split('(').next().unwrap_or(type_name);
                Some(FieldInfo::new(name, base))
            })
            .collect())
    }

    async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<StatementOutcome> {
        if params.is_empty() && Self::changes_session(sql) {
            self.execute_raw(sql).await?;
            return Ok(StatementOutcome::write(0, None));
        }

        let text = bind_placeholders(sql, &MssqlDialect);
        log::debug!("SQL Server RUN: {}", text);
        log::debug!("  Parameters: {:?}", params);

        let query = Self::build_query(text, params);

        if !Self::returns_rows(sql) {
            let result = query.execute(&mut self.client).await?;
            let last_insert_id = if is_insert(sql) {
                self.last_identity().await?
            } else {
                None
            };
            return Ok(StatementOutcome::write(result.total(), last_insert_id));
        }

        let mut stream = query.query(&mut self.client).await?;
        let fields: Vec<FieldInfo> = stream
            .columns()
            .await?
            .map(|columns| {
                columns
                    .iter()
                    .map(|c| {
                        FieldInfo::new(
                            c.name(),
                            MssqlTypeConverter::column_type_name(&c.column_type()),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        let rows = stream.into_first_result().await?;
        log::trace!("SQL Server returned {} rows", rows.len());
        let values = rows
            .iter()
            .map(MssqlTypeConverter::row_values)
            .collect::<Result<Vec<_>>>()?;

        Ok(StatementOutcome::rows(fields, values))
    }

    /// Sent as a SQL batch so USE and transaction statements outlive the call
    async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        log::debug!("SQL Server BATCH: {}", sql);
        self.client.simple_query(sql).await?.into_results().await?;
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_classification() {
        assert!(MssqlAdapter::returns_rows("  select 1"));
        assert!(MssqlAdapter::returns_rows("WITH x AS (SELECT 1 a) SELECT a FROM x"));
        assert!(MssqlAdapter::returns_rows("EXEC sp_who"));
        assert!(!MssqlAdapter::returns_rows("UPDATE t SET a = 1"));
        assert!(MssqlAdapter::changes_session("USE [core_trans]"));
        assert!(MssqlAdapter::changes_session("begin transaction"));
        assert!(MssqlAdapter::changes_session("SET DATEFIRST 7"));
        assert!(!MssqlAdapter::changes_session("SELECT 1"));
        assert!(!MssqlAdapter::changes_session("UPDATE t SET a = 1"));
    }

    #[test]
    fn test_parameter_declarations() {
        assert_eq!(MssqlAdapter::parameter_declarations(0), None);
        assert_eq!(
            MssqlAdapter::parameter_declarations(2).as_deref(),
            Some("@P1 sql_variant, @P2 sql_variant")
        );
    }
}
