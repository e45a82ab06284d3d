//! Database adapter implementations for different database backends

pub mod mssql;
pub mod mysql;
pub mod sqlite;

pub use mssql::MssqlAdapter;
pub use mysql::MySqlAdapter;
pub use sqlite::SqliteAdapter;

use crate::database::adapter::DatabaseAdapter;
use crate::database::dialects::DatabaseBackend;
use crate::error::Result;

/// Server address and credentials shared by every adapter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectParams {
    /// `host`, `host:port` or `host,port`; for SQLite a directory or `:memory:`
    pub host: String,
    pub user: String,
    pub password: String,
    /// Recorded for callers; every connection is a single dedicated link
    pub persistent: bool,
}

impl ConnectParams {
    pub fn new(host: impl Into<String>, user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: password.into(),
            persistent: false,
        }
    }

    /// Split the host into name and port, falling back to `default_port`
    pub fn host_and_port(&self, default_port: u16) -> (String, u16) {
        let host = self.host.trim();
        if let Some((name, port)) = host.rsplit_once(|c: char| c == ':' || c == ',') {
            if let Ok(port) = port.trim().parse::<u16>() {
                return (name.trim().to_string(), port);
            }
        }
        let name = if host.is_empty() { "localhost" } else { host };
        (name.to_string(), default_port)
    }
}

/// Open a connection for `backend`, bound to `database` when one is given
pub async fn connect(
    backend: DatabaseBackend,
    name: &str,
    params: &ConnectParams,
    database: Option<&str>,
) -> Result<Box<dyn DatabaseAdapter>> {
    let adapter: Box<dyn DatabaseAdapter> = match backend {
        DatabaseBackend::MySql => Box::new(MySqlAdapter::connect(name, params, database).await?),
        DatabaseBackend::Mssql => Box::new(MssqlAdapter::connect(name, params, database).await?),
        DatabaseBackend::Sqlite => Box::new(SqliteAdapter::connect(name, params, database).await?),
    };
    Ok(adapter)
}

/// First keyword of a statement, skipping leading whitespace
pub(crate) fn leading_keyword(sql: &str) -> &str {
    sql.trim_start()
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default()
}

/// Statements that generate a row id
pub(crate) fn is_insert(sql: &str) -> bool {
    let keyword = leading_keyword(sql);
    keyword.eq_ignore_ascii_case("INSERT") || keyword.eq_ignore_ascii_case("REPLACE")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_port() {
        let params = ConnectParams::new("db.local:3307", "u", "p");
        assert_eq!(params.host_and_port(3306), ("db.local".to_string(), 3307));

        let params = ConnectParams::new("sql01,1444", "u", "p");
        assert_eq!(params.host_and_port(1433), ("sql01".to_string(), 1444));

        let params = ConnectParams::new("127.0.0.1", "u", "p");
        assert_eq!(params.host_and_port(3306), ("127.0.0.1".to_string(), 3306));

        let params = ConnectParams::new("", "u", "p");
        assert_eq!(params.host_and_port(1433), ("localhost".to_string(), 1433));
    }

    #[test]
    fn test_insert_classification() {
        assert!(is_insert("insert INTO t VALUES (1)"));
        assert!(is_insert("  REPLACE INTO t VALUES (1)"));
        assert!(!is_insert("UPDATE t SET n = 2"));
        assert!(!is_insert("DELETE FROM t"));
        assert_eq!(leading_keyword("\n select 1"), "select");
    }
}
