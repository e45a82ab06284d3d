//! The `SqlManager` facade
//!
//! A manager owns a `ConnectionRegistry`, the query failure log and the
//! throw-on-failure toggle. Its operations are spread over submodules:
//! statement execution, dialect translation, schema inspection and the
//! schema-aware writers.

mod executor;
mod schema;
mod translator;
mod writer;

pub use executor::{Params, PreparedStatement};
pub use writer::clean_date_time;

#[cfg(feature = "config")]
use crate::config::ManagerConfig;
use crate::database::{
    ConnectRequest, ConnectionRegistry, DatabaseAdapter, DatabaseBackend, SqlDialect,
};
use crate::error::{Error, QueryLog, Result};
use std::path::PathBuf;

/// Cross-database SQL manager
#[derive(Default)]
pub struct SqlManager {
    registry: ConnectionRegistry,
    log: QueryLog,
    throw_on_failure: bool,
}

impl SqlManager {
    /// Create a manager whose default database is `request.database` and open it
    ///
    /// A failed connection leaves the name marked unusable; only an unknown
    /// dialect tag is an error.
    pub async fn new(request: ConnectRequest) -> Result<Self> {
        let mut manager = Self::default();
        manager.add_connection(&request).await?;
        manager.registry.set_default(&request.database);
        Ok(manager)
    }

    /// Build a manager from configuration, opening every configured database in order
    #[cfg(feature = "config")]
    pub async fn from_config(config: &ManagerConfig) -> Result<Self> {
        config.validate()?;

        let mut manager = Self {
            log: QueryLog::new(config.query_log.clone()),
            throw_on_failure: config.throw_on_failure,
            ..Self::default()
        };
        for (name, database) in &config.databases {
            if !manager.add_connection(&database.to_request(name)).await? {
                log::warn!("Configured database '{}' is not connected", name);
            }
        }
        if let Some(default) = config.default_database() {
            manager.registry.set_default(default);
        }

        Ok(manager)
    }

    /// Open a connection; see `ConnectionRegistry::add_connection`
    pub async fn add_connection(&mut self, request: &ConnectRequest) -> Result<bool> {
        self.registry.add_connection(request).await
    }

    /// Register an already-open adapter under `name`
    pub fn register_adapter(&mut self, name: &str, adapter: Box<dyn DatabaseAdapter>) {
        self.registry.register(name, adapter, false);
    }

    pub fn is_connected(&self, which: &str) -> bool {
        self.registry.is_connected(which)
    }

    /// Close and forget a connection; unknown names are an error
    pub fn close(&mut self, which: &str) -> Result<bool> {
        self.registry.close(which)
    }

    /// Change the default database
    ///
    /// # Returns
    /// * `Ok(false)` - `name` is not registered (the default is unchanged) or the
    ///   switch statement failed
    /// * `Ok(true)` - `name` is now the default
    pub async fn set_default_db(&mut self, name: &str) -> Result<bool> {
        if name.is_empty() || !self.registry.set_default(name) {
            return Ok(false);
        }

        let Some(connection) = self.registry.live_mut(name) else {
            return Ok(true);
        };
        let Some(sql) = connection.dialect().use_database(name) else {
            return Ok(true);
        };
        match connection.execute_raw(&sql).await {
            Ok(_) => Ok(true),
            Err(e) => self.failure::<()>(&sql, &e).map(|_| false),
        }
    }

    pub fn default_db(&self) -> Option<&str> {
        self.registry.default_name()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Raise `Error::QueryFailed` instead of returning the failure sentinel
    pub fn throw_on_failure(&mut self, enabled: bool) {
        self.throw_on_failure = enabled;
    }

    pub fn throws_on_failure(&self) -> bool {
        self.throw_on_failure
    }

    pub fn set_query_log(&mut self, path: Option<PathBuf>) {
        self.log.set_path(path);
    }

    pub fn query_log(&self) -> &QueryLog {
        &self.log
    }

    /// Append a caller-identified line to the query log
    pub fn logger(&self, text: &str) -> bool {
        self.log.append_line(text)
    }

    /// Quote `text` as a string literal for the connection's dialect
    pub fn escape(&self, text: &str, which: &str) -> Result<String> {
        Ok(self.dialect_for(which)?.quote_string(text))
    }

    /// Dialect of a live or unusable entry
    pub(crate) fn dialect_for(&self, which: &str) -> Result<&'static dyn SqlDialect> {
        self.backend_for(which).map(|backend| backend.dialect())
    }

    pub(crate) fn backend_for(&self, which: &str) -> Result<DatabaseBackend> {
        self.registry
            .backend(which)
            .ok_or_else(|| Error::connection_not_found(display_name(which)))
    }

    /// Log a failure and turn it into the sentinel or a raised error
    pub(crate) fn failure<T>(&self, sql: &str, error: &Error) -> Result<Option<T>> {
        let entry = self.log.record_failure(sql, &error.backend_message());
        if self.throw_on_failure {
            Err(Error::query_failed(entry.trim_end()))
        } else {
            Ok(None)
        }
    }
}

/// Name used in messages for a possibly empty connection name
pub(crate) fn display_name(which: &str) -> &str {
    if which.is_empty() {
        "<default>"
    } else {
        which
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_sets_default_and_connects() {
        let manager = SqlManager::new(ConnectRequest::new(":memory:", "sqlite", "office"))
            .await
            .unwrap();
        assert_eq!(manager.default_db(), Some("office"));
        assert!(manager.is_connected(""));
        assert!(!manager.throws_on_failure());
    }

    #[tokio::test]
    async fn test_new_with_unknown_dialect_fails() {
        let result = SqlManager::new(ConnectRequest::new("localhost", "db2", "office")).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_set_default_db_unknown_name_keeps_default() {
        let mut manager = SqlManager::new(ConnectRequest::new(":memory:", "sqlite", "office"))
            .await
            .unwrap();
        assert!(!manager.set_default_db("missing").await.unwrap());
        assert_eq!(manager.default_db(), Some("office"));
    }

    #[tokio::test]
    async fn test_escape_uses_dialect() {
        let manager = SqlManager::new(ConnectRequest::new(":memory:", "sqlite", "office"))
            .await
            .unwrap();
        assert_eq!(manager.escape("it's", "").unwrap(), "'it''s'");
        assert!(matches!(
            manager.escape("x", "nowhere"),
            Err(Error::ConnectionNotFound(_))
        ));
    }
}
