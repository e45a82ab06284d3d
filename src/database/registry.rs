//! Registry of named database connections
//!
//! Every logical database name maps to either a live connection or an
//! unusable marker recorded after both connection attempts failed. The
//! registry also holds the default name used when a caller passes `""`.

use crate::database::adapter::{DatabaseAdapter, StatementOutcome};
use crate::database::adapters::{self, ConnectParams};
use crate::database::dialects::{DatabaseBackend, SqlDialect};
use crate::database::result::FieldInfo;
use crate::database::types::SqlValue;
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Arguments of `add_connection`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectRequest {
    pub host: String,
    /// Driver tag, e.g. `mysqli`, `pdo_mysql`, `sqlsrv`, `sqlite`
    pub dialect: String,
    /// Logical name, also the database selected on the server
    pub database: String,
    pub user: String,
    pub password: String,
    /// Recorded only; every connection is a dedicated link
    pub persistent: bool,
    /// Accepted for compatibility; a fresh link is always opened
    pub force_new: bool,
}

impl ConnectRequest {
    pub fn new(
        host: impl Into<String>,
        dialect: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            dialect: dialect.into(),
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn force_new(mut self, force_new: bool) -> Self {
        self.force_new = force_new;
        self
    }

    pub fn params(&self) -> ConnectParams {
        ConnectParams {
            host: self.host.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            persistent: self.persistent,
        }
    }
}

/// Outcome of the most recent statement on a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LastStatement {
    None,
    Succeeded,
    Failed(String),
}

/// One live link to one logical database
pub struct Connection {
    name: String,
    backend: DatabaseBackend,
    adapter: Box<dyn DatabaseAdapter>,
    persistent: bool,
    last: LastStatement,
    rows_affected: u64,
    last_insert_id: Option<i64>,
}

impl Connection {
    pub fn new(name: impl Into<String>, adapter: Box<dyn DatabaseAdapter>, persistent: bool) -> Self {
        Self {
            name: name.into(),
            backend: adapter.backend(),
            adapter,
            persistent,
            last: LastStatement::None,
            rows_affected: 0,
            last_insert_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn dialect(&self) -> &'static dyn SqlDialect {
        self.adapter.dialect()
    }

    pub fn persistent(&self) -> bool {
        self.persistent
    }

    pub fn supports_seek(&self) -> bool {
        self.adapter.supports_seek()
    }

    pub fn last_statement(&self) -> &LastStatement {
        &self.last
    }

    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    pub fn adapter_mut(&mut self) -> &mut dyn DatabaseAdapter {
        self.adapter.as_mut()
    }

    fn record<T>(&mut self, result: &Result<T>) {
        self.last = match result {
            Ok(_) => LastStatement::Succeeded,
            Err(e) => LastStatement::Failed(e.backend_message()),
        };
    }

    /// Run a statement and remember its outcome
    pub async fn run(&mut self, sql: &str, params: &[SqlValue]) -> Result<StatementOutcome> {
        let result = self.adapter.run(sql, params).await;
        self.record(&result);
        if let Ok(outcome) = &result {
            self.rows_affected = outcome.rows_affected;
            self.last_insert_id = outcome.last_insert_id;
        }
        result
    }

    pub async fn prepare(&mut self, sql: &str) -> Result<Vec<FieldInfo>> {
        let result = self.adapter.prepare(sql).await;
        self.record(&result);
        result
    }

    /// Run a plain-text statement such as a transaction or USE command
    pub async fn execute_raw(&mut self, sql: &str) -> Result<u64> {
        let result = self.adapter.execute_raw(sql).await;
        self.record(&result);
        result
    }

    pub async fn begin(&mut self) -> Result<()> {
        let result = self.adapter.begin().await;
        self.record(&result);
        result
    }

    pub async fn commit(&mut self) -> Result<()> {
        let result = self.adapter.commit().await;
        self.record(&result);
        result
    }

    pub async fn rollback(&mut self) -> Result<()> {
        let result = self.adapter.rollback().await;
        self.record(&result);
        result
    }
}

/// Registry entry
pub enum Slot {
    Live(Connection),
    /// Both the direct connection and the create-database fallback failed
    Unusable(DatabaseBackend),
}

/// Statistics about the connection registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub live: usize,
    pub unusable: usize,
    pub default_database: Option<String>,
    /// All names in registration order
    pub database_names: Vec<String>,
}

/// Registry for managing multiple named connections
#[derive(Default)]
pub struct ConnectionRegistry {
    slots: IndexMap<String, Slot>,
    default: Option<String>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a connection for `request.database`, creating the database when it is missing
    ///
    /// # Returns
    /// * `Ok(true)` - The connection is live
    /// * `Ok(false)` - No dialect was given, or both attempts failed and the name is now unusable
    /// * `Err(Error::Config)` - The dialect tag is not recognized
    pub async fn add_connection(&mut self, request: &ConnectRequest) -> Result<bool> {
        if request.dialect.trim().is_empty() {
            log::warn!("No dialect given for database '{}'", request.database);
            return Ok(false);
        }
        let backend = DatabaseBackend::from_tag(&request.dialect).ok_or_else(|| {
            Error::config(format!("Unknown database dialect '{}'", request.dialect))
        })?;

        let name = request.database.clone();
        let params = request.params();
        let adapter = match adapters::connect(backend, &name, &params, Some(&name)).await {
            Ok(adapter) => adapter,
            Err(e) => {
                log::warn!(
                    "Connection to '{}' failed ({}); trying to create the database",
                    name,
                    e
                );
                match Self::bootstrap(backend, &name, &params).await {
                    Ok(adapter) => adapter,
                    Err(e) => {
                        log::warn!("Database '{}' is unusable: {}", name, e);
                        self.slots.insert(name, Slot::Unusable(backend));
                        return Ok(false);
                    }
                }
            }
        };

        self.register(name, adapter, request.persistent);
        Ok(true)
    }

    /// Connect without a database, create it and switch to it
    async fn bootstrap(
        backend: DatabaseBackend,
        name: &str,
        params: &ConnectParams,
    ) -> Result<Box<dyn DatabaseAdapter>> {
        let mut adapter = adapters::connect(backend, name, params, None).await?;
        adapter.create_database(name).await?;
        adapter.use_database(name).await?;
        log::info!("Created database '{}'", name);
        Ok(adapter)
    }

    /// Register an already-open adapter under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, adapter: Box<dyn DatabaseAdapter>, persistent: bool) {
        let name = name.into();
        let connection = Connection::new(name.clone(), adapter, persistent);
        if let Some(Slot::Live(previous)) = self.slots.insert(name.clone(), Slot::Live(connection)) {
            log::info!("Replaced connection '{}'", previous.name());
        }
    }

    /// Resolve a caller-supplied name; `""` means the default
    pub fn resolve<'a>(&'a self, which: &'a str) -> Option<&'a str> {
        if which.is_empty() {
            self.default.as_deref()
        } else {
            Some(which)
        }
    }

    pub fn slot(&self, which: &str) -> Option<&Slot> {
        self.resolve(which).and_then(|name| self.slots.get(name))
    }

    pub fn live(&self, which: &str) -> Option<&Connection> {
        match self.slot(which) {
            Some(Slot::Live(connection)) => Some(connection),
            _ => None,
        }
    }

    pub fn live_mut(&mut self, which: &str) -> Option<&mut Connection> {
        let name = self.resolve(which)?.to_string();
        match self.slots.get_mut(&name) {
            Some(Slot::Live(connection)) => Some(connection),
            _ => None,
        }
    }

    /// Backend of a live or unusable entry
    pub fn backend(&self, which: &str) -> Option<DatabaseBackend> {
        match self.slot(which)? {
            Slot::Live(connection) => Some(connection.backend()),
            Slot::Unusable(backend) => Some(*backend),
        }
    }

    pub fn is_connected(&self, which: &str) -> bool {
        self.live(which).is_some()
    }

    pub fn is_unusable(&self, which: &str) -> bool {
        matches!(self.slot(which), Some(Slot::Unusable(_)))
    }

    /// Remove an entry and release its connection
    pub fn close(&mut self, which: &str) -> Result<bool> {
        let name = self
            .resolve(which)
            .map(str::to_string)
            .ok_or_else(|| Error::connection_not_found("<default>"))?;

        match self.slots.shift_remove(&name) {
            Some(_) => {
                log::info!("Closed connection '{}'", name);
                if self.default.as_deref() == Some(name.as_str()) {
                    self.default = None;
                }
                Ok(true)
            }
            None => Err(Error::connection_not_found(name)),
        }
    }

    /// Make `name` the default; `false` when no such entry exists
    pub fn set_default(&mut self, name: &str) -> bool {
        if !self.slots.contains_key(name) {
            return false;
        }
        self.default = Some(name.to_string());
        true
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Registered names in registration order
    pub fn names(&self) -> Vec<String> {
        self.slots.keys().cloned().collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let live = self
            .slots
            .values()
            .filter(|slot| matches!(slot, Slot::Live(_)))
            .count();

        RegistryStats {
            live,
            unusable: self.slots.len() - live,
            default_database: self.default.clone(),
            database_names: self.names(),
        }
    }
}
