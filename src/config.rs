//! Manager configuration
//!
//! Loaded from `config.toml`, with `config.{env}.toml` merged on top when
//! `SQLBRIDGE_ENV` names an environment:
//!
//! ```toml
//! query_log = "/var/log/pos/queries.log"
//! throw_on_failure = false
//! default = "core_op"
//!
//! [databases.core_op]
//! host = "127.0.0.1"
//! dialect = "pdo_mysql"
//! user = "pos"
//! password = "secret"
//! ```

use crate::database::{ConnectRequest, DatabaseBackend};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_VAR: &str = "SQLBRIDGE_ENV";
pub const QUERY_LOG_VAR: &str = "SQLBRIDGE_QUERY_LOG";
pub const THROW_VAR: &str = "SQLBRIDGE_THROW_ON_FAILURE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Append-only file receiving failed queries; stderr when unset
    #[serde(default)]
    pub query_log: Option<PathBuf>,

    #[serde(default)]
    pub throw_on_failure: bool,

    /// Logical name used when callers pass `""`; the first database otherwise
    #[serde(default)]
    pub default: Option<String>,

    /// Connections keyed by logical database name, opened in file order
    #[serde(default)]
    pub databases: IndexMap<String, ConnectionConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    pub dialect: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub persistent: bool,

    #[serde(default)]
    pub force_new: bool,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl ConnectionConfig {
    pub fn to_request(&self, database: &str) -> ConnectRequest {
        ConnectRequest::new(&self.host, &self.dialect, database)
            .credentials(&self.user, &self.password)
            .persistent(self.persistent)
            .force_new(self.force_new)
    }
}

impl ManagerConfig {
    /// Load from the current directory
    pub fn load() -> Result<Self> {
        Self::load_with_base_dir(".")
    }

    /// Load `config.toml` from `base_dir`, merging the overlay named by `SQLBRIDGE_ENV`
    pub fn load_with_base_dir<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let environment = env::var(ENV_VAR).ok();
        let mut config = Self::load_for_environment(base_dir, environment.as_deref())?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load and merge files without consulting environment variables
    pub fn load_for_environment<P: AsRef<Path>>(
        base_dir: P,
        environment: Option<&str>,
    ) -> Result<Self> {
        let base_dir = base_dir.as_ref();

        let base_path = base_dir.join("config.toml");
        let mut merged = if base_path.exists() {
            Self::load_toml_value(&base_path)?
        } else {
            toml::Value::Table(toml::map::Map::new())
        };

        if let Some(environment) = environment {
            let overlay_path = base_dir.join(format!("config.{}.toml", environment));
            if overlay_path.exists() {
                log::debug!(
                    "Loading environment-specific config from: {}",
                    overlay_path.display()
                );
                let overlay = Self::load_toml_value(&overlay_path)?;
                merged = serde_toml_merge::merge(merged, overlay).map_err(|e| {
                    Error::config(format!("Failed to merge configuration files: {}", e))
                })?;
            }
        }

        // toml::Value -> serde_json::Value keeps the struct deserialization in one place
        let json_value = serde_json::to_value(&merged)?;
        let config: ManagerConfig = serde_json::from_value(json_value)?;

        log::info!(
            "Configuration loaded ({} databases, environment: {})",
            config.databases.len(),
            environment.unwrap_or("default")
        );
        Ok(config)
    }

    /// Parse a single TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    fn load_toml_value(path: &Path) -> Result<toml::Value> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let value: toml::Value = toml::from_str(&content)?;
        log::debug!("Loaded TOML value from: {}", path.display());
        Ok(value)
    }

    /// Apply `SQLBRIDGE_QUERY_LOG` and `SQLBRIDGE_THROW_ON_FAILURE` as returned by `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(QUERY_LOG_VAR) {
            self.query_log = if path.is_empty() {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(flag) = lookup(THROW_VAR) {
            self.throw_on_failure = match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                other => {
                    return Err(Error::config(format!(
                        "Invalid {} value '{}'",
                        THROW_VAR, other
                    )))
                }
            };
        }
        Ok(())
    }

    /// Reject unknown dialect tags and a default that names no database
    pub fn validate(&self) -> Result<()> {
        for (name, database) in &self.databases {
            let tag = database.dialect.trim();
            if !tag.is_empty() && DatabaseBackend::from_tag(tag).is_none() {
                return Err(Error::config(format!(
                    "Database '{}' has unknown dialect '{}'",
                    name, database.dialect
                )));
            }
        }
        if let Some(default) = &self.default {
            if !self.databases.contains_key(default) {
                return Err(Error::config(format!(
                    "Default database '{}' is not configured",
                    default
                )));
            }
        }
        Ok(())
    }

    /// Default logical name: the configured one, else the first database
    pub fn default_database(&self) -> Option<&str> {
        self.default
            .as_deref()
            .or_else(|| self.databases.keys().next().map(String::as_str))
    }
}
