//! Configuration file.
//!
//! ```json
//! {
//!   "project": "blog",
//!   "databases": {
//!     "db": { "type": "sql-postgres", "conn": "postgres://localhost/blog", "enabled": true }
//!   },
//!   "schemas": {
//!     "db": { "users": { "id": { "kind": "ID", "isPrimary": true } } }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use gatesql_core::builder::identifier;
use gatesql_core::{DbType, SchemaCollection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MigrateError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub db_type: DbType,
    /// Connection URL.
    pub conn: String,
    /// Schema (Postgres, SQL Server) or database (MySQL) holding the
    /// tables. Defaults to the project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

const fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub project: String,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseConfig>,
    /// Desired tables, per database alias.
    #[serde(default)]
    pub schemas: BTreeMap<String, SchemaCollection>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration");
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses and checks a configuration document.
    ///
    /// Field names inside `schemas` are taken from their map keys.
    pub fn from_json(text: &str) -> Result<Self> {
        let mut config: Self = serde_json::from_str(text)?;
        identifier(&config.project)?;

        for (alias, database) in &config.databases {
            identifier(database.schema_name(&config.project))?;
            if database.conn.is_empty() {
                return Err(MigrateError::Config(format!(
                    "database {alias} has no connection url"
                )));
            }
        }

        for (alias, tables) in &mut config.schemas {
            if !config.databases.contains_key(alias) {
                return Err(MigrateError::Config(format!(
                    "schema declared for unknown database {alias}"
                )));
            }
            for (table, fields) in tables.iter_mut() {
                identifier(table)?;
                for (name, field) in fields.iter_mut() {
                    identifier(name)?;
                    field.field_name.clone_from(name);
                }
            }
        }
        Ok(config)
    }

    /// Returns the named database, which must be enabled.
    pub fn database(&self, alias: &str) -> Result<&DatabaseConfig> {
        match self.databases.get(alias) {
            Some(database) if database.enabled => Ok(database),
            Some(_) => Err(MigrateError::Config(format!("database {alias} is disabled"))),
            None => Err(MigrateError::Config(format!("unknown database {alias}"))),
        }
    }

    /// Aliases a command applies to: `alias` alone when given, otherwise
    /// every enabled database.
    pub fn aliases(&self, alias: Option<&str>) -> Result<Vec<String>> {
        match alias {
            Some(alias) => {
                self.database(alias)?;
                Ok(vec![alias.to_string()])
            }
            None => Ok(self
                .databases
                .iter()
                .filter(|(_, database)| database.enabled)
                .map(|(alias, _)| alias.clone())
                .collect()),
        }
    }

    /// Desired tables of `alias`; empty when none are declared.
    #[must_use]
    pub fn schema(&self, alias: &str) -> SchemaCollection {
        self.schemas.get(alias).cloned().unwrap_or_default()
    }
}

impl DatabaseConfig {
    #[must_use]
    pub fn schema_name<'a>(&'a self, project: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(project)
    }
}
