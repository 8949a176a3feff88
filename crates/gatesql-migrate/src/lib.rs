//! Schema synchronisation for gatesql databases.
//!
//! Declared table schemas live in a JSON configuration file next to the
//! databases they belong to. [`SchemaSync`] introspects each declared
//! table, diffs it against its declaration and runs the resulting DDL.
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the statements that would run
//! gatesql-migrate --config gatesql.json diff
//!
//! # Apply them
//! gatesql-migrate --config gatesql.json sync
//!
//! # Show how the database sees a table
//! gatesql-migrate --config gatesql.json --alias db inspect users
//! ```

pub mod config;
pub mod error;
pub mod sync;

use std::sync::Arc;
use std::time::Duration;

use gatesql_core::SchemaRegistry;
use gatesql_driver::{SqlCrud, SqlExecutor};

pub use config::{Config, DatabaseConfig};
pub use error::{MigrateError, Result};
pub use sync::{SchemaSync, TablePlan};

/// Builds the sync for `alias` on top of an already connected executor.
pub fn schema_sync(
    config: &Config,
    alias: &str,
    executor: Arc<dyn SqlExecutor>,
    timeout: Duration,
) -> Result<SchemaSync> {
    let database = config.database(alias)?;
    let desired = config.schema(alias);
    let schemas = Arc::new(SchemaRegistry::new());
    schemas.set_collection(alias, desired.clone());

    let crud = SqlCrud::new(alias, database.schema_name(&config.project), executor, schemas)
        .with_timeout(timeout);
    Ok(SchemaSync::new(crud, desired))
}

/// Connects to `alias` and builds its sync.
pub async fn connect(config: &Config, alias: &str, timeout: Duration) -> Result<SchemaSync> {
    let database = config.database(alias)?;
    let executor = gatesql_driver::connect(database.db_type, &database.conn).await?;
    schema_sync(config, alias, executor, timeout)
}
