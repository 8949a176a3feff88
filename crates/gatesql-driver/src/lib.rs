//! # gatesql-driver
//!
//! Runs statements compiled by `gatesql-core` against live databases.
//!
//! - [`SqlExecutor`] abstracts a connection pool; MySQL and Postgres are
//!   backed by sqlx
//! - [`SqlCrud`] executes create/read/update/delete/batch requests for one
//!   database alias, including transactional upserts
//! - [`describe_table`] runs the catalog queries the inspector consumes
//!
//! Every call is bounded by a timeout (10 seconds unless configured).

pub mod crud;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod mysql;
pub mod postgres;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

use std::sync::Arc;

use gatesql_core::DbType;
use tracing::info;

pub use crud::SqlCrud;
pub use error::{Error, Result};
pub use executor::{QueryResult, QueryRow, SqlExecutor, SqlTransaction, DEFAULT_TIMEOUT};
pub use introspect::describe_table;
pub use mysql::MySqlExecutor;
pub use postgres::PostgresExecutor;

/// Opens a connection pool for `db_type`.
///
/// SQL Server has no sqlx driver; its dialect is available for rendering
/// statements only.
pub async fn connect(db_type: DbType, url: &str) -> Result<Arc<dyn SqlExecutor>> {
    info!(db_type = %db_type, "Connecting to database");
    match db_type {
        DbType::MySql => Ok(Arc::new(MySqlExecutor::connect(url).await?)),
        DbType::Postgres => Ok(Arc::new(PostgresExecutor::connect(url).await?)),
        DbType::SqlServer => Err(Error::UnsupportedBackend(db_type.to_string())),
    }
}
