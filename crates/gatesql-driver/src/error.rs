//! Error types for the driver.

use std::time::Duration;

/// Errors produced while talking to a database.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was rejected before reaching the database.
    #[error(transparent)]
    Core(#[from] gatesql_core::Error),

    /// The database refused the statement or the connection failed.
    ///
    /// Constraint violations are reported verbatim through this variant.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The statement did not finish within the query timeout.
    #[error("Query timed out after {after:?}")]
    Timeout { after: Duration },

    /// No sqlx driver exists for this backend.
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),
}

impl Error {
    /// Returns `true` when introspection found no such table.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Core(error) if error.is_not_found())
    }
}

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;
