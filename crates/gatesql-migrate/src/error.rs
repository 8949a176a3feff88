//! Error types for schema synchronisation.

/// Errors that can occur while loading configuration or syncing schemas.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Statement execution or introspection failed.
    #[error(transparent)]
    Driver(#[from] gatesql_driver::Error),

    /// Diffing or inspecting a schema failed.
    #[error(transparent)]
    Core(#[from] gatesql_core::Error),

    /// The configuration file is inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error (reading the configuration file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
