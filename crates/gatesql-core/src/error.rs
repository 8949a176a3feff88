//! Error types for the core engine.

use thiserror::Error;

/// Errors produced while diffing schemas, validating documents or
/// compiling CRUD statements.
#[derive(Debug, Error)]
pub enum Error {
    /// The table does not exist in the database.
    #[error("{db_type}:{table} not found during inspection")]
    NotFound { db_type: String, table: String },

    /// The request is malformed or asks for something unsupported.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A document value does not match the declared field kind.
    #[error(
        "invalid type received for field {field} in collection {collection}: wanted {expected} got {received}"
    )]
    TypeMismatch {
        field: String,
        collection: String,
        expected: String,
        received: String,
    },

    /// The dialect has no mapping for the requested construct.
    #[error("{dialect} does not support {operation} for {table}.{column}")]
    DialectUnsupported {
        dialect: String,
        operation: String,
        table: String,
        column: String,
    },

    /// The document carries a field the schema does not declare.
    #[error("field {field} from collection {collection} is not present in schema")]
    UnknownField { field: String, collection: String },

    /// A required field is absent from the document.
    #[error("required field {field} from collection {collection} not present in request")]
    MissingField { field: String, collection: String },

    /// Linked fields are virtual and cannot be written.
    #[error("cannot insert value for linked field {field} in collection {collection}")]
    LinkedFieldWrite { field: String, collection: String },

    /// The document is not an object or an array of objects.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    /// Returns `true` when the error reports a missing table.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
