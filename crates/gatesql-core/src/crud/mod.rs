//! CRUD requests and their compilation to SQL.
//!
//! Requests arrive in the gateway's document-store shape and are compiled
//! here into parameterised statements for one dialect. Nothing in this
//! module talks to a database; the driver crate executes what it returns.

mod statements;
mod update;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use statements::{compile_create, compile_delete, compile_insert, compile_read, rows_from_json};
pub use update::{compile_update, CompiledUpdate, UpdateOperator};

use crate::builder::{identifier, SqlValue};
use crate::dialect::Dialect;
use crate::error::{Error, Result};

/// A rendered statement and the parameters it binds.
pub type Statement = (String, Vec<SqlValue>);

/// Column values of one row, in column order.
pub type Row = BTreeMap<String, SqlValue>;

/// What a request applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    One,
    #[default]
    All,
    Upsert,
    Count,
    Distinct,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::One => "one",
            Self::All => "all",
            Self::Upsert => "upsert",
            Self::Count => "count",
            Self::Distinct => "distinct",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CreateRequest {
    /// A single object or an array of objects.
    #[serde(rename = "doc")]
    pub document: Value,
    #[serde(default, rename = "op")]
    pub operation: Operation,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadOptions {
    /// Projection: fields mapped to 1 are returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<BTreeMap<String, i32>>,
    /// Sort keys; a leading `-` sorts descending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Column whose distinct values a `distinct` read returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReadRequest {
    #[serde(default)]
    pub find: Map<String, Value>,
    #[serde(default, rename = "op")]
    pub operation: Operation,
    #[serde(default)]
    pub options: ReadOptions,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub find: Map<String, Value>,
    #[serde(default, rename = "op")]
    pub operation: Operation,
    /// Update operator (`$set`, `$inc`, ...) to field/value object.
    #[serde(default)]
    pub update: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub find: Map<String, Value>,
    #[serde(default, rename = "op")]
    pub operation: Operation,
}

/// One write of a batch; all writes of a batch share a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BatchRequest {
    Create {
        col: String,
        #[serde(flatten)]
        request: CreateRequest,
    },
    Update {
        col: String,
        #[serde(flatten)]
        request: UpdateRequest,
    },
    Delete {
        col: String,
        #[serde(flatten)]
        request: DeleteRequest,
    },
}

/// Qualifies `table` with the project after checking both names.
pub fn qualified_table(dialect: &dyn Dialect, project: &str, table: &str) -> Result<String> {
    Ok(dialect.qualify(identifier(project)?, identifier(table)?))
}

/// Splits a request document into its objects.
pub fn documents(document: &Value) -> Result<Vec<&Map<String, Value>>> {
    match document {
        Value::Object(object) => Ok(vec![object]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object().ok_or_else(|| {
                    Error::InvalidDocument(String::from("array items must be objects"))
                })
            })
            .collect(),
        _ => Err(Error::InvalidDocument(String::from(
            "document must be an object or an array of objects",
        ))),
    }
}
