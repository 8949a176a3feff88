//! SQL dialect catalog.
//!
//! Each supported backend implements [`Dialect`], which answers three
//! kinds of questions: which native type a field maps to, how a DDL
//! fragment is spelled, and how DML placeholders, pagination and time
//! functions are written. Defaults follow standard SQL; backends only
//! override what they spell differently.

mod mysql;
mod postgres;
mod sqlserver;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlserver::SqlServerDialect;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{DbType, ForeignKeyAction, Kind, SchemaFieldType};

/// Value written by the `$currentDate` update operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentTime {
    Date,
    Timestamp,
}

impl CurrentTime {
    /// Parses the operand of `$currentDate`.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "date" => Ok(Self::Date),
            "timestamp" => Ok(Self::Timestamp),
            other => Err(Error::invalid(format!(
                "invalid current date type ({other}) provided for sql"
            ))),
        }
    }
}

/// Backend-specific SQL spelling.
///
/// Table arguments of the DDL methods are already qualified with the
/// project (see [`Dialect::qualify`]).
pub trait Dialect: Send + Sync {
    fn db_type(&self) -> DbType;

    fn name(&self) -> &'static str {
        self.db_type().as_str()
    }

    // ================================================================
    // Type catalog
    // ================================================================

    /// Native type for a field kind, `None` when the backend has no mapping.
    fn type_name(&self, kind: Kind) -> Option<&'static str>;

    /// Kind for a native type reported by [`Dialect::describe_query`].
    fn kind_of(&self, data_type: &str, max_length: i64) -> Option<Kind>;

    /// Native column type for a declared field.
    fn native_type(&self, table: &str, field: &SchemaFieldType) -> Result<&'static str> {
        if field.is_list {
            return Err(self.unsupported("list columns", table, &field.field_name));
        }
        self.type_name(field.kind).ok_or_else(|| {
            self.unsupported(&format!("{} columns", field.kind), table, &field.field_name)
        })
    }

    fn unsupported(&self, operation: &str, table: &str, column: &str) -> Error {
        Error::DialectUnsupported {
            dialect: self.name().to_string(),
            operation: operation.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    // ================================================================
    // Naming
    // ================================================================

    /// Placeholder for the parameter at `index` (1-based).
    fn placeholder(&self, index: usize) -> String;

    /// Placeholder for a value written to a column of `kind`.
    fn typed_placeholder(&self, index: usize, _kind: Kind) -> String {
        self.placeholder(index)
    }

    fn qualify(&self, project: &str, table: &str) -> String {
        format!("{project}.{table}")
    }

    // ================================================================
    // Column DDL
    // ================================================================

    fn add_column(&self, table: &str, column: &str, native: &str) -> String {
        format!("ALTER TABLE {table} ADD {column} {native}")
    }

    fn drop_column(&self, table: &str, column: &str) -> String {
        format!("ALTER TABLE {table} DROP COLUMN {column}")
    }

    fn alter_nullability(&self, table: &str, column: &str, native: &str, not_null: bool)
    -> String;

    /// Native type of an auto-increment column.
    fn auto_increment_type(&self, native: &str) -> String;

    /// Inline default of a column inside CREATE TABLE.
    fn column_default_clause(&self, _name: &str, literal: &str) -> String {
        format!("DEFAULT {literal}")
    }

    /// Statements replacing the default of an existing column.
    ///
    /// `existing` is the introspected name of the current default
    /// constraint, for backends that name defaults.
    fn change_default(
        &self,
        table: &str,
        _name: &str,
        column: &str,
        _existing: Option<&str>,
        _previous: Option<&str>,
        next: Option<&str>,
    ) -> Vec<String> {
        match next {
            Some(literal) => vec![format!(
                "ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {literal}"
            )],
            None => vec![format!(
                "ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT"
            )],
        }
    }

    /// Renders a JSON default as a SQL literal.
    fn default_literal(&self, value: &Value) -> String {
        match value {
            Value::Null => String::from("NULL"),
            Value::Bool(true) => String::from("TRUE"),
            Value::Bool(false) => String::from("FALSE"),
            Value::Number(number) => number.to_string(),
            Value::String(text) => quote_literal(text),
            other => quote_literal(&other.to_string()),
        }
    }

    // ================================================================
    // Constraints
    // ================================================================

    fn primary_key_clause(&self, name: &str, columns: &[&str]) -> String {
        format!("CONSTRAINT {name} PRIMARY KEY ({})", columns.join(", "))
    }

    fn unique_clause(&self, name: &str, column: &str) -> String {
        format!("CONSTRAINT {name} UNIQUE ({column})")
    }

    fn foreign_key_clause(
        &self,
        name: &str,
        column: &str,
        references: &str,
        to: &str,
        on_delete: Option<ForeignKeyAction>,
    ) -> String {
        let mut clause =
            format!("CONSTRAINT {name} FOREIGN KEY ({column}) REFERENCES {references} ({to})");
        if let Some(action) = ForeignKeyAction::effective(on_delete) {
            clause.push_str(" ON DELETE ");
            clause.push_str(action.as_sql());
        }
        clause
    }

    fn add_constraint(&self, table: &str, clause: &str) -> String {
        format!("ALTER TABLE {table} ADD {clause}")
    }

    fn drop_constraint(&self, table: &str, name: &str) -> String {
        format!("ALTER TABLE {table} DROP CONSTRAINT {name}")
    }

    fn drop_unique(&self, table: &str, name: &str) -> Vec<String> {
        vec![self.drop_constraint(table, name)]
    }

    fn drop_primary_key(&self, table: &str, name: &str) -> String {
        self.drop_constraint(table, name)
    }

    fn drop_foreign_key(&self, table: &str, name: &str) -> Vec<String> {
        vec![self.drop_constraint(table, name)]
    }

    // ================================================================
    // Tables and projects
    // ================================================================

    fn create_table(&self, table: &str, definitions: &[String]) -> String {
        format!("CREATE TABLE {table} ({})", definitions.join(", "))
    }

    fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {table}")
    }

    /// Creates the namespace that holds a project's tables.
    fn create_project(&self, project: &str) -> String;

    // ================================================================
    // DML
    // ================================================================

    fn current_time(&self, kind: CurrentTime) -> &'static str;

    /// Appends LIMIT/OFFSET (or the backend's equivalent) to a SELECT.
    fn paginate(&self, sql: &mut String, limit: Option<u64>, offset: Option<u64>, _ordered: bool) {
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    // ================================================================
    // Introspection
    // ================================================================

    /// Column description query, bound with `(schema, table)`.
    fn describe_query(&self) -> &'static str;

    /// Index description query, bound with `(schema, table)`.
    fn index_query(&self) -> &'static str;
}

/// Quotes a string literal, doubling embedded single quotes.
#[must_use]
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Default constraint name for a column: `c_<table>_<column>`.
#[must_use]
pub fn constraint_name(table: &str, column: &str) -> String {
    format!("c_{table}_{column}")
}
