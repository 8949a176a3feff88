//! Dialect-aware SQL builder.
//!
//! Builders collect a statement as data and only render it in `build`,
//! where the [`Dialect`] decides placeholder style and pagination. Values
//! always travel as bound parameters, never spliced into the SQL text.
//!
//! # Example
//!
//! ```rust
//! use gatesql_core::builder::{FilterExpr, Select};
//! use gatesql_core::dialect::PostgresDialect;
//!
//! let (sql, params) = Select::new()
//!     .columns(&["id", "name"])
//!     .from("app.users")
//!     .where_clause(FilterExpr::eq("active", true))
//!     .build(&PostgresDialect::new());
//!
//! assert_eq!(sql, "SELECT id, name FROM app.users WHERE active = $1");
//! assert_eq!(params.len(), 1);
//! ```

mod delete;
mod filter;
mod insert;
mod select;
mod update;
pub mod value;

pub use delete::Delete;
pub use filter::{CompareOp, FilterExpr};
pub use insert::Insert;
pub use select::{Select, SortOrder};
pub use update::{Assignment, Extremum, Update};
pub use value::{SqlValue, ToSqlValue};

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::SchemaFields;

/// Accumulates SQL text and the parameters it binds.
pub struct SqlWriter<'d> {
    dialect: &'d dyn Dialect,
    schema: Option<&'d SchemaFields>,
    sql: String,
    params: Vec<SqlValue>,
}

impl<'d> SqlWriter<'d> {
    #[must_use]
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self {
            dialect,
            schema: None,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Column kinds used to type the placeholders of [`Self::bind_column`].
    #[must_use]
    pub const fn with_schema(mut self, schema: Option<&'d SchemaFields>) -> Self {
        self.schema = schema;
        self
    }

    #[must_use]
    pub fn dialect(&self) -> &'d dyn Dialect {
        self.dialect
    }

    pub fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    /// Binds a value and writes its placeholder.
    pub fn bind(&mut self, value: SqlValue) {
        self.params.push(value);
        let placeholder = self.dialect.placeholder(self.params.len());
        self.sql.push_str(&placeholder);
    }

    /// Binds a value headed for `column`.
    ///
    /// When the column is declared, the dialect may type the placeholder
    /// after the column's kind. Unknown and list columns bind as is.
    pub fn bind_column(&mut self, column: &str, value: SqlValue) {
        let kind = self
            .schema
            .and_then(|fields| fields.get(column))
            .filter(|field| !field.is_list)
            .map(|field| field.kind);
        self.params.push(value);
        let index = self.params.len();
        let placeholder = match kind {
            Some(kind) => self.dialect.typed_placeholder(index, kind),
            None => self.dialect.placeholder(index),
        };
        self.sql.push_str(&placeholder);
    }

    pub(crate) fn sql_mut(&mut self) -> &mut String {
        &mut self.sql
    }

    #[must_use]
    pub fn finish(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

/// Checks that a name can be written into SQL verbatim.
///
/// Column and table names come from requests and are interpolated, so
/// only ASCII letters, digits and underscores are accepted.
pub fn identifier(name: &str) -> Result<&str> {
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(Error::invalid(format!("invalid identifier ({name})")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, SqlServerDialect};

    #[test]
    fn test_writer_numbers_placeholders_per_dialect() {
        let dialect = SqlServerDialect::new();
        let mut writer = SqlWriter::new(&dialect);
        writer.push("a = ");
        writer.bind(SqlValue::Int(1));
        writer.push(" AND b = ");
        writer.bind(SqlValue::Int(2));
        let (sql, params) = writer.finish();
        assert_eq!(sql, "a = @p1 AND b = @p2");
        assert_eq!(params, vec![SqlValue::Int(1), SqlValue::Int(2)]);

        let dialect = MySqlDialect::new();
        let mut writer = SqlWriter::new(&dialect);
        writer.bind(SqlValue::Null);
        assert_eq!(writer.finish().0, "?");
    }

    #[test]
    fn test_identifiers() {
        assert!(identifier("created_at").is_ok());
        assert!(identifier("col1").is_ok());
        assert!(identifier("").is_err());
        assert!(identifier("1col").is_err());
        assert!(identifier("name; DROP TABLE users").is_err());
        assert!(identifier("a.b").is_err());
    }
}
