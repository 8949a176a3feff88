//! INSERT statement builder using the typestate pattern.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::value::{SqlValue, ToSqlValue};
use super::SqlWriter;
use crate::dialect::Dialect;
use crate::schema::SchemaFields;

// Typestate markers

/// Marker: No values specified yet.
pub struct NoValues;
/// Marker: Values have been specified.
pub struct HasValues;

/// A single-row INSERT builder. Columns are written in sorted order.
pub struct Insert<Values> {
    table: String,
    row: BTreeMap<String, SqlValue>,
    _state: PhantomData<Values>,
}

impl Insert<NoValues> {
    /// Specifies the table to insert into.
    #[must_use]
    pub fn into_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            row: BTreeMap::new(),
            _state: PhantomData,
        }
    }

    /// Uses a whole row at once.
    #[must_use]
    pub fn row(self, row: BTreeMap<String, SqlValue>) -> Insert<HasValues> {
        Insert {
            table: self.table,
            row,
            _state: PhantomData,
        }
    }

    #[must_use]
    pub fn value<T: ToSqlValue>(self, column: &str, value: T) -> Insert<HasValues> {
        self.row(BTreeMap::new()).value(column, value)
    }
}

impl Insert<HasValues> {
    #[must_use]
    pub fn value<T: ToSqlValue>(mut self, column: &str, value: T) -> Self {
        self.row.insert(column.to_string(), value.to_sql_value());
        self
    }

    /// Builds the INSERT statement and returns SQL with parameters.
    #[must_use]
    pub fn build(self, dialect: &dyn Dialect) -> (String, Vec<SqlValue>) {
        self.build_typed(dialect, None)
    }

    /// Like [`Self::build`], typing placeholders after `schema`.
    #[must_use]
    pub fn build_typed(
        self,
        dialect: &dyn Dialect,
        schema: Option<&SchemaFields>,
    ) -> (String, Vec<SqlValue>) {
        let mut writer = SqlWriter::new(dialect).with_schema(schema);
        let columns: Vec<&str> = self.row.keys().map(String::as_str).collect();
        writer.push(&format!(
            "INSERT INTO {} ({}) VALUES (",
            self.table,
            columns.join(", ")
        ));
        for (i, (column, value)) in self.row.into_iter().enumerate() {
            if i > 0 {
                writer.push(", ");
            }
            writer.bind_column(&column, value);
        }
        writer.push(")");
        writer.finish()
    }
}
