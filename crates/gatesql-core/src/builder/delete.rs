//! DELETE statement builder.

use super::filter::FilterExpr;
use super::value::SqlValue;
use super::SqlWriter;
use crate::dialect::Dialect;
use crate::schema::SchemaFields;

/// A DELETE statement builder.
///
/// **Warning**: without a WHERE clause every row of the table is deleted.
pub struct Delete {
    table: String,
    where_clause: Option<FilterExpr>,
}

impl Delete {
    /// Specifies the table to delete from.
    #[must_use]
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            where_clause: None,
        }
    }

    #[must_use]
    pub fn where_clause(mut self, expr: FilterExpr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    #[must_use]
    pub fn filter(mut self, expr: Option<FilterExpr>) -> Self {
        self.where_clause = expr;
        self
    }

    /// Builds the DELETE statement and returns SQL with parameters.
    #[must_use]
    pub fn build(self, dialect: &dyn Dialect) -> (String, Vec<SqlValue>) {
        self.build_typed(dialect, None)
    }

    /// Like [`Self::build`], typing filter placeholders after `schema`.
    #[must_use]
    pub fn build_typed(
        self,
        dialect: &dyn Dialect,
        schema: Option<&SchemaFields>,
    ) -> (String, Vec<SqlValue>) {
        let mut writer = SqlWriter::new(dialect).with_schema(schema);
        writer.push(&format!("DELETE FROM {}", self.table));
        if let Some(expr) = &self.where_clause {
            writer.push(" WHERE ");
            expr.write(&mut writer);
        }
        writer.finish()
    }
}
