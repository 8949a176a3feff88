//! SELECT statement builder using the typestate pattern.

use std::marker::PhantomData;

use serde::Serialize;

use super::filter::FilterExpr;
use super::value::SqlValue;
use super::SqlWriter;
use crate::dialect::Dialect;
use crate::schema::SchemaFields;

// Typestate markers

/// Marker: No projection specified yet.
pub struct NoColumns;
/// Marker: Projection has been specified.
pub struct HasColumns;
/// Marker: No FROM clause specified yet.
pub struct NoFrom;
/// Marker: FROM clause has been specified.
pub struct HasFrom;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses `ASC`/`DESC`, case-insensitively. Anything else is ascending.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    const fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

enum Projection {
    All,
    Columns(Vec<String>),
    Count,
    Distinct(String),
}

/// A SELECT statement builder.
pub struct Select<Cols, From> {
    projection: Projection,
    table: String,
    where_clause: Option<FilterExpr>,
    order_by: Vec<(String, SortOrder)>,
    limit: Option<u64>,
    offset: Option<u64>,
    _state: PhantomData<(Cols, From)>,
}

impl Select<NoColumns, NoFrom> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            projection: Projection::All,
            table: String::new(),
            where_clause: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            _state: PhantomData,
        }
    }
}

impl Default for Select<NoColumns, NoFrom> {
    fn default() -> Self {
        Self::new()
    }
}

impl<From> Select<NoColumns, From> {
    fn project(self, projection: Projection) -> Select<HasColumns, From> {
        Select {
            projection,
            table: self.table,
            where_clause: self.where_clause,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            _state: PhantomData,
        }
    }

    /// Selects the given columns.
    #[must_use]
    pub fn columns(self, cols: &[&str]) -> Select<HasColumns, From> {
        self.project(Projection::Columns(
            cols.iter().map(|c| (*c).to_string()).collect(),
        ))
    }

    /// Selects all columns (`*`).
    #[must_use]
    pub fn all(self) -> Select<HasColumns, From> {
        self.project(Projection::All)
    }

    /// Selects `COUNT(*) AS count`.
    #[must_use]
    pub fn count(self) -> Select<HasColumns, From> {
        self.project(Projection::Count)
    }

    /// Selects the distinct values of one column.
    #[must_use]
    pub fn distinct(self, column: &str) -> Select<HasColumns, From> {
        self.project(Projection::Distinct(column.to_string()))
    }
}

impl<Cols> Select<Cols, NoFrom> {
    #[must_use]
    pub fn from(self, table: &str) -> Select<Cols, HasFrom> {
        Select {
            projection: self.projection,
            table: table.to_string(),
            where_clause: self.where_clause,
            order_by: self.order_by,
            limit: self.limit,
            offset: self.offset,
            _state: PhantomData,
        }
    }
}

impl Select<HasColumns, HasFrom> {
    #[must_use]
    pub fn where_clause(mut self, expr: FilterExpr) -> Self {
        self.where_clause = Some(expr);
        self
    }

    /// Sets the WHERE clause when a filter is present.
    #[must_use]
    pub fn filter(mut self, expr: Option<FilterExpr>) -> Self {
        self.where_clause = expr;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, order: SortOrder) -> Self {
        self.order_by.push((column.to_string(), order));
        self
    }

    #[must_use]
    pub const fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub const fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Builds the SELECT statement and returns SQL with parameters.
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
        writer.push("SELECT ");
        match &self.projection {
            Projection::All => writer.push("*"),
            Projection::Columns(cols) => writer.push(&cols.join(", ")),
            Projection::Count => writer.push("COUNT(*) AS count"),
            Projection::Distinct(col) => writer.push(&format!("DISTINCT {col}")),
        }
        writer.push(" FROM ");
        writer.push(&self.table);

        if let Some(expr) = &self.where_clause {
            writer.push(" WHERE ");
            expr.write(&mut writer);
        }

        if !self.order_by.is_empty() {
            let parts: Vec<String> = self
                .order_by
                .iter()
                .map(|(col, order)| format!("{col} {}", order.as_sql()))
                .collect();
            writer.push(" ORDER BY ");
            writer.push(&parts.join(", "));
        }

        let ordered = !self.order_by.is_empty();
        dialect.paginate(writer.sql_mut(), self.limit, self.offset, ordered);
        writer.finish()
    }
}
