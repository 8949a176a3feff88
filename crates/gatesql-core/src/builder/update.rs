//! UPDATE statement builder using the typestate pattern.
//!
//! Assignments are data, not text: an increment is
//! [`Assignment::Increment`] and is rendered as `col=col+n` only when the
//! statement is built, so no SQL fragment is ever rewritten after the fact.

use std::marker::PhantomData;

use super::filter::FilterExpr;
use super::value::{SqlValue, ToSqlValue};
use super::SqlWriter;
use crate::dialect::{CurrentTime, Dialect};
use crate::schema::SchemaFields;

// Typestate markers

/// Marker: No SET clause specified yet.
pub struct NoSet;
/// Marker: SET clause has been specified.
pub struct HasSet;

/// Which bound `$max`/`$min` keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Greatest,
    Least,
}

/// An assignment in the SET clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `col=?`, bound.
    Set { column: String, value: SqlValue },
    /// `col=col+n`, inline.
    Increment { column: String, by: f64 },
    /// `col=col*n`, inline.
    Multiply { column: String, by: f64 },
    /// `col=GREATEST(col,n)` or `col=LEAST(col,n)`, inline.
    Extremal {
        column: String,
        value: f64,
        extremum: Extremum,
    },
    /// `col=CURRENT_TIMESTAMP` or the dialect's date equivalent.
    CurrentTime { column: String, kind: CurrentTime },
}

impl Assignment {
    fn write(&self, writer: &mut SqlWriter<'_>) {
        match self {
            Self::Set { column, value } => {
                writer.push(&format!("{column}="));
                writer.bind_column(column, value.clone());
            }
            Self::Increment { column, by } => {
                writer.push(&format!("{column}={column}+{}", numeric_literal(*by)));
            }
            Self::Multiply { column, by } => {
                writer.push(&format!("{column}={column}*{}", numeric_literal(*by)));
            }
            Self::Extremal {
                column,
                value,
                extremum,
            } => {
                let function = match extremum {
                    Extremum::Greatest => "GREATEST",
                    Extremum::Least => "LEAST",
                };
                writer.push(&format!(
                    "{column}={function}({column},{})",
                    numeric_literal(*value)
                ));
            }
            Self::CurrentTime { column, kind } => {
                let now = writer.dialect().current_time(*kind);
                writer.push(&format!("{column}={now}"));
            }
        }
    }
}

/// Shortest decimal text that round-trips. Never uses exponent notation.
fn numeric_literal(value: f64) -> String {
    format!("{value}")
}

/// An UPDATE statement builder.
pub struct Update<Set> {
    table: String,
    assignments: Vec<Assignment>,
    where_clause: Option<FilterExpr>,
    _state: PhantomData<Set>,
}

impl Update<NoSet> {
    /// Specifies the table to update.
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            assignments: Vec::new(),
            where_clause: None,
            _state: PhantomData,
        }
    }

    /// Adds the first assignment.
    #[must_use]
    pub fn assign(self, assignment: Assignment) -> Update<HasSet> {
        Update {
            table: self.table,
            assignments: vec![assignment],
            where_clause: self.where_clause,
            _state: PhantomData,
        }
    }

    /// Adds a bound `col=?` assignment.
    #[must_use]
    pub fn set<T: ToSqlValue>(self, column: &str, value: T) -> Update<HasSet> {
        self.assign(Assignment::Set {
            column: column.to_string(),
            value: value.to_sql_value(),
        })
    }
}

impl Update<HasSet> {
    #[must_use]
    pub fn assign(mut self, assignment: Assignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    #[must_use]
    pub fn set<T: ToSqlValue>(self, column: &str, value: T) -> Self {
        self.assign(Assignment::Set {
            column: column.to_string(),
            value: value.to_sql_value(),
        })
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

    /// Builds the UPDATE statement and returns SQL with parameters.
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
        writer.push(&format!("UPDATE {} SET ", self.table));
        for (i, assignment) in self.assignments.iter().enumerate() {
            if i > 0 {
                writer.push(", ");
            }
            assignment.write(&mut writer);
        }
        if let Some(expr) = &self.where_clause {
            writer.push(" WHERE ");
            expr.write(&mut writer);
        }
        writer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqlServerDialect};
    use crate::schema::{Kind, SchemaFieldType};

    #[test]
    fn test_increment_renders_inline() {
        let (sql, params) = Update::table("app.players")
            .assign(Assignment::Increment {
                column: "score".into(),
                by: 5.0,
            })
            .where_clause(FilterExpr::eq("id", "u1"))
            .build(&MySqlDialect::new());
        assert_eq!(sql, "UPDATE app.players SET score=score+5 WHERE id = ?");
        assert_eq!(params, vec![SqlValue::Text("u1".into())]);
    }

    #[test]
    fn test_set_casts_typed_columns_on_postgres() {
        let mut fields = SchemaFields::new();
        for (name, kind) in [
            ("id", Kind::Id),
            ("age", Kind::Integer),
            ("born", Kind::DateTime),
        ] {
            fields.insert(name.to_string(), SchemaFieldType::new(name, kind));
        }

        let (sql, params) = Update::table("app.people")
            .set("age", SqlValue::Null)
            .set("born", "2024-01-01T00:00:00Z")
            .where_clause(FilterExpr::eq("id", "p1"))
            .build_typed(&PostgresDialect::new(), Some(&fields));
        assert_eq!(
            sql,
            "UPDATE app.people SET age=CAST($1 AS bigint), born=CAST($2 AS timestamp) WHERE id = $3"
        );
        assert_eq!(params[0], SqlValue::Null);

        let (sql, _) = Update::table("app.people")
            .set("age", SqlValue::Null)
            .build_typed(&MySqlDialect::new(), Some(&fields));
        assert_eq!(sql, "UPDATE app.people SET age=?");
    }

    #[test]
    fn test_numeric_literals_do_not_use_exponents() {
        assert_eq!(numeric_literal(0.1), "0.1");
        assert_eq!(numeric_literal(-2.5), "-2.5");
        assert_eq!(numeric_literal(1e21), "1000000000000000000000");
        assert_eq!(numeric_literal(1e-7), "0.0000001");
    }

    #[test]
    fn test_set_binds_before_filter() {
        let (sql, params) = Update::table("app.users")
            .set("name", "bob")
            .set("age", 3_i64)
            .where_clause(FilterExpr::eq("id", "u1"))
            .build(&PostgresDialect::new());
        assert_eq!(sql, "UPDATE app.users SET name=$1, age=$2 WHERE id = $3");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_extremal_and_current_time() {
        let (sql, _) = Update::table("app.t")
            .assign(Assignment::Extremal {
                column: "high".into(),
                value: 10.0,
                extremum: Extremum::Greatest,
            })
            .assign(Assignment::Extremal {
                column: "low".into(),
                value: 1.5,
                extremum: Extremum::Least,
            })
            .assign(Assignment::CurrentTime {
                column: "seen".into(),
                kind: CurrentTime::Date,
            })
            .build(&SqlServerDialect::new());
        assert_eq!(
            sql,
            "UPDATE app.t SET high=GREATEST(high,10), low=LEAST(low,1.5), seen=CAST(CURRENT_TIMESTAMP AS DATE)"
        );
    }
}
