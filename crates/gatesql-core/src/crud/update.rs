//! Update-operator compiler.
//!
//! Every operator of an update request compiles to its own UPDATE
//! statement. `$set` binds its values; the numeric operators render their
//! operand inline as a decimal literal, and `$currentDate` uses the
//! dialect's time function.

use std::fmt;

use serde_json::{Map, Value};

use super::{qualified_table, Operation, UpdateRequest};
use crate::builder::{identifier, Assignment, Extremum, FilterExpr, SqlValue, Update};
use crate::dialect::{CurrentTime, Dialect};
use crate::error::{Error, Result};
use crate::schema::SchemaFields;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// A Mongo-style update verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateOperator {
    Set,
    Inc,
    Mul,
    Max,
    Min,
    CurrentDate,
}

impl UpdateOperator {
    /// Parses `$set`, `$inc`, ... ; anything else is `None`.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "$set" => Some(Self::Set),
            "$inc" => Some(Self::Inc),
            "$mul" => Some(Self::Mul),
            "$max" => Some(Self::Max),
            "$min" => Some(Self::Min),
            "$currentDate" => Some(Self::CurrentDate),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Set => "$set",
            Self::Inc => "$inc",
            Self::Mul => "$mul",
            Self::Max => "$max",
            Self::Min => "$min",
            Self::CurrentDate => "$currentDate",
        }
    }

    fn assignment(self, column: &str, operand: &Value) -> Result<Assignment> {
        let column = column.to_string();
        Ok(match self {
            Self::Set => Assignment::Set {
                value: SqlValue::from_json(operand),
                column,
            },
            Self::Inc => Assignment::Increment {
                by: numeric_operand(self, &column, operand)?,
                column,
            },
            Self::Mul => Assignment::Multiply {
                by: numeric_operand(self, &column, operand)?,
                column,
            },
            Self::Max | Self::Min => Assignment::Extremal {
                value: numeric_operand(self, &column, operand)?,
                extremum: if self == Self::Max {
                    Extremum::Greatest
                } else {
                    Extremum::Least
                },
                column,
            },
            Self::CurrentDate => Assignment::CurrentTime {
                kind: current_time_operand(&column, operand)?,
                column,
            },
        })
    }
}

impl fmt::Display for UpdateOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn numeric_operand(operator: UpdateOperator, column: &str, operand: &Value) -> Result<f64> {
    let invalid = || {
        Error::invalid(format!(
            "{operator} on {column} expects a finite number, got {operand}"
        ))
    };
    let Value::Number(number) = operand else {
        return Err(invalid());
    };
    if let Some(int) = number.as_i64() {
        if int.unsigned_abs() > MAX_EXACT_INTEGER {
            return Err(invalid());
        }
    } else if number.as_u64().is_some() {
        return Err(invalid());
    }
    number
        .as_f64()
        .filter(|value| value.is_finite())
        .ok_or_else(invalid)
}

/// Accepts `"date"`, `"timestamp"` or `{"$type": "date" | "timestamp"}`.
fn current_time_operand(column: &str, operand: &Value) -> Result<CurrentTime> {
    match operand {
        Value::String(kind) => CurrentTime::parse(kind),
        Value::Object(object) if object.len() == 1 => match object.get("$type") {
            Some(Value::String(kind)) => CurrentTime::parse(kind),
            _ => Err(Error::invalid(format!(
                "$currentDate on {column} expects {{\"$type\": \"date\" | \"timestamp\"}}"
            ))),
        },
        other => Err(Error::invalid(format!(
            "$currentDate on {column} expects \"date\" or \"timestamp\", got {other}"
        ))),
    }
}

/// One operator of an update request, compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUpdate {
    pub operator: UpdateOperator,
    pub sql: String,
    pub params: Vec<SqlValue>,
    /// The operator's field/value object as it arrived.
    pub fields: Map<String, Value>,
}

impl CompiledUpdate {
    /// The document inserted when an upsert's UPDATE matches no row.
    ///
    /// `$currentDate` has no insertable value and fails.
    pub fn insert_on_miss(&self) -> Result<Value> {
        if self.operator == UpdateOperator::CurrentDate {
            return Err(Error::invalid(
                "$currentDate cannot insert a document on upsert",
            ));
        }
        Ok(Value::Object(self.fields.clone()))
    }
}

/// Compiles every operator of `request`, in operator-name order.
///
/// All operators are checked before anything is returned, so an unknown
/// operator never leaves a request half applied.
pub fn compile_update(
    dialect: &dyn Dialect,
    project: &str,
    table: &str,
    request: &UpdateRequest,
    schema: Option<&SchemaFields>,
) -> Result<Vec<CompiledUpdate>> {
    match request.operation {
        Operation::All | Operation::Upsert => {}
        other => {
            return Err(Error::invalid(format!(
                "invalid operation ({other}) for update, use all or upsert"
            )));
        }
    }
    if request.update.is_empty() {
        return Err(Error::invalid("update has no operators"));
    }

    let target = qualified_table(dialect, project, table)?;
    let filter = FilterExpr::from_find(&request.find)?;

    request
        .update
        .iter()
        .map(|(key, fields)| {
            let operator = UpdateOperator::parse(key)
                .ok_or_else(|| Error::invalid(format!("unsupported update operator ({key})")))?;
            let fields = match fields {
                Value::Object(fields) if !fields.is_empty() => fields,
                _ => {
                    return Err(Error::invalid(format!(
                        "{operator} expects a non-empty object of fields"
                    )));
                }
            };

            let mut assignments = fields
                .iter()
                .map(|(column, operand)| operator.assignment(identifier(column)?, operand));
            // `fields` is non-empty, so the first assignment exists.
            let first = assignments
                .next()
                .ok_or_else(|| Error::invalid(format!("{operator} has no fields")))??;
            let mut update = Update::table(&target).assign(first);
            for assignment in assignments {
                update = update.assign(assignment?);
            }
            let (sql, params) = update.filter(filter.clone()).build_typed(dialect, schema);

            Ok(CompiledUpdate {
                operator,
                sql,
                params,
                fields: fields.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect, SqlServerDialect};
    use serde_json::json;

    fn request(operation: Operation, find: Value, update: Value) -> UpdateRequest {
        UpdateRequest {
            find: find.as_object().cloned().unwrap_or_default(),
            operation,
            update: update.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_inc_renders_inline() {
        let compiled = compile_update(
            &MySqlDialect::new(),
            "app",
            "players",
            &request(Operation::All, json!({"id": "u1"}), json!({"$inc": {"score": 5}})),
            None,
        )
        .unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(
            compiled[0].sql,
            "UPDATE app.players SET score=score+5 WHERE id = ?"
        );
        assert_eq!(compiled[0].params, vec![SqlValue::Text("u1".into())]);
    }

    #[test]
    fn test_set_null_and_timestamps_on_typed_postgres_columns() {
        use crate::schema::{Kind, SchemaFieldType};

        let fields = SchemaFields::from([
            ("id".to_string(), SchemaFieldType::new("id", Kind::Id)),
            ("age".to_string(), SchemaFieldType::new("age", Kind::Integer)),
            ("born".to_string(), SchemaFieldType::new("born", Kind::DateTime)),
        ]);
        let compiled = compile_update(
            &PostgresDialect::new(),
            "app",
            "people",
            &request(
                Operation::All,
                json!({"born": {"$lt": "2000-01-01T00:00:00Z"}}),
                json!({"$set": {"age": null, "born": "1990-05-17T08:30:00Z"}}),
            ),
            Some(&fields),
        )
        .unwrap();
        assert_eq!(
            compiled[0].sql,
            "UPDATE app.people SET age=CAST($1 AS bigint), born=CAST($2 AS timestamp) \
             WHERE born < CAST($3 AS timestamp)"
        );
        assert_eq!(compiled[0].params[0], SqlValue::Null);
    }

    #[test]
    fn test_one_statement_per_operator() {
        let compiled = compile_update(
            &PostgresDialect::new(),
            "app",
            "stats",
            &request(
                Operation::All,
                json!({"id": "s"}),
                json!({
                    "$set": {"name": "x", "flag": true},
                    "$mul": {"ratio": 1.5},
                    "$max": {"high": 10},
                    "$min": {"low": -2},
                    "$currentDate": {"seen": "timestamp", "day": {"$type": "date"}}
                }),
            ),
            None,
        )
        .unwrap();
        let sql: Vec<&str> = compiled.iter().map(|c| c.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "UPDATE app.stats SET day=CURRENT_DATE, seen=CURRENT_TIMESTAMP WHERE id = $1",
                "UPDATE app.stats SET high=GREATEST(high,10) WHERE id = $1",
                "UPDATE app.stats SET low=LEAST(low,-2) WHERE id = $1",
                "UPDATE app.stats SET ratio=ratio*1.5 WHERE id = $1",
                "UPDATE app.stats SET flag=$1, name=$2 WHERE id = $3",
            ]
        );
        assert_eq!(
            compiled[4].params,
            vec![
                SqlValue::Bool(true),
                SqlValue::Text("x".into()),
                SqlValue::Text("s".into())
            ]
        );
    }

    #[test]
    fn test_current_date_per_dialect() {
        let update = json!({"$currentDate": {"at": "timestamp", "on": "date"}});
        let mysql = compile_update(
            &MySqlDialect::new(),
            "p",
            "t",
            &request(Operation::All, json!({}), update.clone()),
            None,
        )
        .unwrap();
        assert_eq!(
            mysql[0].sql,
            "UPDATE p.t SET at=CURRENT_TIMESTAMP(), on=CURRENT_DATE()"
        );
        let mssql = compile_update(
            &SqlServerDialect::new(),
            "p",
            "t",
            &request(Operation::All, json!({}), update),
            None,
        )
        .unwrap();
        assert_eq!(
            mssql[0].sql,
            "UPDATE p.t SET at=CURRENT_TIMESTAMP, on=CAST(CURRENT_TIMESTAMP AS DATE)"
        );
    }

    #[test]
    fn test_rejects_bad_requests() {
        let dialect = MySqlDialect::new();
        let cases = [
            request(Operation::One, json!({}), json!({"$set": {"a": 1}})),
            request(Operation::All, json!({}), json!({})),
            request(Operation::All, json!({}), json!({"$push": {"a": 1}})),
            request(Operation::All, json!({}), json!({"$set": {"a": 1}, "$unset": {"b": ""}})),
            request(Operation::All, json!({}), json!({"$set": {}})),
            request(Operation::All, json!({}), json!({"$inc": {"a": "5"}})),
            request(Operation::All, json!({}), json!({"$mul": {"a": null}})),
            request(Operation::All, json!({}), json!({"$inc": {"a": 9_007_199_254_740_993_i64}})),
            request(Operation::All, json!({}), json!({"$currentDate": {"a": "now"}})),
            request(Operation::All, json!({}), json!({"$currentDate": {"a": true}})),
            request(Operation::All, json!({}), json!({"$set": {"a;b": 1}})),
        ];
        for case in &cases {
            assert!(
                matches!(
                    compile_update(&dialect, "p", "t", case, None),
                    Err(Error::InvalidParams(_))
                ),
                "{case:?}"
            );
        }
    }

    #[test]
    fn test_large_exact_integers_are_accepted() {
        let compiled = compile_update(
            &MySqlDialect::new(),
            "p",
            "t",
            &request(
                Operation::All,
                json!({}),
                json!({"$inc": {"a": 9_007_199_254_740_992_i64}}),
            ),
            None,
        )
        .unwrap();
        assert_eq!(compiled[0].sql, "UPDATE p.t SET a=a+9007199254740992");
    }

    #[test]
    fn test_insert_on_miss() {
        let compiled = compile_update(
            &PostgresDialect::new(),
            "p",
            "t",
            &request(
                Operation::Upsert,
                json!({"id": "1"}),
                json!({"$set": {"id": "1", "n": 2}, "$currentDate": {"at": "date"}}),
            ),
            None,
        )
        .unwrap();
        assert!(matches!(
            compiled[0].insert_on_miss(),
            Err(Error::InvalidParams(_))
        ));
        assert_eq!(
            compiled[1].insert_on_miss().unwrap(),
            json!({"id": "1", "n": 2})
        );
    }

    #[test]
    fn test_operator_names() {
        for key in ["$set", "$inc", "$mul", "$max", "$min", "$currentDate"] {
            assert_eq!(UpdateOperator::parse(key).unwrap().as_str(), key);
        }
        assert_eq!(UpdateOperator::parse("$rename"), None);
    }
}
