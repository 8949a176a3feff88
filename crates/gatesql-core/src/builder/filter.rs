//! Filter expressions for WHERE clauses.
//!
//! Requests carry their filter as a JSON object in the document-store
//! style (`{"age": {"$gt": 18}, "$or": [...]}`); [`FilterExpr::from_find`]
//! parses it into an expression tree that renders with bound parameters.

use std::fmt;

use serde_json::{Map, Value};

use super::value::{SqlValue, ToSqlValue};
use super::{identifier, SqlWriter};
use crate::error::{Error, Result};

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Simple comparison: field op value
    Comparison {
        field: String,
        op: CompareOp,
        value: SqlValue,
    },
    IsNull {
        field: String,
    },
    IsNotNull {
        field: String,
    },
    InList {
        field: String,
        values: Vec<SqlValue>,
    },
    NotInList {
        field: String,
        values: Vec<SqlValue>,
    },
    Like {
        field: String,
        pattern: String,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

impl FilterExpr {
    /// Creates an equality filter (field = value).
    pub fn eq<V: ToSqlValue>(field: &str, value: V) -> Self {
        Self::Comparison {
            field: field.to_string(),
            op: CompareOp::Eq,
            value: value.to_sql_value(),
        }
    }

    /// Combines two filters with AND.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        match self {
            Self::And(mut items) => {
                items.push(other);
                Self::And(items)
            }
            first => Self::And(vec![first, other]),
        }
    }

    /// Parses a request filter.
    ///
    /// Top-level keys are ANDed together. An empty filter yields `None`,
    /// which callers render as "no WHERE clause".
    pub fn from_find(find: &Map<String, Value>) -> Result<Option<Self>> {
        let mut parts = Vec::new();
        for (key, value) in find {
            match key.as_str() {
                "$or" | "$and" => {
                    let branches = value.as_array().ok_or_else(|| {
                        Error::invalid(format!("{key} expects an array of filters"))
                    })?;
                    let mut items = Vec::new();
                    for branch in branches {
                        let object = branch.as_object().ok_or_else(|| {
                            Error::invalid(format!("{key} expects an array of filters"))
                        })?;
                        if let Some(expr) = Self::from_find(object)? {
                            items.push(expr);
                        }
                    }
                    if !items.is_empty() {
                        parts.push(if key == "$or" {
                            Self::Or(items)
                        } else {
                            Self::And(items)
                        });
                    }
                }
                op if op.starts_with('$') => {
                    return Err(Error::invalid(format!("unknown filter operator ({op})")));
                }
                field => parts.extend(Self::field_filter(identifier(field)?, value)?),
            }
        }

        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(Self::And(parts)),
        })
    }

    fn field_filter(field: &str, value: &Value) -> Result<Vec<Self>> {
        let operators = match value {
            Value::Object(map) if !map.is_empty() && map.keys().all(|k| k.starts_with('$')) => map,
            other => return Ok(vec![Self::compare(field, CompareOp::Eq, other)]),
        };

        let mut parts = Vec::with_capacity(operators.len());
        for (op, operand) in operators {
            let expr = match op.as_str() {
                "$eq" => Self::compare(field, CompareOp::Eq, operand),
                "$ne" => Self::compare(field, CompareOp::Ne, operand),
                "$gt" => Self::compare(field, CompareOp::Gt, operand),
                "$gte" => Self::compare(field, CompareOp::Gte, operand),
                "$lt" => Self::compare(field, CompareOp::Lt, operand),
                "$lte" => Self::compare(field, CompareOp::Lte, operand),
                "$in" | "$nin" => {
                    let values = operand
                        .as_array()
                        .ok_or_else(|| Error::invalid(format!("{op} on {field} expects an array")))?
                        .iter()
                        .map(SqlValue::from_json)
                        .collect();
                    if op == "$in" {
                        Self::InList {
                            field: field.to_string(),
                            values,
                        }
                    } else {
                        Self::NotInList {
                            field: field.to_string(),
                            values,
                        }
                    }
                }
                "$like" => Self::Like {
                    field: field.to_string(),
                    pattern: operand
                        .as_str()
                        .ok_or_else(|| Error::invalid(format!("$like on {field} expects a string")))?
                        .to_string(),
                },
                other => {
                    return Err(Error::invalid(format!(
                        "unknown filter operator ({other}) on {field}"
                    )));
                }
            };
            parts.push(expr);
        }
        Ok(parts)
    }

    fn compare(field: &str, op: CompareOp, value: &Value) -> Self {
        match (op, value) {
            (CompareOp::Eq, Value::Null) => Self::IsNull {
                field: field.to_string(),
            },
            (CompareOp::Ne, Value::Null) => Self::IsNotNull {
                field: field.to_string(),
            },
            _ => Self::Comparison {
                field: field.to_string(),
                op,
                value: SqlValue::from_json(value),
            },
        }
    }

    /// Renders the expression into `writer`.
    pub fn write(&self, writer: &mut SqlWriter<'_>) {
        match self {
            Self::Comparison { field, op, value } => {
                writer.push(&format!("{field} {op} "));
                writer.bind_column(field, value.clone());
            }
            Self::IsNull { field } => writer.push(&format!("{field} IS NULL")),
            Self::IsNotNull { field } => writer.push(&format!("{field} IS NOT NULL")),
            Self::InList { values, .. } if values.is_empty() => writer.push("1 = 0"),
            Self::NotInList { values, .. } if values.is_empty() => writer.push("1 = 1"),
            Self::InList { field, values } => write_list(writer, field, "IN", values),
            Self::NotInList { field, values } => write_list(writer, field, "NOT IN", values),
            Self::Like { field, pattern } => {
                writer.push(&format!("{field} LIKE "));
                writer.bind(SqlValue::Text(pattern.clone()));
            }
            Self::And(items) => write_joined(writer, items, " AND ", "1 = 1"),
            Self::Or(items) => write_joined(writer, items, " OR ", "1 = 0"),
        }
    }
}

fn write_list(writer: &mut SqlWriter<'_>, field: &str, keyword: &str, values: &[SqlValue]) {
    writer.push(&format!("{field} {keyword} ("));
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            writer.push(", ");
        }
        writer.bind_column(field, value.clone());
    }
    writer.push(")");
}

fn write_joined(writer: &mut SqlWriter<'_>, items: &[FilterExpr], separator: &str, empty: &str) {
    match items {
        [] => writer.push(empty),
        [single] => single.write(writer),
        _ => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    writer.push(separator);
                }
                writer.push("(");
                item.write(writer);
                writer.push(")");
            }
        }
    }
}
