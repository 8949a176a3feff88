//! SQL values and parameter handling.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

/// A value bound to a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    Timestamp(DateTime<Utc>),
    /// Structured value stored in a JSON column.
    Json(Value),
}

impl SqlValue {
    /// Converts a request value without schema information.
    ///
    /// Whole numbers become `Int`, other numbers `Float`; arrays and
    /// objects are kept as JSON.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or(f64::NAN)), Self::Int),
            Value::String(s) => Self::Text(s.clone()),
            other => Self::Json(other.clone()),
        }
    }

    /// Converts back to JSON, e.g. to embed a validated value in an object.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
            Self::Blob(b) => Value::from(b.clone()),
            Self::Timestamp(t) => Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            Self::Json(v) => v.clone(),
        }
    }
}

impl From<&Value> for SqlValue {
    fn from(value: &Value) -> Self {
        Self::from_json(value)
    }
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        match self {
            Some(v) => v.to_sql_value(),
            None => SqlValue::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_integers_whole() {
        assert_eq!(SqlValue::from_json(&json!(5)), SqlValue::Int(5));
        assert_eq!(SqlValue::from_json(&json!(2.5)), SqlValue::Float(2.5));
        assert_eq!(
            SqlValue::from_json(&json!(["a", "b"])),
            SqlValue::Json(json!(["a", "b"]))
        );
        assert_eq!(SqlValue::from_json(&Value::Null), SqlValue::Null);
    }

    #[test]
    fn test_timestamp_to_json_is_rfc3339() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        assert_eq!(
            SqlValue::Timestamp(at).to_json(),
            json!("2024-05-01T12:30:00.000Z")
        );
    }

    #[test]
    fn test_to_sql_value_conversions() {
        assert_eq!(true.to_sql_value(), SqlValue::Bool(true));
        assert_eq!(42_i32.to_sql_value(), SqlValue::Int(42));
        assert_eq!(None::<i32>.to_sql_value(), SqlValue::Null);
        assert_eq!(
            "hello".to_sql_value(),
            SqlValue::Text(String::from("hello"))
        );
    }
}
