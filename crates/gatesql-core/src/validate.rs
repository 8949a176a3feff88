//! Document validation against a table's declared fields.
//!
//! Create requests pass through [`DocumentValidator`] before they are
//! compiled: unknown fields are refused, defaults and generated IDs are
//! filled in, timestamp fields are stamped and every value is coerced to
//! the declared [`Kind`].

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::builder::SqlValue;
use crate::crud::{documents, Row};
use crate::error::{Error, Result};
use crate::schema::{Kind, SchemaFieldType, SchemaFields};

/// Validates documents written to one collection.
#[derive(Debug, Clone)]
pub struct DocumentValidator<'a> {
    collection: &'a str,
    fields: &'a SchemaFields,
    now: DateTime<Utc>,
}

impl<'a> DocumentValidator<'a> {
    #[must_use]
    pub fn new(collection: &'a str, fields: &'a SchemaFields) -> Self {
        Self {
            collection,
            fields,
            now: Utc::now(),
        }
    }

    /// Uses a fixed time for `createdAt`/`updatedAt` fields.
    #[must_use]
    pub const fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Validates an object or an array of objects.
    pub fn validate(&self, document: &Value) -> Result<Vec<Row>> {
        documents(document)?
            .into_iter()
            .map(|object| self.validate_one(object))
            .collect()
    }

    /// Validates one object and returns the row to insert.
    ///
    /// Optional fields that are absent stay absent, so the column default
    /// of the database applies.
    pub fn validate_one(&self, document: &Map<String, Value>) -> Result<Row> {
        self.validate_fields(self.fields, document)
    }

    fn validate_fields(&self, fields: &SchemaFields, document: &Map<String, Value>) -> Result<Row> {
        if let Some(unknown) = document.keys().find(|key| !fields.contains_key(*key)) {
            return Err(Error::UnknownField {
                field: unknown.clone(),
                collection: self.collection.to_string(),
            });
        }

        let mut row = Row::new();
        for (name, field) in fields {
            let mut value = document.get(name).cloned();

            if field.is_linked {
                if value.is_some() {
                    return Err(Error::LinkedFieldWrite {
                        field: name.clone(),
                        collection: self.collection.to_string(),
                    });
                }
                continue;
            }
            if field.is_auto_increment {
                continue;
            }
            if value.is_none() {
                value = field.default.clone();
            }
            if value.is_none() && field.kind == Kind::Id {
                value = Some(Value::String(Uuid::now_v7().to_string()));
            }
            if field.is_created_at || field.is_updated_at {
                row.insert(name.clone(), SqlValue::Timestamp(self.now));
                continue;
            }

            match value {
                None | Some(Value::Null) if field.is_required => {
                    return Err(Error::MissingField {
                        field: name.clone(),
                        collection: self.collection.to_string(),
                    });
                }
                None => {}
                Some(value) => {
                    row.insert(name.clone(), self.check_type(field, &value)?);
                }
            }
        }
        Ok(row)
    }

    fn check_type(&self, field: &SchemaFieldType, value: &Value) -> Result<SqlValue> {
        if field.kind == Kind::Json {
            return Ok(SqlValue::Json(value.clone()));
        }

        match value {
            Value::Null => Ok(SqlValue::Null),
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    match field.kind {
                        Kind::DateTime => self.from_millis(field, int),
                        Kind::Integer => Ok(SqlValue::Int(int)),
                        Kind::Float => Ok(SqlValue::Float(int as f64)),
                        _ => Err(self.mismatch(field, "Integer")),
                    }
                } else {
                    let float = number.as_f64().unwrap_or(f64::NAN);
                    match field.kind {
                        Kind::DateTime => self.from_millis(field, float as i64),
                        Kind::Float => Ok(SqlValue::Float(float)),
                        Kind::Integer if float.fract() == 0.0 && float.abs() < 9.0e15 => {
                            Ok(SqlValue::Int(float as i64))
                        }
                        _ => Err(self.mismatch(field, "Float")),
                    }
                }
            }
            Value::String(text) => match field.kind {
                Kind::DateTime => DateTime::parse_from_rfc3339(text)
                    .map(|parsed| SqlValue::Timestamp(parsed.with_timezone(&Utc)))
                    .map_err(|_| self.mismatch(field, "String (use RFC3339)")),
                Kind::Uuid => Uuid::parse_str(text)
                    .map(|_| SqlValue::Text(text.clone()))
                    .map_err(|_| self.mismatch(field, "String (not a UUID)")),
                Kind::Id | Kind::String | Kind::Time | Kind::Date => {
                    Ok(SqlValue::Text(text.clone()))
                }
                _ => Err(self.mismatch(field, "String")),
            },
            Value::Bool(flag) => match field.kind {
                Kind::Boolean => Ok(SqlValue::Bool(*flag)),
                _ => Err(self.mismatch(field, "Bool")),
            },
            Value::Object(object) => {
                let nested = match (&field.kind, &field.nested_object) {
                    (Kind::Object, Some(nested)) => nested,
                    _ => return Err(self.mismatch(field, "Object")),
                };
                let row = self.validate_fields(nested, object)?;
                Ok(SqlValue::Json(row_to_json(row)))
            }
            Value::Array(items) => {
                if !field.is_list {
                    return Err(self.mismatch(field, "Array"));
                }
                let items = items
                    .iter()
                    .map(|item| self.check_type(field, item).map(|value| value.to_json()))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SqlValue::Json(Value::Array(items)))
            }
        }
    }

    fn from_millis(&self, field: &SchemaFieldType, millis: i64) -> Result<SqlValue> {
        DateTime::from_timestamp_millis(millis)
            .map(SqlValue::Timestamp)
            .ok_or_else(|| self.mismatch(field, "Integer (out of range)"))
    }

    fn mismatch(&self, field: &SchemaFieldType, received: &str) -> Error {
        Error::TypeMismatch {
            field: field.field_name.clone(),
            collection: self.collection.to_string(),
            expected: field.kind.to_string(),
            received: received.to_string(),
        }
    }
}

fn row_to_json(row: Row) -> Value {
    Value::Object(
        row.into_iter()
            .map(|(column, value)| (column, value.to_json()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::fields;
    use chrono::TimeZone;
    use serde_json::json;

    fn users() -> SchemaFields {
        fields([
            SchemaFieldType::new("id", Kind::Id).primary(),
            SchemaFieldType::new("name", Kind::String).required(),
            SchemaFieldType::new("age", Kind::Integer),
            SchemaFieldType::new("score", Kind::Float),
            SchemaFieldType::new("active", Kind::Boolean).default_value(true),
            SchemaFieldType::new("born", Kind::DateTime),
            SchemaFieldType::new("created", Kind::DateTime).created_at(),
            SchemaFieldType::new("seq", Kind::Integer).auto_increment(),
            SchemaFieldType::new("posts", Kind::Object).linked("posts", "author"),
            SchemaFieldType::new("meta", Kind::Json),
            SchemaFieldType::new("tags", Kind::String).list(),
        ])
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_fills_defaults_ids_and_timestamps() {
        let schema = users();
        let validator = DocumentValidator::new("users", &schema).at(now());
        let row = validator
            .validate_one(json!({"name": "ann", "age": 3, "score": 2}).as_object().unwrap())
            .unwrap();

        assert_eq!(row["name"], SqlValue::Text("ann".into()));
        assert_eq!(row["age"], SqlValue::Int(3));
        assert_eq!(row["score"], SqlValue::Float(2.0));
        assert_eq!(row["active"], SqlValue::Bool(true));
        assert_eq!(row["created"], SqlValue::Timestamp(now()));
        assert!(matches!(&row["id"], SqlValue::Text(id) if Uuid::parse_str(id).is_ok()));
        assert!(!row.contains_key("seq"));
        assert!(!row.contains_key("posts"));
        assert!(!row.contains_key("born"));
    }

    #[test]
    fn test_created_at_ignores_input() {
        let schema = users();
        let validator = DocumentValidator::new("users", &schema).at(now());
        let row = validator
            .validate_one(json!({"name": "a", "created": "1999-01-01T00:00:00Z"}).as_object().unwrap())
            .unwrap();
        assert_eq!(row["created"], SqlValue::Timestamp(now()));
    }

    #[test]
    fn test_rejects_unknown_missing_and_linked() {
        let schema = users();
        let validator = DocumentValidator::new("users", &schema);

        let unknown = validator.validate(&json!({"name": "a", "nope": 1}));
        assert!(matches!(unknown, Err(Error::UnknownField { field, .. }) if field == "nope"));

        let missing = validator.validate(&json!({"age": 1}));
        assert!(matches!(missing, Err(Error::MissingField { field, .. }) if field == "name"));

        let null = validator.validate(&json!({"name": null}));
        assert!(matches!(null, Err(Error::MissingField { .. })));

        let linked = validator.validate(&json!({"name": "a", "posts": []}));
        assert!(matches!(linked, Err(Error::LinkedFieldWrite { .. })));
    }

    #[test]
    fn test_type_coercion() {
        let schema = users();
        let validator = DocumentValidator::new("users", &schema);
        let row = validator
            .validate_one(
                json!({
                    "name": "a",
                    "born": 1_704_164_645_000_i64,
                    "age": 4.0,
                    "meta": {"k": [1, 2]},
                    "tags": ["x", "y"]
                })
                .as_object()
                .unwrap(),
            )
            .unwrap();
        assert_eq!(row["born"], SqlValue::Timestamp(now()));
        assert_eq!(row["age"], SqlValue::Int(4));
        assert_eq!(row["meta"], SqlValue::Json(json!({"k": [1, 2]})));
        assert_eq!(row["tags"], SqlValue::Json(json!(["x", "y"])));

        let row = validator
            .validate_one(json!({"name": "a", "born": "2024-01-02T03:04:05Z"}).as_object().unwrap())
            .unwrap();
        assert_eq!(row["born"], SqlValue::Timestamp(now()));
    }

    #[test]
    fn test_type_mismatches() {
        let schema = users();
        let validator = DocumentValidator::new("users", &schema);
        for document in [
            json!({"name": 5}),
            json!({"name": "a", "age": "5"}),
            json!({"name": "a", "age": 1.5}),
            json!({"name": "a", "active": "yes"}),
            json!({"name": "a", "born": "yesterday"}),
            json!({"name": "a", "age": [1]}),
            json!({"name": "a", "score": {"v": 1}}),
            json!({"name": "a", "tags": [1]}),
        ] {
            assert!(
                matches!(validator.validate(&document), Err(Error::TypeMismatch { .. })),
                "{document}"
            );
        }
    }

    #[test]
    fn test_nested_objects_and_arrays_of_documents() {
        let schema = fields([
            SchemaFieldType::new("id", Kind::Id),
            SchemaFieldType::new("address", Kind::Object).nested(fields([
                SchemaFieldType::new("city", Kind::String).required(),
                SchemaFieldType::new("zip", Kind::Integer),
            ])),
        ]);
        let validator = DocumentValidator::new("people", &schema);
        let rows = validator
            .validate(&json!([
                {"id": "1", "address": {"city": "Oslo", "zip": 150}},
                {"id": "2"}
            ]))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0]["address"],
            SqlValue::Json(json!({"city": "Oslo", "zip": 150}))
        );

        let nested_missing = validator.validate(&json!({"address": {"zip": 1}}));
        assert!(matches!(nested_missing, Err(Error::MissingField { field, .. }) if field == "city"));
    }

    #[test]
    fn test_uuid_fields_are_checked() {
        let schema = fields([SchemaFieldType::new("ref", Kind::Uuid)]);
        let validator = DocumentValidator::new("t", &schema);
        assert!(validator
            .validate(&json!({"ref": "67e55044-10b1-426f-9247-bb680e5fe0c8"}))
            .is_ok());
        assert!(validator.validate(&json!({"ref": "nope"})).is_err());
    }
}
