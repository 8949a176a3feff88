//! Schema model shared by the differ, the inspector and the document
//! validator.
//!
//! A [`SchemaCollection`] maps table names to [`SchemaFields`], which in
//! turn map field names to a [`SchemaFieldType`]. Both maps are ordered so
//! that every consumer walks fields in the same sorted order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dialect::{Dialect, MySqlDialect, PostgresDialect, SqlServerDialect};

/// Fields of one table, keyed by field name.
pub type SchemaFields = BTreeMap<String, SchemaFieldType>;

/// Tables of one project, keyed by table name.
pub type SchemaCollection = BTreeMap<String, SchemaFields>;

/// Supported SQL backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DbType {
    #[serde(rename = "sql-mysql")]
    MySql,
    #[serde(rename = "sql-postgres")]
    Postgres,
    #[serde(rename = "sql-sqlserver")]
    SqlServer,
}

impl DbType {
    /// Returns the identifier used in configuration files and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MySql => "sql-mysql",
            Self::Postgres => "sql-postgres",
            Self::SqlServer => "sql-sqlserver",
        }
    }

    /// Returns the dialect used to render statements for this backend.
    #[must_use]
    pub fn dialect(self) -> &'static dyn Dialect {
        static MYSQL: MySqlDialect = MySqlDialect::new();
        static POSTGRES: PostgresDialect = PostgresDialect::new();
        static SQLSERVER: SqlServerDialect = SqlServerDialect::new();

        match self {
            Self::MySql => &MYSQL,
            Self::Postgres => &POSTGRES,
            Self::SqlServer => &SQLSERVER,
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical field kind.
///
/// List-ness is orthogonal and carried by [`SchemaFieldType::is_list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Kind {
    #[default]
    #[serde(rename = "ID")]
    Id,
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Date,
    Time,
    #[serde(rename = "UUID")]
    Uuid,
    #[serde(rename = "JSON")]
    Json,
    Object,
}

impl Kind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::String => "String",
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Boolean => "Boolean",
            Self::DateTime => "DateTime",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Uuid => "UUID",
            Self::Json => "JSON",
            Self::Object => "Object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Referential action applied when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    #[serde(rename = "NO ACTION")]
    NoAction,
    #[serde(rename = "RESTRICT")]
    Restrict,
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "SET DEFAULT")]
    SetDefault,
}

impl ForeignKeyAction {
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }

    /// Parses a `DELETE_RULE` as reported by the information schema.
    ///
    /// The backend defaults (`NO ACTION`, `RESTRICT`) map to `None` so they
    /// compare equal to a field that declares no action at all.
    #[must_use]
    pub fn from_rule(rule: &str) -> Option<Self> {
        match rule.trim().to_ascii_uppercase().replace('_', " ").as_str() {
            "CASCADE" => Some(Self::Cascade),
            "SET NULL" => Some(Self::SetNull),
            "SET DEFAULT" => Some(Self::SetDefault),
            _ => None,
        }
    }

    /// Collapses the backend default actions to `None`.
    #[must_use]
    pub const fn effective(action: Option<Self>) -> Option<Self> {
        match action {
            Some(Self::NoAction | Self::Restrict) | None => None,
            other => other,
        }
    }
}

/// Target of a foreign key or of a linked (virtual) field.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableProperties {
    /// Referenced table.
    pub table: String,
    /// Referenced column.
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_delete: Option<ForeignKeyAction>,
    /// Name of the constraint as found in the database.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_name: Option<String>,
}

impl TableProperties {
    #[must_use]
    pub fn new(table: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            to: to.into(),
            on_delete: None,
            constraint_name: None,
        }
    }

    /// Returns `true` when both point at the same column with the same
    /// delete action. Constraint names are not compared.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.table == other.table
            && self.to == other.to
            && ForeignKeyAction::effective(self.on_delete)
                == ForeignKeyAction::effective(other.on_delete)
    }
}

/// Constraint names discovered by introspection.
///
/// When present they are reused verbatim for drops so that constraints
/// created outside of gatesql can still be removed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintNames {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<String>,
    /// Named default constraint (SQL Server).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ConstraintNames {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.primary.is_none() && self.unique.is_none() && self.default.is_none()
    }
}

/// Declared (or introspected) properties of a single field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFieldType {
    #[serde(default)]
    pub field_name: String,
    pub kind: Kind,
    #[serde(default, rename = "isFieldTypeRequired")]
    pub is_required: bool,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default)]
    pub is_foreign: bool,
    #[serde(default)]
    pub is_linked: bool,
    #[serde(default)]
    pub is_auto_increment: bool,
    #[serde(default)]
    pub is_created_at: bool,
    #[serde(default)]
    pub is_updated_at: bool,
    #[serde(default)]
    pub is_list: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Foreign key target, set when `is_foreign`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_table: Option<TableProperties>,
    /// Source of a linked field, set when `is_linked`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_table: Option<TableProperties>,
    /// Sub-schema of an `Object` field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_object: Option<SchemaFields>,
    #[serde(default, skip_serializing_if = "ConstraintNames::is_empty")]
    pub constraints: ConstraintNames,
}

impl SchemaFieldType {
    #[must_use]
    pub fn new(field_name: impl Into<String>, kind: Kind) -> Self {
        Self {
            field_name: field_name.into(),
            kind,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    #[must_use]
    pub fn foreign(mut self, table: impl Into<String>, to: impl Into<String>) -> Self {
        self.is_foreign = true;
        self.joint_table = Some(TableProperties::new(table, to));
        self
    }

    #[must_use]
    pub fn on_delete(mut self, action: ForeignKeyAction) -> Self {
        if let Some(target) = self.joint_table.as_mut() {
            target.on_delete = Some(action);
        }
        self
    }

    #[must_use]
    pub fn linked(mut self, table: impl Into<String>, to: impl Into<String>) -> Self {
        self.is_linked = true;
        self.linked_table = Some(TableProperties::new(table, to));
        self
    }

    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    #[must_use]
    pub const fn list(mut self) -> Self {
        self.is_list = true;
        self
    }

    #[must_use]
    pub const fn created_at(mut self) -> Self {
        self.is_created_at = true;
        self
    }

    #[must_use]
    pub const fn updated_at(mut self) -> Self {
        self.is_updated_at = true;
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    #[must_use]
    pub fn nested(mut self, fields: SchemaFields) -> Self {
        self.nested_object = Some(fields);
        self
    }

    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.default.is_some()
    }

    /// Primary keys are always NOT NULL, whatever the declaration says.
    #[must_use]
    pub const fn requires_not_null(&self) -> bool {
        self.is_required || self.is_primary
    }

    /// Canonical text of the default, used to compare declared and
    /// introspected defaults.
    #[must_use]
    pub fn default_text(&self) -> Option<String> {
        self.default.as_ref().map(canonical_default)
    }
}

/// Renders a default value the way the inspector reports it: strings
/// unquoted, booleans as `true`/`false`, everything else as JSON text.
#[must_use]
pub fn canonical_default(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::from("NULL"),
        other => other.to_string(),
    }
}

/// Builds a [`SchemaFields`] map from fields, keyed by their names.
#[must_use]
pub fn fields<I>(items: I) -> SchemaFields
where
    I: IntoIterator<Item = SchemaFieldType>,
{
    items
        .into_iter()
        .map(|field| (field.field_name.clone(), field))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_gateway_field_declaration() {
        let field: SchemaFieldType = serde_json::from_value(json!({
            "fieldName": "author",
            "kind": "ID",
            "isFieldTypeRequired": true,
            "isForeign": true,
            "jointTable": { "table": "users", "to": "id", "onDelete": "CASCADE" }
        }))
        .unwrap();

        assert_eq!(field.kind, Kind::Id);
        assert!(field.is_required);
        assert!(field.is_foreign);
        let target = field.joint_table.unwrap();
        assert_eq!(target.table, "users");
        assert_eq!(target.on_delete, Some(ForeignKeyAction::Cascade));
    }

    #[test]
    fn db_type_uses_gateway_identifiers() {
        let db: DbType = serde_json::from_value(json!("sql-sqlserver")).unwrap();
        assert_eq!(db, DbType::SqlServer);
        assert_eq!(db.dialect().db_type(), DbType::SqlServer);
        assert_eq!(DbType::MySql.to_string(), "sql-mysql");
    }

    #[test]
    fn backend_default_actions_compare_equal_to_none() {
        let mut declared = TableProperties::new("users", "id");
        let mut found = TableProperties::new("users", "id");
        found.on_delete = ForeignKeyAction::from_rule("NO ACTION");
        found.constraint_name = Some("fk_author".into());
        assert!(declared.same_target(&found));

        declared.on_delete = Some(ForeignKeyAction::Cascade);
        assert!(!declared.same_target(&found));
    }

    #[test]
    fn canonical_default_strips_string_quotes() {
        assert_eq!(canonical_default(&json!("draft")), "draft");
        assert_eq!(canonical_default(&json!(true)), "true");
        assert_eq!(canonical_default(&json!(4.5)), "4.5");
    }
}
