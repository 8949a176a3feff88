//! Schema inspector.
//!
//! Driver crates run [`Dialect::describe_query`] and
//! [`Dialect::index_query`] and hand the decoded rows over as a
//! [`TableDescription`]; [`inspect_table`] turns that into the same
//! [`SchemaFields`] model the differ consumes.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::builder::SortOrder;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::schema::{ForeignKeyAction, SchemaFieldType, SchemaFields, TableProperties};

/// One row of the column description query.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InspectorFieldType {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: bool,
    pub ordinal_position: i64,
    /// Canonicalised default, `None` when the column has none.
    pub default_value: Option<String>,
    /// Name of the default constraint, where defaults are named.
    pub default_constraint: Option<String>,
    pub auto_increment: bool,
    pub character_maximum_length: i64,
    pub numeric_precision: i64,
    pub numeric_scale: i64,
}

/// Foreign key carried by a column of the described table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ForeignKeysType {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub constraint_name: String,
    pub delete_rule: String,
    pub referenced_table_schema: String,
    pub referenced_table_name: String,
    pub referenced_column_name: String,
}

/// One column of one index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IndexType {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub index_name: String,
    pub seq_in_index: i64,
    pub sort: SortOrder,
    pub is_unique: bool,
    pub is_primary: bool,
}

/// Raw description of a table as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TableDescription {
    pub fields: Vec<InspectorFieldType>,
    pub foreign_keys: Vec<ForeignKeysType>,
    pub indexes: Vec<IndexType>,
}

/// Converts a table description into schema fields.
///
/// A description without columns means the table does not exist and is
/// reported as [`Error::NotFound`]. Composite unique indexes have no
/// counterpart in the field model and are ignored; a composite primary
/// key marks every participating column as primary.
pub fn inspect_table(
    dialect: &dyn Dialect,
    table: &str,
    description: &TableDescription,
) -> Result<SchemaFields> {
    if description.fields.is_empty() {
        return Err(Error::NotFound {
            db_type: dialect.name().to_string(),
            table: table.to_string(),
        });
    }

    let mut fields = SchemaFields::new();
    for column in &description.fields {
        let kind = dialect
            .kind_of(&column.data_type, column.character_maximum_length)
            .ok_or_else(|| {
                dialect.unsupported(
                    &format!("inspecting type {}", column.data_type),
                    table,
                    &column.column_name,
                )
            })?;

        let mut field = SchemaFieldType::new(&column.column_name, kind);
        field.is_required = !column.is_nullable;
        field.is_auto_increment = column.auto_increment;
        field.default = column
            .default_value
            .as_ref()
            .filter(|value| !value.is_empty())
            .map(|value| Value::String(value.clone()));
        field.constraints.default = column.default_constraint.clone();
        fields.insert(column.column_name.clone(), field);
    }

    for key in &description.foreign_keys {
        if let Some(field) = fields.get_mut(&key.column_name) {
            field.is_foreign = true;
            field.joint_table = Some(TableProperties {
                table: key.referenced_table_name.clone(),
                to: key.referenced_column_name.clone(),
                on_delete: ForeignKeyAction::from_rule(&key.delete_rule),
                constraint_name: Some(key.constraint_name.clone()),
            });
        }
    }

    let mut indexes: BTreeMap<&str, Vec<&IndexType>> = BTreeMap::new();
    for index in &description.indexes {
        indexes.entry(&index.index_name).or_default().push(index);
    }
    for (name, columns) in indexes {
        let Some(first) = columns.first() else {
            continue;
        };
        if first.is_primary {
            for column in &columns {
                if let Some(field) = fields.get_mut(&column.column_name) {
                    field.is_primary = true;
                    field.constraints.primary = Some(name.to_string());
                }
            }
        } else if first.is_unique && columns.len() == 1 {
            if let Some(field) = fields.get_mut(&first.column_name) {
                field.is_unique = true;
                field.constraints.unique = Some(name.to_string());
            }
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{MySqlDialect, PostgresDialect};
    use crate::schema::Kind;

    fn column(name: &str, data_type: &str, nullable: bool) -> InspectorFieldType {
        InspectorFieldType {
            table_schema: "test".into(),
            table_name: "posts".into(),
            column_name: name.into(),
            data_type: data_type.into(),
            is_nullable: nullable,
            ..InspectorFieldType::default()
        }
    }

    fn index(name: &str, column: &str, unique: bool, primary: bool) -> IndexType {
        IndexType {
            table_schema: "test".into(),
            table_name: "posts".into(),
            column_name: column.into(),
            index_name: name.into(),
            seq_in_index: 1,
            sort: SortOrder::Asc,
            is_unique: unique,
            is_primary: primary,
        }
    }

    #[test]
    fn empty_description_is_not_found() {
        let err = inspect_table(&MySqlDialect::new(), "posts", &TableDescription::default())
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "sql-mysql:posts not found during inspection");
    }

    #[test]
    fn maps_columns_keys_and_defaults() {
        let mut status = column("status", "text", true);
        status.default_value = Some("draft".into());
        let mut views = column("views", "bigint", true);
        views.default_value = Some(String::new());

        let description = TableDescription {
            fields: vec![
                column("id", "varchar", false),
                column("author", "varchar", true),
                status,
                views,
            ],
            foreign_keys: vec![ForeignKeysType {
                column_name: "author".into(),
                constraint_name: "c_posts_author".into(),
                delete_rule: "CASCADE".into(),
                referenced_table_name: "users".into(),
                referenced_column_name: "id".into(),
                ..ForeignKeysType::default()
            }],
            indexes: vec![
                index("PRIMARY", "id", true, true),
                index("c_posts_author", "author", false, false),
            ],
        };

        let fields = inspect_table(&MySqlDialect::new(), "posts", &description).unwrap();

        let id = &fields["id"];
        assert_eq!(id.kind, Kind::Id);
        assert!(id.is_primary && id.is_required);
        assert_eq!(id.constraints.primary.as_deref(), Some("PRIMARY"));

        let author = &fields["author"];
        assert!(author.is_foreign && !author.is_unique);
        let target = author.joint_table.as_ref().unwrap();
        assert_eq!(target.table, "users");
        assert_eq!(target.on_delete, Some(ForeignKeyAction::Cascade));

        assert_eq!(fields["status"].default_text().as_deref(), Some("draft"));
        assert!(fields["views"].default.is_none());
    }

    #[test]
    fn composite_unique_indexes_are_ignored() {
        let description = TableDescription {
            fields: vec![column("a", "bigint", true), column("b", "bigint", true)],
            indexes: vec![
                index("ab_key", "a", true, false),
                index("ab_key", "b", true, false),
            ],
            ..TableDescription::default()
        };
        let fields = inspect_table(&PostgresDialect::new(), "posts", &description).unwrap();
        assert!(!fields["a"].is_unique);
        assert!(!fields["b"].is_unique);
    }

    #[test]
    fn unknown_native_type_is_rejected() {
        let description = TableDescription {
            fields: vec![column("shape", "geometry", true)],
            ..TableDescription::default()
        };
        assert!(matches!(
            inspect_table(&MySqlDialect::new(), "posts", &description),
            Err(Error::DialectUnsupported { .. })
        ));
    }
}
