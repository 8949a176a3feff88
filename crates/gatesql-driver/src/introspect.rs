//! Live introspection of a table.

use gatesql_core::builder::SortOrder;
use gatesql_core::migrations::{ForeignKeysType, IndexType, InspectorFieldType, TableDescription};
use gatesql_core::SqlValue;
use tracing::debug;

use crate::error::Result;
use crate::executor::{QueryRow, SqlExecutor};

/// Runs the dialect's column and index queries for `project.table`.
///
/// A table that does not exist comes back with no fields; the inspector
/// turns that into a not-found error.
pub async fn describe_table(
    executor: &dyn SqlExecutor,
    project: &str,
    table: &str,
) -> Result<TableDescription> {
    let dialect = executor.db_type().dialect();
    let params = [
        SqlValue::Text(project.to_string()),
        SqlValue::Text(table.to_string()),
    ];

    let columns = executor.query(dialect.describe_query(), &params).await?;
    let indexes = executor.query(dialect.index_query(), &params).await?;
    debug!(
        table = %table,
        columns = columns.len(),
        indexes = indexes.len(),
        "Described table"
    );

    let mut description = TableDescription::default();
    for row in &columns {
        description.fields.push(field_from_row(row));
        if let Some(key) = foreign_key_from_row(row) {
            description.foreign_keys.push(key);
        }
    }
    description.indexes = indexes.iter().map(index_from_row).collect();
    Ok(description)
}

fn text(row: &QueryRow, key: &str) -> String {
    row.get_string(key).unwrap_or_default()
}

fn field_from_row(row: &QueryRow) -> InspectorFieldType {
    InspectorFieldType {
        table_schema: text(row, "TABLE_SCHEMA"),
        table_name: text(row, "TABLE_NAME"),
        column_name: text(row, "COLUMN_NAME"),
        data_type: text(row, "DATA_TYPE"),
        is_nullable: row.get_bool("IS_NULLABLE").unwrap_or(true),
        ordinal_position: row.get_i64("ORDINAL_POSITION").unwrap_or_default(),
        default_value: row.get_string("DEFAULT_VALUE").filter(|value| !value.is_empty()),
        default_constraint: row.get_string("DEFAULT_CONSTRAINT").filter(|name| !name.is_empty()),
        auto_increment: row.get_bool("AUTO_INCREMENT").unwrap_or(false),
        character_maximum_length: row.get_i64("CHARACTER_MAXIMUM_LENGTH").unwrap_or_default(),
        numeric_precision: row.get_i64("NUMERIC_PRECISION").unwrap_or_default(),
        numeric_scale: row.get_i64("NUMERIC_SCALE").unwrap_or_default(),
    }
}

fn foreign_key_from_row(row: &QueryRow) -> Option<ForeignKeysType> {
    let constraint_name = row.get_string("CONSTRAINT_NAME").filter(|name| !name.is_empty())?;
    Some(ForeignKeysType {
        table_schema: text(row, "TABLE_SCHEMA"),
        table_name: text(row, "TABLE_NAME"),
        column_name: text(row, "COLUMN_NAME"),
        constraint_name,
        delete_rule: text(row, "DELETE_RULE"),
        referenced_table_schema: text(row, "REFERENCED_TABLE_SCHEMA"),
        referenced_table_name: text(row, "REFERENCED_TABLE_NAME"),
        referenced_column_name: text(row, "REFERENCED_COLUMN_NAME"),
    })
}

fn index_from_row(row: &QueryRow) -> IndexType {
    IndexType {
        table_schema: text(row, "TABLE_SCHEMA"),
        table_name: text(row, "TABLE_NAME"),
        column_name: text(row, "COLUMN_NAME"),
        index_name: text(row, "INDEX_NAME"),
        seq_in_index: row.get_i64("SEQ_IN_INDEX").unwrap_or_default(),
        sort: SortOrder::parse(&text(row, "SORT")),
        is_unique: row.get_bool("IS_UNIQUE").unwrap_or(false),
        is_primary: row.get_bool("IS_PRIMARY").unwrap_or(false),
    }
}
