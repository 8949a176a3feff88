//! MySQL dialect.

use super::{CurrentTime, Dialect};
use crate::schema::{DbType, Kind};

/// MySQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    /// Creates a new MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

const DESCRIBE_QUERY: &str = "SELECT c.TABLE_SCHEMA AS TABLE_SCHEMA, c.TABLE_NAME AS TABLE_NAME, \
c.COLUMN_NAME AS COLUMN_NAME, c.DATA_TYPE AS DATA_TYPE, c.IS_NULLABLE AS IS_NULLABLE, \
c.ORDINAL_POSITION AS ORDINAL_POSITION, \
CASE WHEN c.COLUMN_DEFAULT IS NULL THEN '' \
WHEN c.DATA_TYPE = 'tinyint' AND c.COLUMN_DEFAULT = '1' THEN 'true' \
WHEN c.DATA_TYPE = 'tinyint' AND c.COLUMN_DEFAULT = '0' THEN 'false' \
ELSE c.COLUMN_DEFAULT END AS DEFAULT_VALUE, \
CASE WHEN c.EXTRA LIKE '%auto_increment%' THEN 'true' ELSE 'false' END AS AUTO_INCREMENT, \
COALESCE(c.CHARACTER_MAXIMUM_LENGTH, 0) AS CHARACTER_MAXIMUM_LENGTH, \
COALESCE(c.NUMERIC_PRECISION, 0) AS NUMERIC_PRECISION, \
COALESCE(c.NUMERIC_SCALE, 0) AS NUMERIC_SCALE, \
COALESCE(k.CONSTRAINT_NAME, '') AS CONSTRAINT_NAME, \
COALESCE(r.DELETE_RULE, '') AS DELETE_RULE, \
COALESCE(k.REFERENCED_TABLE_SCHEMA, '') AS REFERENCED_TABLE_SCHEMA, \
COALESCE(k.REFERENCED_TABLE_NAME, '') AS REFERENCED_TABLE_NAME, \
COALESCE(k.REFERENCED_COLUMN_NAME, '') AS REFERENCED_COLUMN_NAME \
FROM information_schema.COLUMNS c \
LEFT JOIN information_schema.KEY_COLUMN_USAGE k \
ON k.TABLE_SCHEMA = c.TABLE_SCHEMA AND k.TABLE_NAME = c.TABLE_NAME \
AND k.COLUMN_NAME = c.COLUMN_NAME AND k.REFERENCED_TABLE_NAME IS NOT NULL \
LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS r \
ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
WHERE c.TABLE_SCHEMA = ? AND c.TABLE_NAME = ? \
ORDER BY c.ORDINAL_POSITION";

const INDEX_QUERY: &str = "SELECT TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, INDEX_NAME, SEQ_IN_INDEX, \
CASE WHEN COLLATION = 'D' THEN 'DESC' ELSE 'ASC' END AS SORT, \
CASE WHEN NON_UNIQUE = 0 THEN 'true' ELSE 'false' END AS IS_UNIQUE, \
CASE WHEN INDEX_NAME = 'PRIMARY' THEN 'true' ELSE 'false' END AS IS_PRIMARY \
FROM information_schema.STATISTICS \
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
ORDER BY INDEX_NAME, SEQ_IN_INDEX";

impl Dialect for MySqlDialect {
    fn db_type(&self) -> DbType {
        DbType::MySql
    }

    fn type_name(&self, kind: Kind) -> Option<&'static str> {
        match kind {
            Kind::Id => Some("varchar(50)"),
            Kind::String => Some("text"),
            Kind::Integer => Some("bigint"),
            Kind::Float => Some("float"),
            Kind::Boolean => Some("boolean"),
            Kind::DateTime => Some("datetime"),
            Kind::Date => Some("date"),
            Kind::Time => Some("time"),
            Kind::Uuid => Some("char(36)"),
            Kind::Json => Some("json"),
            Kind::Object => None,
        }
    }

    fn kind_of(&self, data_type: &str, max_length: i64) -> Option<Kind> {
        match data_type.to_ascii_lowercase().as_str() {
            "varchar" => Some(Kind::Id),
            "char" if max_length == 36 => Some(Kind::Uuid),
            "char" | "text" | "tinytext" | "mediumtext" | "longtext" | "enum" | "set" => {
                Some(Kind::String)
            }
            "tinyint" | "bit" => Some(Kind::Boolean),
            "smallint" | "mediumint" | "int" | "integer" | "bigint" => Some(Kind::Integer),
            "float" | "double" | "decimal" | "real" => Some(Kind::Float),
            "datetime" | "timestamp" => Some(Kind::DateTime),
            "date" => Some(Kind::Date),
            "time" => Some(Kind::Time),
            "json" => Some(Kind::Json),
            _ => None,
        }
    }

    fn placeholder(&self, _index: usize) -> String {
        String::from("?")
    }

    fn alter_nullability(
        &self,
        table: &str,
        column: &str,
        native: &str,
        not_null: bool,
    ) -> String {
        let null = if not_null { "NOT NULL" } else { "NULL" };
        format!("ALTER TABLE {table} MODIFY {column} {native} {null}")
    }

    fn auto_increment_type(&self, native: &str) -> String {
        format!("{native} AUTO_INCREMENT")
    }

    fn primary_key_clause(&self, _name: &str, columns: &[&str]) -> String {
        format!("PRIMARY KEY ({})", columns.join(", "))
    }

    fn drop_unique(&self, table: &str, name: &str) -> Vec<String> {
        vec![format!("ALTER TABLE {table} DROP INDEX {name}")]
    }

    fn drop_primary_key(&self, table: &str, _name: &str) -> String {
        format!("ALTER TABLE {table} DROP PRIMARY KEY")
    }

    // The supporting index created with the key has the same name and has
    // to go as well.
    fn drop_foreign_key(&self, table: &str, name: &str) -> Vec<String> {
        vec![
            format!("ALTER TABLE {table} DROP FOREIGN KEY {name}"),
            format!("ALTER TABLE {table} DROP INDEX {name}"),
        ]
    }

    fn create_project(&self, project: &str) -> String {
        format!("CREATE DATABASE IF NOT EXISTS {project}")
    }

    fn current_time(&self, kind: CurrentTime) -> &'static str {
        match kind {
            CurrentTime::Date => "CURRENT_DATE()",
            CurrentTime::Timestamp => "CURRENT_TIMESTAMP()",
        }
    }

    // OFFSET is only valid after LIMIT.
    fn paginate(&self, sql: &mut String, limit: Option<u64>, offset: Option<u64>, _ordered: bool) {
        match (limit, offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {offset}", u64::MAX)),
            (None, None) => {}
        }
    }

    fn describe_query(&self) -> &'static str {
        DESCRIBE_QUERY
    }

    fn index_query(&self) -> &'static str {
        INDEX_QUERY
    }
}
