//! PostgreSQL dialect.

use super::{CurrentTime, Dialect};
use crate::schema::{DbType, Kind};

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    /// Creates a new PostgreSQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

const DESCRIBE_QUERY: &str = r#"SELECT c.table_schema::text AS "TABLE_SCHEMA",
    c.table_name::text AS "TABLE_NAME",
    c.column_name::text AS "COLUMN_NAME",
    c.data_type::text AS "DATA_TYPE",
    c.is_nullable::text AS "IS_NULLABLE",
    c.ordinal_position::bigint AS "ORDINAL_POSITION",
    CASE WHEN c.column_default IS NULL OR c.column_default LIKE 'nextval%' THEN ''
        WHEN c.column_default LIKE '''%' THEN COALESCE(
            REPLACE(SUBSTRING(c.column_default FROM '^''(.*)''(::[^'']*)?$'), '''''', ''''),
            c.column_default)
        ELSE SPLIT_PART(c.column_default, '::', 1) END AS "DEFAULT_VALUE",
    CASE WHEN c.column_default LIKE 'nextval%' OR c.is_identity = 'YES' THEN 'true'
        ELSE 'false' END AS "AUTO_INCREMENT",
    COALESCE(c.character_maximum_length, 0)::bigint AS "CHARACTER_MAXIMUM_LENGTH",
    COALESCE(c.numeric_precision, 0)::bigint AS "NUMERIC_PRECISION",
    COALESCE(c.numeric_scale, 0)::bigint AS "NUMERIC_SCALE",
    COALESCE(fk.constraint_name, '')::text AS "CONSTRAINT_NAME",
    COALESCE(fk.delete_rule, '')::text AS "DELETE_RULE",
    COALESCE(fk.foreign_table_schema, '')::text AS "REFERENCED_TABLE_SCHEMA",
    COALESCE(fk.foreign_table_name, '')::text AS "REFERENCED_TABLE_NAME",
    COALESCE(fk.foreign_column_name, '')::text AS "REFERENCED_COLUMN_NAME"
FROM information_schema.columns c
LEFT JOIN (
    SELECT tc.table_schema, tc.table_name, kcu.column_name, tc.constraint_name, rc.delete_rule,
        ccu.table_schema AS foreign_table_schema,
        ccu.table_name AS foreign_table_name,
        ccu.column_name AS foreign_column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.table_schema
    JOIN information_schema.referential_constraints rc
        ON rc.constraint_name = tc.constraint_name AND rc.constraint_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
) fk ON fk.table_schema = c.table_schema AND fk.table_name = c.table_name AND fk.column_name = c.column_name
WHERE c.table_schema = $1 AND c.table_name = $2
ORDER BY c.ordinal_position"#;

const INDEX_QUERY: &str = r#"SELECT n.nspname::text AS "TABLE_SCHEMA",
    t.relname::text AS "TABLE_NAME",
    a.attname::text AS "COLUMN_NAME",
    i.relname::text AS "INDEX_NAME",
    (array_position(ix.indkey::int2[], a.attnum) + 1)::bigint AS "SEQ_IN_INDEX",
    CASE WHEN ix.indoption[array_position(ix.indkey::int2[], a.attnum)] & 1 = 1 THEN 'DESC'
        ELSE 'ASC' END AS "SORT",
    CASE WHEN ix.indisunique THEN 'true' ELSE 'false' END AS "IS_UNIQUE",
    CASE WHEN ix.indisprimary THEN 'true' ELSE 'false' END AS "IS_PRIMARY"
FROM pg_class t
JOIN pg_namespace n ON n.oid = t.relnamespace
JOIN pg_index ix ON ix.indrelid = t.oid
JOIN pg_class i ON i.oid = ix.indexrelid
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey)
WHERE n.nspname = $1 AND t.relname = $2
ORDER BY i.relname, "SEQ_IN_INDEX""#;

impl Dialect for PostgresDialect {
    fn db_type(&self) -> DbType {
        DbType::Postgres
    }

    fn type_name(&self, kind: Kind) -> Option<&'static str> {
        match kind {
            Kind::Id => Some("varchar(50)"),
            Kind::String => Some("text"),
            Kind::Integer => Some("bigint"),
            Kind::Float => Some("float"),
            Kind::Boolean => Some("boolean"),
            Kind::DateTime => Some("timestamp"),
            Kind::Date => Some("date"),
            Kind::Time => Some("time"),
            Kind::Uuid => Some("uuid"),
            Kind::Json => Some("jsonb"),
            Kind::Object => None,
        }
    }

    fn kind_of(&self, data_type: &str, _max_length: i64) -> Option<Kind> {
        let data_type = data_type.to_ascii_lowercase();
        match data_type.as_str() {
            "character varying" | "varchar" => Some(Kind::Id),
            "text" | "character" | "char" => Some(Kind::String),
            "bigint" | "integer" | "smallint" => Some(Kind::Integer),
            "double precision" | "real" | "numeric" => Some(Kind::Float),
            "boolean" => Some(Kind::Boolean),
            "date" => Some(Kind::Date),
            "uuid" => Some(Kind::Uuid),
            "json" | "jsonb" => Some(Kind::Json),
            other if other.starts_with("timestamp") => Some(Kind::DateTime),
            other if other.starts_with("time") => Some(Kind::Time),
            _ => None,
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${index}")
    }

    /// Text and null parameters are not assignable to typed columns
    /// without a cast. Text columns take them as they are.
    fn typed_placeholder(&self, index: usize, kind: Kind) -> String {
        let placeholder = self.placeholder(index);
        match (kind, self.type_name(kind)) {
            (Kind::Id | Kind::String, _) | (_, None) => placeholder,
            (_, Some(native)) => format!("CAST({placeholder} AS {native})"),
        }
    }

    fn add_column(&self, table: &str, column: &str, native: &str) -> String {
        format!("ALTER TABLE {table} ADD COLUMN {column} {native}")
    }

    fn alter_nullability(
        &self,
        table: &str,
        column: &str,
        _native: &str,
        not_null: bool,
    ) -> String {
        let action = if not_null { "SET" } else { "DROP" };
        format!("ALTER TABLE {table} ALTER COLUMN {column} {action} NOT NULL")
    }

    fn auto_increment_type(&self, native: &str) -> String {
        match native {
            "bigint" => String::from("bigserial"),
            other => format!("{other} GENERATED BY DEFAULT AS IDENTITY"),
        }
    }

    fn create_project(&self, project: &str) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {project}")
    }

    fn current_time(&self, kind: CurrentTime) -> &'static str {
        match kind {
            CurrentTime::Date => "CURRENT_DATE",
            CurrentTime::Timestamp => "CURRENT_TIMESTAMP",
        }
    }

    fn describe_query(&self) -> &'static str {
        DESCRIBE_QUERY
    }

    fn index_query(&self) -> &'static str {
        INDEX_QUERY
    }
}
