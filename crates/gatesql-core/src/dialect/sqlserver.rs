//! SQL Server dialect.

use serde_json::Value;

use super::{CurrentTime, Dialect};
use crate::schema::{DbType, Kind};

/// SQL Server dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServerDialect;

impl SqlServerDialect {
    /// Creates a new SQL Server dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn default_constraint(name: &str) -> String {
        format!("{name}_default")
    }
}

const DESCRIBE_QUERY: &str = "SELECT s.name AS TABLE_SCHEMA, t.name AS TABLE_NAME, \
c.name AS COLUMN_NAME, ty.name AS DATA_TYPE, \
CASE WHEN c.is_nullable = 1 THEN 'YES' ELSE 'NO' END AS IS_NULLABLE, \
CAST(c.column_id AS BIGINT) AS ORDINAL_POSITION, \
CASE WHEN dc.definition IS NULL THEN '' \
WHEN ty.name = 'bit' AND dc.definition = '((1))' THEN 'true' \
WHEN ty.name = 'bit' AND dc.definition = '((0))' THEN 'false' \
WHEN dc.definition LIKE '(N''%'')' \
THEN REPLACE(SUBSTRING(dc.definition, 4, LEN(dc.definition) - 5), '''''', '''') \
WHEN dc.definition LIKE '(''%'')' \
THEN REPLACE(SUBSTRING(dc.definition, 3, LEN(dc.definition) - 4), '''''', '''') \
ELSE REPLACE(REPLACE(dc.definition, '(', ''), ')', '') END AS DEFAULT_VALUE, \
COALESCE(dc.name, '') AS DEFAULT_CONSTRAINT, \
CASE WHEN c.is_identity = 1 THEN 'true' ELSE 'false' END AS AUTO_INCREMENT, \
CAST(CASE WHEN c.max_length = -1 THEN -1 \
WHEN ty.name IN ('nvarchar', 'nchar') THEN c.max_length / 2 \
ELSE c.max_length END AS BIGINT) AS CHARACTER_MAXIMUM_LENGTH, \
CAST(c.precision AS BIGINT) AS NUMERIC_PRECISION, \
CAST(c.scale AS BIGINT) AS NUMERIC_SCALE, \
COALESCE(fk.name, '') AS CONSTRAINT_NAME, \
COALESCE(REPLACE(fk.delete_referential_action_desc, '_', ' '), '') AS DELETE_RULE, \
COALESCE(rs.name, '') AS REFERENCED_TABLE_SCHEMA, \
COALESCE(rt.name, '') AS REFERENCED_TABLE_NAME, \
COALESCE(rc.name, '') AS REFERENCED_COLUMN_NAME \
FROM sys.columns c \
JOIN sys.tables t ON t.object_id = c.object_id \
JOIN sys.schemas s ON s.schema_id = t.schema_id \
JOIN sys.types ty ON ty.user_type_id = c.user_type_id \
LEFT JOIN sys.default_constraints dc ON dc.object_id = c.default_object_id \
LEFT JOIN sys.foreign_key_columns fkc \
ON fkc.parent_object_id = c.object_id AND fkc.parent_column_id = c.column_id \
LEFT JOIN sys.foreign_keys fk ON fk.object_id = fkc.constraint_object_id \
LEFT JOIN sys.tables rt ON rt.object_id = fkc.referenced_object_id \
LEFT JOIN sys.schemas rs ON rs.schema_id = rt.schema_id \
LEFT JOIN sys.columns rc \
ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
WHERE s.name = @p1 AND t.name = @p2 \
ORDER BY c.column_id";

const INDEX_QUERY: &str = "SELECT s.name AS TABLE_SCHEMA, t.name AS TABLE_NAME, \
c.name AS COLUMN_NAME, i.name AS INDEX_NAME, \
CAST(ic.key_ordinal AS BIGINT) AS SEQ_IN_INDEX, \
CASE WHEN ic.is_descending_key = 1 THEN 'DESC' ELSE 'ASC' END AS SORT, \
CASE WHEN i.is_unique = 1 THEN 'true' ELSE 'false' END AS IS_UNIQUE, \
CASE WHEN i.is_primary_key = 1 THEN 'true' ELSE 'false' END AS IS_PRIMARY \
FROM sys.indexes i \
JOIN sys.tables t ON t.object_id = i.object_id \
JOIN sys.schemas s ON s.schema_id = t.schema_id \
JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
WHERE s.name = @p1 AND t.name = @p2 AND i.name IS NOT NULL \
ORDER BY i.name, ic.key_ordinal";

impl Dialect for SqlServerDialect {
    fn db_type(&self) -> DbType {
        DbType::SqlServer
    }

    fn type_name(&self, kind: Kind) -> Option<&'static str> {
        match kind {
            Kind::Id => Some("varchar(50)"),
            Kind::String => Some("text"),
            Kind::Integer => Some("bigint"),
            Kind::Float => Some("float"),
            Kind::Boolean => Some("bit"),
            Kind::DateTime => Some("datetime2"),
            Kind::Date => Some("date"),
            Kind::Time => Some("time"),
            Kind::Uuid => Some("uniqueidentifier"),
            Kind::Json => Some("nvarchar(max)"),
            Kind::Object => None,
        }
    }

    fn kind_of(&self, data_type: &str, max_length: i64) -> Option<Kind> {
        match data_type.to_ascii_lowercase().as_str() {
            "varchar" if max_length == -1 => Some(Kind::String),
            "varchar" => Some(Kind::Id),
            "nvarchar" if max_length == -1 => Some(Kind::Json),
            "nvarchar" | "char" | "nchar" | "text" | "ntext" => Some(Kind::String),
            "tinyint" | "smallint" | "int" | "bigint" => Some(Kind::Integer),
            "float" | "real" | "decimal" | "numeric" | "money" => Some(Kind::Float),
            "bit" => Some(Kind::Boolean),
            "datetime" | "datetime2" | "smalldatetime" | "datetimeoffset" => Some(Kind::DateTime),
            "date" => Some(Kind::Date),
            "time" => Some(Kind::Time),
            "uniqueidentifier" => Some(Kind::Uuid),
            _ => None,
        }
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{index}")
    }

    fn alter_nullability(
        &self,
        table: &str,
        column: &str,
        native: &str,
        not_null: bool,
    ) -> String {
        let null = if not_null { "NOT NULL" } else { "NULL" };
        format!("ALTER TABLE {table} ALTER COLUMN {column} {native} {null}")
    }

    fn auto_increment_type(&self, native: &str) -> String {
        format!("{native} IDENTITY(1,1)")
    }

    fn column_default_clause(&self, name: &str, literal: &str) -> String {
        format!("CONSTRAINT {} DEFAULT {literal}", Self::default_constraint(name))
    }

    // Defaults are named constraints here; changing one means dropping the
    // old constraint first.
    fn change_default(
        &self,
        table: &str,
        name: &str,
        column: &str,
        existing: Option<&str>,
        previous: Option<&str>,
        next: Option<&str>,
    ) -> Vec<String> {
        let constraint = Self::default_constraint(name);
        let mut statements = Vec::new();
        if previous.is_some() {
            statements.push(self.drop_constraint(table, existing.unwrap_or(&constraint)));
        }
        if let Some(literal) = next {
            statements.push(format!(
                "ALTER TABLE {table} ADD CONSTRAINT {constraint} DEFAULT {literal} FOR {column}"
            ));
        }
        statements
    }

    fn default_literal(&self, value: &Value) -> String {
        match value {
            Value::Bool(true) => String::from("1"),
            Value::Bool(false) => String::from("0"),
            Value::Null => String::from("NULL"),
            Value::Number(number) => number.to_string(),
            Value::String(text) => super::quote_literal(text),
            other => super::quote_literal(&other.to_string()),
        }
    }

    fn primary_key_clause(&self, name: &str, columns: &[&str]) -> String {
        format!("CONSTRAINT {name} PRIMARY KEY CLUSTERED ({})", columns.join(", "))
    }

    fn create_project(&self, project: &str) -> String {
        format!(
            "IF NOT EXISTS (SELECT * FROM sys.schemas WHERE name = N'{project}') EXEC('CREATE SCHEMA {project}')"
        )
    }

    fn current_time(&self, kind: CurrentTime) -> &'static str {
        match kind {
            CurrentTime::Date => "CAST(CURRENT_TIMESTAMP AS DATE)",
            CurrentTime::Timestamp => "CURRENT_TIMESTAMP",
        }
    }

    // OFFSET/FETCH needs an ORDER BY.
    fn paginate(&self, sql: &mut String, limit: Option<u64>, offset: Option<u64>, ordered: bool) {
        if limit.is_none() && offset.is_none() {
            return;
        }
        if !ordered {
            sql.push_str(" ORDER BY (SELECT NULL)");
        }
        sql.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(limit) = limit {
            sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
        }
    }

    fn describe_query(&self) -> &'static str {
        DESCRIBE_QUERY
    }

    fn index_query(&self) -> &'static str {
        INDEX_QUERY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sqlserver_type_catalog() {
        let dialect = SqlServerDialect::new();
        assert_eq!(dialect.type_name(Kind::Boolean), Some("bit"));
        assert_eq!(dialect.type_name(Kind::DateTime), Some("datetime2"));
        assert_eq!(dialect.type_name(Kind::Json), Some("nvarchar(max)"));
    }

    #[test]
    fn test_sqlserver_max_length_decides_kind() {
        let dialect = SqlServerDialect::new();
        assert_eq!(dialect.kind_of("varchar", 50), Some(Kind::Id));
        assert_eq!(dialect.kind_of("varchar", -1), Some(Kind::String));
        assert_eq!(dialect.kind_of("nvarchar", -1), Some(Kind::Json));
    }

    #[test]
    fn test_sqlserver_defaults_are_named_constraints() {
        let dialect = SqlServerDialect::new();
        let statements =
            dialect.change_default("test.table1", "c_table1_col1", "col1", None, Some("1"), Some("2"));
        assert_eq!(
            statements,
            vec![
                "ALTER TABLE test.table1 DROP CONSTRAINT c_table1_col1_default",
                "ALTER TABLE test.table1 ADD CONSTRAINT c_table1_col1_default DEFAULT 2 FOR col1",
            ]
        );
        assert_eq!(dialect.default_literal(&json!(true)), "1");
    }

    #[test]
    fn test_sqlserver_existing_default_name_is_reused() {
        let dialect = SqlServerDialect::new();
        let statements = dialect.change_default(
            "test.table1",
            "c_table1_col1",
            "col1",
            Some("DF__table1__col1__267ABA7A"),
            Some("1"),
            None,
        );
        assert_eq!(
            statements,
            vec!["ALTER TABLE test.table1 DROP CONSTRAINT DF__table1__col1__267ABA7A"]
        );
        assert!(dialect
            .describe_query()
            .contains("COALESCE(dc.name, '') AS DEFAULT_CONSTRAINT"));
    }

    #[test]
    fn test_sqlserver_pagination_requires_order() {
        let dialect = SqlServerDialect::new();
        let mut sql = String::from("SELECT * FROM p.t");
        dialect.paginate(&mut sql, Some(5), None, false);
        assert_eq!(
            sql,
            "SELECT * FROM p.t ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }
}
