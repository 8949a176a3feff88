//! Schema differ.
//!
//! Compares the desired schema of a table against the schema found in the
//! database and produces the ordered DDL statements that bring the
//! database in line. Nothing is executed here.
//!
//! Statement order is fixed: drops of columns that are no longer declared
//! come first (sorted by name), then every desired field in sorted order.
//! Within a field, deltas are emitted as nullability, unique, primary key,
//! foreign key, then default.

use tracing::{debug, warn};

use crate::dialect::{constraint_name, Dialect};
use crate::error::{Error, Result};
use crate::schema::{SchemaCollection, SchemaFieldType, SchemaFields, TableProperties};

/// Generates DDL for one project on one backend.
pub struct SchemaDiffer<'a> {
    dialect: &'a dyn Dialect,
    project: &'a str,
}

/// Column being worked on.
struct Target<'a> {
    table: &'a str,
    qualified: &'a str,
    column: &'a str,
}

impl<'a> SchemaDiffer<'a> {
    #[must_use]
    pub fn new(dialect: &'a dyn Dialect, project: &'a str) -> Self {
        Self { dialect, project }
    }

    /// Returns the statements migrating `table` from `current` to `desired`.
    ///
    /// An empty list means the table is already in sync, or is not part of
    /// the desired schema at all. A table missing from `current` yields a
    /// single CREATE TABLE. On error no partial list is returned.
    pub fn generate_creation_queries(
        &self,
        table: &str,
        desired: &SchemaCollection,
        current: &SchemaCollection,
    ) -> Result<Vec<String>> {
        let Some(wanted) = desired.get(table) else {
            debug!(table = %table, "Table not declared, nothing to do");
            return Ok(Vec::new());
        };
        let Some(existing) = current.get(table) else {
            return Ok(vec![self.create_table(table, wanted)?]);
        };

        let qualified = self.dialect.qualify(self.project, table);
        let mut queries = Vec::new();

        for (name, field) in existing {
            if !field.is_linked && !wanted.contains_key(name) {
                queries.push(self.dialect.drop_column(&qualified, name));
            }
        }

        for (name, field) in wanted {
            let target = Target {
                table,
                qualified: &qualified,
                column: name,
            };
            match existing.get(name) {
                Some(found) if field.is_linked => {
                    if !found.is_linked {
                        queries.push(self.dialect.drop_column(&qualified, name));
                    }
                }
                None if field.is_linked => {}
                None => self.add_field(&target, field, &mut queries)?,
                Some(found) if found.is_linked => self.add_field(&target, field, &mut queries)?,
                Some(found) if found.kind != field.kind || found.is_list != field.is_list => {
                    queries.push(self.dialect.drop_column(&qualified, name));
                    self.add_field(&target, field, &mut queries)?;
                }
                Some(found) => self.alter_field(&target, found, field, &mut queries)?,
            }
        }

        Ok(queries)
    }

    /// Builds the CREATE TABLE statement for a table that does not exist yet.
    pub fn create_table(&self, table: &str, fields: &SchemaFields) -> Result<String> {
        let mut definitions = Vec::new();
        let mut primary = Vec::new();
        let mut constraints = Vec::new();

        for (name, field) in fields {
            if field.is_linked {
                continue;
            }
            let native = self.dialect.native_type(table, field)?;
            let mut definition = if field.is_auto_increment {
                format!("{name} {}", self.dialect.auto_increment_type(native))
            } else {
                format!("{name} {native}")
            };
            if field.requires_not_null() {
                definition.push_str(" NOT NULL");
            }

            let constraint = constraint_name(table, name);
            if let Some(value) = &field.default {
                let literal = self.dialect.default_literal(value);
                definition.push(' ');
                definition.push_str(&self.dialect.column_default_clause(&constraint, &literal));
            }
            definitions.push(definition);

            if field.is_primary {
                primary.push(name.as_str());
            }
            if field.is_unique {
                constraints.push(self.dialect.unique_clause(&constraint, name));
            }
            if field.is_foreign {
                let target = foreign_target(table, name, field)?;
                constraints.push(self.foreign_key_clause(&constraint, name, target));
            }
        }

        if definitions.is_empty() {
            return Err(Error::invalid(format!(
                "table {table} has no physical columns"
            )));
        }
        if let Some(first) = primary.first() {
            let name = constraint_name(table, first);
            definitions.push(self.dialect.primary_key_clause(&name, &primary));
        }
        definitions.extend(constraints);

        let qualified = self.dialect.qualify(self.project, table);
        Ok(self.dialect.create_table(&qualified, &definitions))
    }

    // ================================================================
    // Field deltas
    // ================================================================

    /// ADD COLUMN followed by the deltas against a bare column.
    fn add_field(
        &self,
        target: &Target<'_>,
        wanted: &SchemaFieldType,
        queries: &mut Vec<String>,
    ) -> Result<()> {
        let native = self.dialect.native_type(target.table, wanted)?;
        queries.push(
            self.dialect
                .add_column(target.qualified, target.column, native),
        );
        let bare = SchemaFieldType::new(target.column, wanted.kind);
        self.alter_field(target, &bare, wanted, queries)
    }

    fn alter_field(
        &self,
        target: &Target<'_>,
        found: &SchemaFieldType,
        wanted: &SchemaFieldType,
        queries: &mut Vec<String>,
    ) -> Result<()> {
        let dialect = self.dialect;
        let (table, column) = (target.qualified, target.column);
        let native = dialect.native_type(target.table, wanted)?;
        let default_name = constraint_name(target.table, column);

        if found.requires_not_null() != wanted.requires_not_null() {
            queries.push(dialect.alter_nullability(
                table,
                column,
                native,
                wanted.requires_not_null(),
            ));
        }

        match (found.is_unique, wanted.is_unique) {
            (false, true) => queries.push(
                dialect.add_constraint(table, &dialect.unique_clause(&default_name, column)),
            ),
            (true, false) => {
                let name = found.constraints.unique.as_deref().unwrap_or(&default_name);
                queries.extend(dialect.drop_unique(table, name));
            }
            _ => {}
        }

        match (found.is_primary, wanted.is_primary) {
            (false, true) => queries.push(
                dialect.add_constraint(table, &dialect.primary_key_clause(&default_name, &[column])),
            ),
            (true, false) => {
                let name = found.constraints.primary.as_deref().unwrap_or(&default_name);
                queries.push(dialect.drop_primary_key(table, name));
            }
            _ => {}
        }

        self.foreign_key_delta(target, found, wanted, &default_name, queries)?;

        if found.default_text() != wanted.default_text() {
            let previous = found.default.as_ref().map(|v| dialect.default_literal(v));
            let next = wanted.default.as_ref().map(|v| dialect.default_literal(v));
            queries.extend(dialect.change_default(
                table,
                &default_name,
                column,
                found.constraints.default.as_deref(),
                previous.as_deref(),
                next.as_deref(),
            ));
        }

        if found.is_auto_increment != wanted.is_auto_increment {
            warn!(
                table = %target.table,
                column = %column,
                "Auto increment cannot be changed on an existing column, skipping"
            );
        }

        Ok(())
    }

    fn foreign_key_delta(
        &self,
        target: &Target<'_>,
        found: &SchemaFieldType,
        wanted: &SchemaFieldType,
        default_name: &str,
        queries: &mut Vec<String>,
    ) -> Result<()> {
        let dialect = self.dialect;
        let (table, column) = (target.qualified, target.column);
        let found_name = || {
            found
                .joint_table
                .as_ref()
                .and_then(|t| t.constraint_name.as_deref())
                .unwrap_or(default_name)
        };

        match (found.is_foreign, wanted.is_foreign) {
            (false, true) => {
                let to = foreign_target(target.table, column, wanted)?;
                let clause = self.foreign_key_clause(default_name, column, to);
                queries.push(dialect.add_constraint(table, &clause));
            }
            (true, false) => queries.extend(dialect.drop_foreign_key(table, found_name())),
            (true, true) => {
                let to = foreign_target(target.table, column, wanted)?;
                let retarget = found
                    .joint_table
                    .as_ref()
                    .is_none_or(|current| !current.same_target(to));
                if retarget {
                    queries.extend(dialect.drop_foreign_key(table, found_name()));
                    let clause = self.foreign_key_clause(default_name, column, to);
                    queries.push(dialect.add_constraint(table, &clause));
                }
            }
            (false, false) => {}
        }
        Ok(())
    }

    fn foreign_key_clause(&self, name: &str, column: &str, to: &TableProperties) -> String {
        let references = self.dialect.qualify(self.project, &to.table);
        self.dialect
            .foreign_key_clause(name, column, &references, &to.to, to.on_delete)
    }
}

fn foreign_target<'f>(
    table: &str,
    column: &str,
    field: &'f SchemaFieldType,
) -> Result<&'f TableProperties> {
    field.joint_table.as_ref().ok_or_else(|| {
        Error::invalid(format!(
            "foreign key {table}.{column} does not name a referenced table"
        ))
    })
}
