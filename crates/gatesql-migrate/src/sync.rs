//! Brings live tables in line with their declared schema.
//!
//! Each table goes through describe, inspect, diff and then a raw batch.
//! Tables present in the database but absent from the declared schema are
//! left alone.

use gatesql_core::{SchemaCollection, SchemaDiffer, SchemaFields};
use gatesql_driver::SqlCrud;
use tracing::{debug, info};

use crate::error::Result;

/// Statements that migrate one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePlan {
    pub table: String,
    pub statements: Vec<String>,
}

impl TablePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Synchronises the tables of one database alias.
pub struct SchemaSync {
    crud: SqlCrud,
    desired: SchemaCollection,
}

impl SchemaSync {
    #[must_use]
    pub const fn new(crud: SqlCrud, desired: SchemaCollection) -> Self {
        Self { crud, desired }
    }

    #[must_use]
    pub const fn crud(&self) -> &SqlCrud {
        &self.crud
    }

    /// Declared tables, in name order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.desired.keys().map(String::as_str)
    }

    /// Current definition of `table`, or an empty collection when the
    /// table does not exist yet.
    pub async fn current_schema(&self, table: &str) -> Result<SchemaCollection> {
        let mut current = SchemaCollection::new();
        match self.crud.inspect(table).await {
            Ok(fields) => {
                current.insert(table.to_string(), fields);
            }
            Err(error) if error.is_not_found() => {
                debug!(table = %table, "Table does not exist yet");
            }
            Err(error) => return Err(error.into()),
        }
        Ok(current)
    }

    /// Statements that would migrate `table`, without running them.
    pub async fn plan_table(&self, table: &str) -> Result<TablePlan> {
        let current = self.current_schema(table).await?;
        let differ = SchemaDiffer::new(self.crud.dialect(), self.crud.project());
        let statements = differ.generate_creation_queries(table, &self.desired, &current)?;
        Ok(TablePlan {
            table: table.to_string(),
            statements,
        })
    }

    /// Plans every declared table.
    ///
    /// Diffing is per table; a failure stops planning and returns no plan.
    pub async fn plan_all(&self) -> Result<Vec<TablePlan>> {
        let mut plans = Vec::with_capacity(self.desired.len());
        for table in self.tables() {
            plans.push(self.plan_table(table).await?);
        }
        Ok(plans)
    }

    /// Plans and applies `table`, returning what was executed.
    pub async fn sync_table(&self, table: &str) -> Result<TablePlan> {
        let plan = self.plan_table(table).await?;
        self.apply(&plan).await?;
        Ok(plan)
    }

    /// Creates the project if needed, then syncs every declared table in
    /// name order. Stops at the first table that fails.
    pub async fn sync_all(&self) -> Result<Vec<TablePlan>> {
        self.crud.create_project_if_not_exists().await?;
        let mut applied = Vec::with_capacity(self.desired.len());
        for table in self.tables() {
            applied.push(self.sync_table(table).await?);
        }
        Ok(applied)
    }

    pub async fn inspect_table(&self, table: &str) -> Result<SchemaFields> {
        Ok(self.crud.inspect(table).await?)
    }

    async fn apply(&self, plan: &TablePlan) -> Result<()> {
        if plan.is_empty() {
            debug!(table = %plan.table, "Table already in sync");
            return Ok(());
        }
        info!(
            alias = %self.crud.alias(),
            table = %plan.table,
            statements = plan.statements.len(),
            "Applying schema changes"
        );
        self.crud.raw_batch(&plan.statements).await?;
        Ok(())
    }
}
