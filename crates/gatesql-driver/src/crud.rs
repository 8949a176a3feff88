//! CRUD execution for one database alias.

use std::sync::Arc;
use std::time::Duration;

use gatesql_core::crud::{
    compile_create, compile_delete, compile_insert, compile_read, compile_update,
    qualified_table, rows_from_json, BatchRequest, CompiledUpdate, CreateRequest, DeleteRequest,
    Operation, ReadRequest, Row, Statement, UpdateRequest,
};
use gatesql_core::builder::identifier;
use gatesql_core::migrations::TableDescription;
use gatesql_core::{inspect_table, Dialect, DocumentValidator, SchemaFields, SchemaRegistry};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::executor::{with_timeout, QueryRow, SqlExecutor, SqlTransaction, DEFAULT_TIMEOUT};
use crate::introspect;

/// Executes compiled requests against one database.
pub struct SqlCrud {
    alias: String,
    project: String,
    executor: Arc<dyn SqlExecutor>,
    schemas: Arc<SchemaRegistry>,
    timeout: Duration,
}

impl SqlCrud {
    #[must_use]
    pub fn new(
        alias: impl Into<String>,
        project: impl Into<String>,
        executor: Arc<dyn SqlExecutor>,
        schemas: Arc<SchemaRegistry>,
    ) -> Self {
        Self {
            alias: alias.into(),
            project: project.into(),
            executor,
            schemas,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Bounds every call made through this instance.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    #[must_use]
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.executor.db_type().dialect()
    }

    /// Declared fields of `table`, if any.
    fn fields(&self, table: &str) -> Option<Arc<SchemaFields>> {
        self.schemas.table(&self.alias, table)
    }

    /// Rows to insert for `document`, validated when `table` has a schema.
    fn rows_for(&self, table: &str, document: &Value) -> Result<Vec<Row>> {
        match self.fields(table) {
            Some(fields) => Ok(DocumentValidator::new(table, &fields).validate(document)?),
            None => Ok(rows_from_json(document)?),
        }
    }

    fn compile_create(&self, table: &str, request: &CreateRequest) -> Result<Vec<Statement>> {
        let rows = self.rows_for(table, &request.document)?;
        let fields = self.fields(table);
        Ok(compile_create(self.dialect(), &self.project, table, rows, fields.as_deref())?)
    }

    // ================================================================
    // CRUD
    // ================================================================

    /// Inserts one or more documents; several rows share a transaction.
    pub async fn create(&self, table: &str, request: &CreateRequest) -> Result<u64> {
        let statements = self.compile_create(table, request)?;
        with_timeout(self.timeout, async {
            if let [(sql, params)] = statements.as_slice() {
                debug!(table = %table, sql = %sql, "Executing create");
                return self.executor.execute(sql, params).await;
            }
            let mut tx = self.executor.begin().await?;
            let result = execute_all(tx.as_mut(), &statements).await;
            finish(tx, result).await
        })
        .await
    }

    /// Runs a read and shapes the result by operation.
    ///
    /// `count` returns a number, `distinct` an array of values, `one` an
    /// object (or null when nothing matches) and `all` an array of objects.
    pub async fn read(&self, table: &str, request: &ReadRequest) -> Result<Value> {
        let fields = self.fields(table);
        let (sql, params) =
            compile_read(self.dialect(), &self.project, table, request, fields.as_deref())?;
        debug!(table = %table, sql = %sql, "Executing read");
        let rows = with_timeout(self.timeout, self.executor.query(&sql, &params)).await?;

        Ok(match request.operation {
            Operation::Count => rows
                .first()
                .and_then(|row| row.get_i64("count"))
                .map_or(Value::from(0), Value::from),
            Operation::Distinct => {
                let column = request.options.distinct.as_deref().unwrap_or_default();
                Value::Array(
                    rows.into_iter()
                        .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
                        .collect(),
                )
            }
            Operation::One => rows.into_iter().next().map_or(Value::Null, QueryRow::into_json),
            Operation::All | Operation::Upsert => {
                Value::Array(rows.into_iter().map(QueryRow::into_json).collect())
            }
        })
    }

    /// Applies every operator of an update request.
    ///
    /// With `all` the statements run one after the other. With `upsert`
    /// each operator runs in its own transaction and inserts its payload
    /// when the UPDATE touches no row.
    pub async fn update(&self, table: &str, request: &UpdateRequest) -> Result<u64> {
        let fields = self.fields(table);
        let compiled =
            compile_update(self.dialect(), &self.project, table, request, fields.as_deref())?;
        with_timeout(self.timeout, async {
            let mut affected = 0;
            for update in &compiled {
                debug!(table = %table, operator = %update.operator, sql = %update.sql, "Executing update");
                affected += if request.operation == Operation::Upsert {
                    let mut tx = self.executor.begin().await?;
                    let result = self.upsert(tx.as_mut(), table, update).await;
                    finish(tx, result).await?
                } else {
                    self.executor.execute(&update.sql, &update.params).await?
                };
            }
            Ok(affected)
        })
        .await
    }

    async fn upsert(
        &self,
        tx: &mut dyn SqlTransaction,
        table: &str,
        update: &CompiledUpdate,
    ) -> Result<u64> {
        let affected = tx.execute(&update.sql, &update.params).await?;
        if affected > 0 {
            return Ok(affected);
        }
        let document = update.insert_on_miss()?;
        debug!(table = %table, operator = %update.operator, "Upsert matched nothing, inserting");
        let fields = self.fields(table);
        let mut inserted = 0;
        for row in rows_from_json(&document)? {
            let (sql, params) =
                compile_insert(self.dialect(), &self.project, table, row, fields.as_deref())?;
            inserted += tx.execute(&sql, &params).await?;
        }
        Ok(inserted)
    }

    pub async fn delete(&self, table: &str, request: &DeleteRequest) -> Result<u64> {
        let fields = self.fields(table);
        let (sql, params) =
            compile_delete(self.dialect(), &self.project, table, request, fields.as_deref())?;
        debug!(table = %table, sql = %sql, "Executing delete");
        with_timeout(self.timeout, self.executor.execute(&sql, &params)).await
    }

    /// Runs several writes in a single transaction.
    ///
    /// Every request is compiled before the transaction opens. Returns the
    /// affected-row count of each request.
    pub async fn batch(&self, requests: &[BatchRequest]) -> Result<Vec<u64>> {
        let dialect = self.dialect();
        let mut steps = Vec::with_capacity(requests.len());
        for request in requests {
            steps.push(match request {
                BatchRequest::Create { col, request } => {
                    (col.as_str(), Step::Statements(self.compile_create(col, request)?))
                }
                BatchRequest::Update { col, request } => {
                    let fields = self.fields(col);
                    let compiled =
                        compile_update(dialect, &self.project, col, request, fields.as_deref())?;
                    if request.operation == Operation::Upsert {
                        (col.as_str(), Step::Upserts(compiled))
                    } else {
                        let statements = compiled
                            .into_iter()
                            .map(|update| (update.sql, update.params))
                            .collect();
                        (col.as_str(), Step::Statements(statements))
                    }
                }
                BatchRequest::Delete { col, request } => {
                    let fields = self.fields(col);
                    let statement =
                        compile_delete(dialect, &self.project, col, request, fields.as_deref())?;
                    (col.as_str(), Step::Statements(vec![statement]))
                }
            });
        }

        with_timeout(self.timeout, async {
            let mut tx = self.executor.begin().await?;
            let result = self.run_steps(tx.as_mut(), &steps).await;
            finish(tx, result).await
        })
        .await
    }

    async fn run_steps(
        &self,
        tx: &mut dyn SqlTransaction,
        steps: &[(&str, Step)],
    ) -> Result<Vec<u64>> {
        let mut counts = Vec::with_capacity(steps.len());
        for (table, step) in steps {
            counts.push(match step {
                Step::Statements(statements) => execute_all(tx, statements).await?,
                Step::Upserts(updates) => {
                    let mut affected = 0;
                    for update in updates {
                        affected += self.upsert(tx, table, update).await?;
                    }
                    affected
                }
            });
        }
        Ok(counts)
    }

    // ================================================================
    // Schema operations
    // ================================================================

    /// Executes DDL statements in order, stopping at the first failure.
    ///
    /// No transaction wraps the batch: most backends commit DDL
    /// implicitly, so earlier statements stay applied.
    pub async fn raw_batch(&self, statements: &[String]) -> Result<()> {
        with_timeout(self.timeout, async {
            for sql in statements {
                info!(alias = %self.alias, sql = %sql, "Executing raw statement");
                self.executor.execute(sql, &[]).await?;
            }
            Ok(())
        })
        .await
    }

    pub async fn describe_table(&self, table: &str) -> Result<TableDescription> {
        with_timeout(
            self.timeout,
            introspect::describe_table(self.executor.as_ref(), &self.project, table),
        )
        .await
    }

    /// Current schema of `table` as found in the database.
    pub async fn inspect(&self, table: &str) -> Result<SchemaFields> {
        let description = self.describe_table(table).await?;
        Ok(inspect_table(self.dialect(), table, &description)?)
    }

    pub async fn create_project_if_not_exists(&self) -> Result<()> {
        let sql = self.dialect().create_project(identifier(&self.project)?);
        self.raw_batch(&[sql]).await
    }

    pub async fn delete_table(&self, table: &str) -> Result<()> {
        let dialect = self.dialect();
        let sql = dialect.drop_table(&qualified_table(dialect, &self.project, table)?);
        self.raw_batch(&[sql]).await
    }
}

/// One compiled request of a batch.
enum Step {
    Statements(Vec<Statement>),
    Upserts(Vec<CompiledUpdate>),
}

async fn execute_all(tx: &mut dyn SqlTransaction, statements: &[Statement]) -> Result<u64> {
    let mut affected = 0;
    for (sql, params) in statements {
        affected += tx.execute(sql, params).await?;
    }
    Ok(affected)
}

/// Commits on success, rolls back on failure.
async fn finish<T>(tx: Box<dyn SqlTransaction>, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testing::RecordingExecutor;
    use gatesql_core::schema::{fields, Kind, SchemaFieldType};
    use gatesql_core::{DbType, SqlValue};
    use serde_json::json;

    fn crud(executor: &RecordingExecutor) -> SqlCrud {
        SqlCrud::new(
            "db",
            "app",
            Arc::new(executor.clone()),
            Arc::new(SchemaRegistry::new()),
        )
    }

    fn update(operation: Operation, find: Value, update: Value) -> UpdateRequest {
        UpdateRequest {
            find: find.as_object().cloned().unwrap_or_default(),
            operation,
            update: update.as_object().cloned().unwrap_or_default(),
        }
    }

    #[tokio::test]
    async fn test_update_all_runs_each_operator() {
        let executor = RecordingExecutor::new(DbType::MySql);
        let affected = crud(&executor)
            .update(
                "players",
                &update(
                    Operation::All,
                    json!({"id": "u1"}),
                    json!({"$inc": {"score": 5}, "$set": {"name": "x"}}),
                ),
            )
            .await
            .unwrap();
        assert_eq!(affected, 2);
        assert_eq!(
            executor.statements(),
            vec![
                "UPDATE app.players SET score=score+5 WHERE id = ?",
                "UPDATE app.players SET name=? WHERE id = ?",
            ]
        );
    }

    #[tokio::test]
    async fn test_upsert_miss_inserts_payload_in_one_transaction() {
        let executor = RecordingExecutor::new(DbType::Postgres).with_affected(0);
        crud(&executor)
            .update(
                "users",
                &update(
                    Operation::Upsert,
                    json!({"id": "nobody"}),
                    json!({"$set": {"id": "u9", "name": "new"}}),
                ),
            )
            .await
            .unwrap();

        assert_eq!(
            executor.statements(),
            vec![
                "BEGIN",
                "UPDATE app.users SET id=$1, name=$2 WHERE id = $3",
                "INSERT INTO app.users (id, name) VALUES ($1, $2)",
                "COMMIT",
            ]
        );
        let insert = &executor.calls()[2];
        assert_eq!(
            insert.params,
            vec![SqlValue::Text("u9".into()), SqlValue::Text("new".into())]
        );
    }

    #[tokio::test]
    async fn test_upsert_hit_skips_insert() {
        let executor = RecordingExecutor::new(DbType::MySql).with_affected(3);
        let affected = crud(&executor)
            .update(
                "users",
                &update(Operation::Upsert, json!({}), json!({"$mul": {"n": 2}})),
            )
            .await
            .unwrap();
        assert_eq!(affected, 3);
        assert_eq!(
            executor.statements(),
            vec!["BEGIN", "UPDATE app.users SET n=n*2", "COMMIT"]
        );
    }

    #[tokio::test]
    async fn test_upsert_current_date_miss_rolls_back() {
        let executor = RecordingExecutor::new(DbType::MySql).with_affected(0);
        let result = crud(&executor)
            .update(
                "users",
                &update(
                    Operation::Upsert,
                    json!({"id": "x"}),
                    json!({"$currentDate": {"seen": "timestamp"}}),
                ),
            )
            .await;
        assert!(matches!(
            result,
            Err(Error::Core(gatesql_core::Error::InvalidParams(_)))
        ));
        assert_eq!(
            executor.statements(),
            vec![
                "BEGIN",
                "UPDATE app.users SET seen=CURRENT_TIMESTAMP() WHERE id = ?",
                "ROLLBACK",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_update_touches_nothing() {
        let executor = RecordingExecutor::new(DbType::MySql);
        let result = crud(&executor)
            .update(
                "users",
                &update(Operation::All, json!({}), json!({"$set": {"a": 1}, "$push": {"b": 1}})),
            )
            .await;
        assert!(result.is_err());
        assert!(executor.statements().is_empty());

        let one = crud(&executor)
            .update("users", &update(Operation::One, json!({}), json!({"$set": {"a": 1}})))
            .await;
        assert!(one.is_err());
        assert!(executor.statements().is_empty());
    }

    #[tokio::test]
    async fn test_create_validates_against_registered_schema() {
        let executor = RecordingExecutor::new(DbType::MySql);
        let schemas = Arc::new(SchemaRegistry::new());
        schemas.set_table(
            "db",
            "users",
            fields([
                SchemaFieldType::new("id", Kind::Id).primary(),
                SchemaFieldType::new("name", Kind::String).required(),
            ]),
        );
        let crud = SqlCrud::new("db", "app", Arc::new(executor.clone()), schemas);

        let created = crud
            .create(
                "users",
                &CreateRequest {
                    document: json!([{"id": "1", "name": "a"}, {"name": "b"}]),
                    operation: Operation::All,
                },
            )
            .await
            .unwrap();
        assert_eq!(created, 2);
        let statements = executor.statements();
        assert_eq!(statements.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(statements[1], "INSERT INTO app.users (id, name) VALUES (?, ?)");
        assert_eq!(statements.last().map(String::as_str), Some("COMMIT"));

        let missing = crud
            .create(
                "users",
                &CreateRequest {
                    document: json!({"id": "2"}),
                    operation: Operation::One,
                },
            )
            .await;
        assert!(matches!(
            missing,
            Err(Error::Core(gatesql_core::Error::MissingField { .. }))
        ));
    }

    #[tokio::test]
    async fn test_postgres_binds_are_cast_to_declared_column_types() {
        let executor = RecordingExecutor::new(DbType::Postgres).with_affected(0);
        let schemas = Arc::new(SchemaRegistry::new());
        schemas.set_table(
            "db",
            "people",
            fields([
                SchemaFieldType::new("id", Kind::Id).primary(),
                SchemaFieldType::new("age", Kind::Integer),
                SchemaFieldType::new("born", Kind::DateTime),
            ]),
        );
        let crud = SqlCrud::new("db", "app", Arc::new(executor.clone()), schemas);

        crud.update(
            "people",
            &update(
                Operation::Upsert,
                json!({"id": "p1"}),
                json!({"$set": {"id": "p1", "age": null, "born": "1990-05-17T08:30:00Z"}}),
            ),
        )
        .await
        .unwrap();
        crud.read(
            "people",
            &ReadRequest {
                find: json!({"born": {"$gt": "1980-01-01T00:00:00Z"}})
                    .as_object()
                    .cloned()
                    .unwrap(),
                operation: Operation::All,
                ..ReadRequest::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(
            executor.statements(),
            vec![
                "BEGIN",
                "UPDATE app.people SET age=CAST($1 AS bigint), born=CAST($2 AS timestamp), id=$3 \
                 WHERE id = $4",
                "INSERT INTO app.people (age, born, id) \
                 VALUES (CAST($1 AS bigint), CAST($2 AS timestamp), $3)",
                "COMMIT",
                "SELECT * FROM app.people WHERE born > CAST($1 AS timestamp)",
            ]
        );
        assert_eq!(executor.calls()[1].params[0], SqlValue::Null);
    }

    #[tokio::test]
    async fn test_read_shapes_results() {
        let mut count = QueryRow::new();
        count.insert("count", json!(4));
        let mut user = QueryRow::new();
        user.insert("id", json!("1"));
        let executor = RecordingExecutor::new(DbType::Postgres)
            .with_rows(vec![count])
            .with_rows(vec![user]);
        let crud = crud(&executor);

        let total = crud
            .read(
                "users",
                &ReadRequest {
                    operation: Operation::Count,
                    ..ReadRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(total, json!(4));

        let one = crud
            .read(
                "users",
                &ReadRequest {
                    find: json!({"id": "1"}).as_object().cloned().unwrap(),
                    operation: Operation::One,
                    ..ReadRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(one, json!({"id": "1"}));
        assert_eq!(
            executor.statements()[1],
            "SELECT * FROM app.users WHERE id = $1 LIMIT 1"
        );
    }

    #[tokio::test]
    async fn test_batch_shares_one_transaction() {
        let executor = RecordingExecutor::new(DbType::MySql).failing_on("DELETE");
        let requests: Vec<BatchRequest> = serde_json::from_value(json!([
            {"type": "create", "col": "users", "doc": {"id": "1"}},
            {"type": "update", "col": "users", "find": {"id": "1"}, "op": "all",
             "update": {"$set": {"name": "a"}}},
            {"type": "delete", "col": "users", "find": {"id": "1"}, "op": "all"}
        ]))
        .unwrap();

        let result = crud(&executor).batch(&requests).await;
        assert!(matches!(result, Err(Error::Database(_))));
        assert_eq!(
            executor.statements(),
            vec![
                "BEGIN",
                "INSERT INTO app.users (id) VALUES (?)",
                "UPDATE app.users SET name=? WHERE id = ?",
                "DELETE FROM app.users WHERE id = ?",
                "ROLLBACK",
            ]
        );
    }

    #[tokio::test]
    async fn test_raw_batch_stops_at_first_failure() {
        let executor = RecordingExecutor::new(DbType::Postgres).failing_on("DROP");
        let statements = vec![
            "ALTER TABLE app.t ADD COLUMN a text".to_string(),
            "ALTER TABLE app.t DROP COLUMN b".to_string(),
            "ALTER TABLE app.t ADD COLUMN c text".to_string(),
        ];
        let result = crud(&executor).raw_batch(&statements).await;
        assert!(result.is_err());
        assert_eq!(executor.statements().len(), 2);
    }

    #[tokio::test]
    async fn test_project_and_table_ddl() {
        let executor = RecordingExecutor::new(DbType::Postgres);
        let crud = crud(&executor);
        crud.create_project_if_not_exists().await.unwrap();
        crud.delete_table("users").await.unwrap();
        assert_eq!(
            executor.statements(),
            vec!["CREATE SCHEMA IF NOT EXISTS app", "DROP TABLE app.users"]
        );
    }
}
