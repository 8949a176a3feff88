//! In-memory executor for tests.
//!
//! [`RecordingExecutor`] answers queries from a queue of canned results
//! and records every statement it sees, including transaction
//! boundaries as `BEGIN`, `COMMIT` and `ROLLBACK`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use gatesql_core::{DbType, SqlValue};

use crate::error::{Error, Result};
use crate::executor::{QueryResult, SqlExecutor, SqlTransaction};

/// A statement seen by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<Call>,
    rows: VecDeque<QueryResult>,
    affected: VecDeque<u64>,
    fail_on: Option<String>,
}

impl State {
    fn record(&mut self, sql: &str, params: &[SqlValue]) -> Result<()> {
        self.calls.push(Call {
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        match &self.fail_on {
            Some(pattern) if sql.contains(pattern.as_str()) => Err(Error::Database(
                sqlx::Error::Protocol(format!("refused statement: {sql}")),
            )),
            _ => Ok(()),
        }
    }

    fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.record(sql, params)?;
        Ok(self.affected.pop_front().unwrap_or(1))
    }
}

/// Records statements instead of running them.
#[derive(Debug, Clone)]
pub struct RecordingExecutor {
    db_type: DbType,
    state: Arc<Mutex<State>>,
}

impl RecordingExecutor {
    #[must_use]
    pub fn new(db_type: DbType) -> Self {
        Self {
            db_type,
            state: Arc::default(),
        }
    }

    /// Queues the rows returned by the next query.
    #[must_use]
    pub fn with_rows(self, rows: QueryResult) -> Self {
        self.lock().rows.push_back(rows);
        self
    }

    /// Queues the affected-row count of the next execute. Defaults to 1.
    #[must_use]
    pub fn with_affected(self, affected: u64) -> Self {
        self.lock().affected.push_back(affected);
        self
    }

    /// Fails every statement containing `pattern`.
    #[must_use]
    pub fn failing_on(self, pattern: &str) -> Self {
        self.lock().fail_on = Some(pattern.to_string());
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// SQL text of every recorded statement, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().calls.iter().map(|call| call.sql.clone()).collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SqlExecutor for RecordingExecutor {
    fn db_type(&self) -> DbType {
        self.db_type
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let mut state = self.lock();
        state.record(sql, params)?;
        Ok(state.rows.pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.lock().execute(sql, params)
    }

    async fn begin(&self) -> Result<Box<dyn SqlTransaction>> {
        self.lock().record("BEGIN", &[])?;
        Ok(Box::new(RecordingTx {
            executor: self.clone(),
            open: true,
        }))
    }
}

struct RecordingTx {
    executor: RecordingExecutor,
    open: bool,
}

#[async_trait]
impl SqlTransaction for RecordingTx {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.executor.lock().execute(sql, params)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.open = false;
        self.executor.lock().record("COMMIT", &[])
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        self.open = false;
        self.executor.lock().record("ROLLBACK", &[])
    }
}

impl Drop for RecordingTx {
    fn drop(&mut self) {
        if self.open {
            let _ = self.executor.lock().record("ROLLBACK", &[]);
        }
    }
}
