//! Statement execution seam.
//!
//! [`SqlExecutor`] is what the CRUD and introspection code talk to; the
//! sqlx pools implement it per backend and tests substitute a recording
//! fake.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use gatesql_core::{DbType, SqlValue};
use serde_json::Value;

use crate::error::{Error, Result};

/// Default bound on every database call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Row from a query result, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRow {
    pub columns: BTreeMap<String, Value>,
}

impl QueryRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.columns.insert(key.into(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.columns.get(key)
    }

    /// Text value of a column; numbers and booleans are rendered.
    #[must_use]
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.columns.get(key)? {
            Value::String(text) => Some(text.clone()),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }

    /// Integer value of a column; numeric text is parsed.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.columns.get(key)? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean value of a column.
    ///
    /// Catalog queries spell flags as `YES`/`NO`, `true`/`false` or `1`/`0`
    /// depending on the backend; all of them are accepted.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.columns.get(key)? {
            Value::Bool(flag) => Some(*flag),
            Value::Number(number) => number.as_i64().map(|n| n != 0),
            Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    #[must_use]
    pub fn into_json(self) -> Value {
        Value::Object(self.columns.into_iter().collect())
    }
}

/// Result of a query.
pub type QueryResult = Vec<QueryRow>;

/// Runs statements against one database.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    fn db_type(&self) -> DbType;

    /// Runs a statement and returns its rows.
    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult>;

    /// Runs a statement and returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Opens a transaction on a dedicated connection.
    async fn begin(&self) -> Result<Box<dyn SqlTransaction>>;
}

/// An open transaction.
///
/// Dropping it without [`commit`](Self::commit) rolls back.
#[async_trait]
pub trait SqlTransaction: Send {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Bounds `future` by `after`; on expiry the future is dropped.
pub async fn with_timeout<T, F>(after: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(after, future)
        .await
        .map_err(|_| Error::Timeout { after })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_row_accessors_are_lenient() {
        let mut row = QueryRow::new();
        row.insert("IS_NULLABLE", json!("YES"));
        row.insert("IS_UNIQUE", json!("false"));
        row.insert("FLAG", json!(1));
        row.insert("LEN", json!("50"));
        row.insert("NAME", json!("users"));

        assert_eq!(row.get_bool("IS_NULLABLE"), Some(true));
        assert_eq!(row.get_bool("IS_UNIQUE"), Some(false));
        assert_eq!(row.get_bool("FLAG"), Some(true));
        assert_eq!(row.get_i64("LEN"), Some(50));
        assert_eq!(row.get_string("LEN").as_deref(), Some("50"));
        assert_eq!(row.get_string("NAME").as_deref(), Some("users"));
        assert_eq!(row.get_string("MISSING"), None);
    }

    #[tokio::test]
    async fn test_timeout_cancels_slow_calls() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        };
        let result = with_timeout(Duration::from_millis(10), slow).await;
        assert!(matches!(result, Err(Error::Timeout { .. })));

        let fast = with_timeout(Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(fast.unwrap(), 7);
    }
}
