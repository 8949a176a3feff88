//! MySQL executor backed by a sqlx pool.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use gatesql_core::{DbType, SqlValue};
use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, Row, Transaction};
use tracing::debug;

use crate::error::Result;
use crate::executor::{QueryResult, QueryRow, SqlExecutor, SqlTransaction};

pub struct MySqlExecutor {
    pool: MySqlPool,
}

impl MySqlExecutor {
    /// Creates a new MySQL executor with a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert a MySQL row to a `QueryRow`.
    fn convert_row(row: &MySqlRow) -> QueryRow {
        let mut query_row = QueryRow::new();

        for column in row.columns() {
            let name = column.name();
            let index = column.ordinal();

            let value = if let Ok(value) = row.try_get::<Option<String>, _>(index) {
                value.map_or(Value::Null, Value::String)
            } else if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<u64>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
                value.map_or(Value::Null, Value::Bool)
            } else if let Ok(value) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
                value.map_or(Value::Null, |v| SqlValue::Timestamp(v).to_json())
            } else if let Ok(value) = row.try_get::<Option<NaiveDateTime>, _>(index) {
                value.map_or(Value::Null, |v| SqlValue::Timestamp(v.and_utc()).to_json())
            } else if let Ok(value) = row.try_get::<Option<NaiveDate>, _>(index) {
                value.map_or(Value::Null, |v| Value::String(v.to_string()))
            } else if let Ok(value) = row.try_get::<Option<NaiveTime>, _>(index) {
                value.map_or(Value::Null, |v| Value::String(v.to_string()))
            } else if let Ok(value) = row.try_get::<Option<sqlx::types::Json<Value>>, _>(index) {
                value.map_or(Value::Null, |v| v.0)
            } else if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
                // information_schema reports some text columns as binary.
                value.map_or(Value::Null, |v| {
                    Value::String(String::from_utf8_lossy(&v).into_owned())
                })
            } else {
                debug!(column = %name, "Column type not decodable, returning null");
                Value::Null
            };
            query_row.insert(name, value);
        }

        query_row
    }
}

fn bind<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in params {
        query = match value.clone() {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Float(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Blob(v) => query.bind(v),
            SqlValue::Timestamp(v) => query.bind(v),
            SqlValue::Json(v) => query.bind(sqlx::types::Json(v)),
        };
    }
    query
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    fn db_type(&self) -> DbType {
        DbType::MySql
    }

    async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let rows = bind(sqlx::query(sql), params).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(Self::convert_row).collect())
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind(sqlx::query(sql), params).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn begin(&self) -> Result<Box<dyn SqlTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(MySqlTx { tx }))
    }
}

struct MySqlTx {
    tx: Transaction<'static, MySql>,
}

#[async_trait]
impl SqlTransaction for MySqlTx {
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let result = bind(sqlx::query(sql), params).execute(&mut *self.tx).await?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
