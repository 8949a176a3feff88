//! PostgreSQL executor backed by a sqlx pool.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use gatesql_core::{DbType, SqlValue};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow, Postgres};
use sqlx::query::Query;
use sqlx::{Column, Row, Transaction};
use tracing::debug;

use crate::error::Result;
use crate::executor::{QueryResult, QueryRow, SqlExecutor, SqlTransaction};

pub struct PostgresExecutor {
    pool: PgPool,
}

impl PostgresExecutor {
    /// Creates a new PostgreSQL executor with a connection pool.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert a PostgreSQL row to a `QueryRow`.
    fn convert_row(row: &PgRow) -> QueryRow {
        let mut query_row = QueryRow::new();

        for column in row.columns() {
            let name = column.name();
            let index = column.ordinal();

            let value = if let Ok(value) = row.try_get::<Option<String>, _>(index) {
                value.map_or(Value::Null, Value::String)
            } else if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<i16>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
                value.map_or(Value::Null, Value::from)
            } else if let Ok(value) = row.try_get::<Option<f32>, _>(index) {
                value.map_or(Value::Null, |v| Value::from(f64::from(v)))
            } else if let Ok(value) = row.try_get::<Option<bool>, _>(index) {
                value.map_or(Value::Null, Value::Bool)
            } else if let Ok(value) = row.try_get::<Option<uuid::Uuid>, _>(index) {
                value.map_or(Value::Null, |v| Value::String(v.to_string()))
            } else if let Ok(value) = row.try_get::<Option<DateTime<Utc>>, _>(index) {
                value.map_or(Value::Null, |v| SqlValue::Timestamp(v).to_json())
            } else if let Ok(value) = row.try_get::<Option<NaiveDateTime>, _>(index) {
                value.map_or(Value::Null, |v| SqlValue::Timestamp(v.and_utc()).to_json())
            } else if let Ok(value) = row.try_get::<Option<NaiveDate>, _>(index) {
                value.map_or(Value::Null, |v| Value::String(v.to_string()))
            } else if let Ok(value) = row.try_get::<Option<NaiveTime>, _>(index) {
                value.map_or(Value::Null, |v| Value::String(v.to_string()))
            } else if let Ok(value) = row.try_get::<Option<Value>, _>(index) {
                value.unwrap_or(Value::Null)
            } else if let Ok(value) = row.try_get::<Option<Vec<u8>>, _>(index) {
                value.map_or(Value::Null, Value::from)
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
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[SqlValue],
) -> Query<'q, Postgres, PgArguments> {
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
impl SqlExecutor for PostgresExecutor {
    fn db_type(&self) -> DbType {
        DbType::Postgres
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
        Ok(Box::new(PostgresTx { tx }))
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SqlTransaction for PostgresTx {
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
