//! End-to-end CRUD against a live PostgreSQL.
//!
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

use std::sync::Arc;

use gatesql_core::crud::{CreateRequest, Operation, ReadRequest, UpdateRequest};
use gatesql_core::schema::{fields, Kind, SchemaFieldType};
use gatesql_core::SchemaRegistry;
use gatesql_driver::{describe_table, PostgresExecutor, SqlCrud};
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
#[ignore] // Requires PostgreSQL running
async fn upsert_inserts_then_increments() {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgresql://localhost/test".into());
    let executor = Arc::new(PostgresExecutor::connect(&url).await.unwrap());
    let crud = SqlCrud::new("db", "gs_live", executor, Arc::new(SchemaRegistry::new()));

    crud.create_project_if_not_exists().await.unwrap();
    crud.raw_batch(&["CREATE TABLE IF NOT EXISTS gs_live.players (id text PRIMARY KEY, score bigint)".to_string()])
        .await
        .unwrap();
    crud.raw_batch(&["DELETE FROM gs_live.players".to_string()])
        .await
        .unwrap();

    crud.create(
        "players",
        &CreateRequest {
            document: json!({"id": "p1", "score": 1}),
            operation: Operation::One,
        },
    )
    .await
    .unwrap();

    let bump = UpdateRequest {
        find: object(json!({"id": "p1"})),
        operation: Operation::Upsert,
        update: object(json!({"$inc": {"score": 4}})),
    };
    assert_eq!(crud.update("players", &bump).await.unwrap(), 1);

    let player = crud
        .read(
            "players",
            &ReadRequest {
                find: object(json!({"id": "p1"})),
                operation: Operation::One,
                ..ReadRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(player, json!({"id": "p1", "score": 5}));

    crud.delete_table("players").await.unwrap();
}

#[tokio::test]
#[ignore] // Requires PostgreSQL running
async fn set_null_and_timestamps_on_typed_columns() {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgresql://localhost/test".into());
    let executor = Arc::new(PostgresExecutor::connect(&url).await.unwrap());
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
    let crud = SqlCrud::new("db", "gs_live", executor, schemas);

    crud.create_project_if_not_exists().await.unwrap();
    crud.raw_batch(&[
        "DROP TABLE IF EXISTS gs_live.people".to_string(),
        "CREATE TABLE gs_live.people (id varchar(50) PRIMARY KEY, age bigint, born timestamp)".to_string(),
        "INSERT INTO gs_live.people (id, age) VALUES ('p1', 30)".to_string(),
    ])
    .await
    .unwrap();

    let set = UpdateRequest {
        find: object(json!({"id": "p1"})),
        operation: Operation::All,
        update: object(json!({"$set": {"age": null, "born": "1990-05-17T08:30:00Z"}})),
    };
    assert_eq!(crud.update("people", &set).await.unwrap(), 1);

    let count = crud
        .read(
            "people",
            &ReadRequest {
                find: object(json!({"born": {"$gt": "1980-01-01T00:00:00Z"}, "age": null})),
                operation: Operation::Count,
                ..ReadRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(count, json!(1));

    crud.delete_table("people").await.unwrap();
}

#[tokio::test]
#[ignore] // Requires PostgreSQL running
async fn describe_reports_quoted_defaults_and_one_based_index_positions() {
    let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgresql://localhost/test".into());
    let executor = Arc::new(PostgresExecutor::connect(&url).await.unwrap());
    let crud = SqlCrud::new("db", "gs_live", executor.clone(), Arc::new(SchemaRegistry::new()));

    crud.create_project_if_not_exists().await.unwrap();
    crud.raw_batch(&[
        "DROP TABLE IF EXISTS gs_live.notes".to_string(),
        "CREATE TABLE gs_live.notes (id varchar(50) PRIMARY KEY, title text DEFAULT 'it''s', \
         views bigint DEFAULT 0)"
            .to_string(),
        "CREATE UNIQUE INDEX notes_pair ON gs_live.notes (title, views)".to_string(),
    ])
    .await
    .unwrap();

    let fields = crud.inspect("notes").await.unwrap();
    assert_eq!(fields["title"].default, Some(json!("it's")));
    assert_eq!(fields["views"].default, Some(json!("0")));

    let description = describe_table(executor.as_ref(), "gs_live", "notes").await.unwrap();
    let mut pair: Vec<(String, i64)> = description
        .indexes
        .iter()
        .filter(|index| index.index_name == "notes_pair")
        .map(|index| (index.column_name.clone(), index.seq_in_index))
        .collect();
    pair.sort();
    assert_eq!(pair, vec![("title".to_string(), 1), ("views".to_string(), 2)]);

    crud.delete_table("notes").await.unwrap();
}
