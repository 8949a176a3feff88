//! # gatesql-core
//!
//! The I/O-free engine behind the gateway's SQL backends.
//!
//! This crate provides:
//! - A schema model and a per-dialect catalog for MySQL, Postgres and
//!   SQL Server
//! - A differ that turns a declared schema and an introspected one into
//!   the DDL that reconciles them
//! - Compilers for create/read/update/delete requests, including the
//!   Mongo-style update operators (`$set`, `$inc`, `$mul`, `$max`, `$min`,
//!   `$currentDate`)
//! - Document validation against the declared schema
//!
//! ## Schema Migration
//!
//! ```rust
//! use gatesql_core::migrations::SchemaDiffer;
//! use gatesql_core::schema::{fields, DbType, Kind, SchemaCollection, SchemaFieldType};
//!
//! let desired = SchemaCollection::from([(
//!     "users".to_string(),
//!     fields([
//!         SchemaFieldType::new("id", Kind::Id).primary(),
//!         SchemaFieldType::new("email", Kind::String).required(),
//!     ]),
//! )]);
//! let current = SchemaCollection::from([(
//!     "users".to_string(),
//!     fields([SchemaFieldType::new("id", Kind::Id).primary()]),
//! )]);
//!
//! let differ = SchemaDiffer::new(DbType::MySql.dialect(), "app");
//! let queries = differ
//!     .generate_creation_queries("users", &desired, &current)
//!     .unwrap();
//! assert_eq!(
//!     queries,
//!     vec![
//!         "ALTER TABLE app.users ADD email text",
//!         "ALTER TABLE app.users MODIFY email text NOT NULL",
//!     ]
//! );
//! ```
//!
//! ## Update Operators
//!
//! Values travel as bound parameters. Numeric operands are validated and
//! written inline:
//!
//! ```rust
//! use gatesql_core::crud::{compile_update, UpdateRequest, Operation};
//! use gatesql_core::schema::DbType;
//! use serde_json::json;
//!
//! let request: UpdateRequest = serde_json::from_value(json!({
//!     "find": {"id": "u1"},
//!     "op": "all",
//!     "update": {"$inc": {"score": 5}}
//! }))
//! .unwrap();
//! let compiled =
//!     compile_update(DbType::MySql.dialect(), "app", "players", &request, None).unwrap();
//! assert_eq!(compiled[0].sql, "UPDATE app.players SET score=score+5 WHERE id = ?");
//! ```

pub mod builder;
pub mod crud;
pub mod dialect;
pub mod error;
pub mod migrations;
pub mod registry;
pub mod schema;
pub mod validate;

pub use builder::{FilterExpr, SqlValue};
pub use crud::{CompiledUpdate, Operation, UpdateOperator};
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use migrations::{inspect_table, SchemaDiffer};
pub use registry::SchemaRegistry;
pub use schema::{DbType, Kind, SchemaCollection, SchemaFieldType, SchemaFields};
pub use validate::DocumentValidator;
