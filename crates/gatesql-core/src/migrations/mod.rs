//! Schema migrations.
//!
//! The inspector reads what a table looks like in the database, the
//! differ compares that against the declared schema and emits DDL.
//!
//! ```rust
//! use gatesql_core::dialect::PostgresDialect;
//! use gatesql_core::migrations::SchemaDiffer;
//! use gatesql_core::schema::{fields, Kind, SchemaCollection, SchemaFieldType};
//!
//! let desired = SchemaCollection::from([(
//!     "users".to_string(),
//!     fields([SchemaFieldType::new("email", Kind::String).required()]),
//! )]);
//! let current = SchemaCollection::from([("users".to_string(), fields([]))]);
//!
//! let dialect = PostgresDialect::new();
//! let queries = SchemaDiffer::new(&dialect, "app")
//!     .generate_creation_queries("users", &desired, &current)
//!     .unwrap();
//!
//! assert_eq!(
//!     queries,
//!     vec![
//!         "ALTER TABLE app.users ADD COLUMN email text",
//!         "ALTER TABLE app.users ALTER COLUMN email SET NOT NULL",
//!     ]
//! );
//! ```

pub mod diff;
pub mod introspect;

pub use diff::SchemaDiffer;
pub use introspect::{
    inspect_table, ForeignKeysType, IndexType, InspectorFieldType, TableDescription,
};
