//! Desired schemas, keyed by database alias and table.
//!
//! Each table is stored behind its own [`Arc`], so a reader keeps a
//! consistent snapshot of one table while writers replace others.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::schema::{SchemaCollection, SchemaFields};

type Key = (String, String);

/// Shared store of the declared schema of every table.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    tables: RwLock<HashMap<Key, Arc<SchemaFields>>>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every table of `alias` with `collection`.
    pub fn set_collection(&self, alias: &str, collection: SchemaCollection) {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables.retain(|(owner, _), _| owner != alias);
        for (table, fields) in collection {
            tables.insert((alias.to_string(), table), Arc::new(fields));
        }
    }

    /// Replaces one table's fields.
    pub fn set_table(&self, alias: &str, table: &str, fields: SchemaFields) {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((alias.to_string(), table.to_string()), Arc::new(fields));
    }

    /// Snapshot of one table's fields.
    #[must_use]
    pub fn table(&self, alias: &str, table: &str) -> Option<Arc<SchemaFields>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(alias.to_string(), table.to_string()))
            .cloned()
    }

    pub fn remove_table(&self, alias: &str, table: &str) -> Option<Arc<SchemaFields>> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(alias.to_string(), table.to_string()))
    }

    /// Copies out every table declared for `alias`.
    #[must_use]
    pub fn collection(&self, alias: &str) -> SchemaCollection {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|((owner, _), _)| owner == alias)
            .map(|((_, table), fields)| (table.clone(), fields.as_ref().clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{fields, Kind, SchemaFieldType};

    fn one(name: &str) -> SchemaFields {
        fields([SchemaFieldType::new(name, Kind::String)])
    }

    #[test]
    fn test_snapshots_survive_replacement() {
        let registry = SchemaRegistry::new();
        registry.set_table("db", "users", one("name"));
        let before = registry.table("db", "users").unwrap();

        registry.set_table("db", "users", one("email"));
        assert!(before.contains_key("name"));
        assert!(registry.table("db", "users").unwrap().contains_key("email"));
    }

    #[test]
    fn test_collections_are_per_alias() {
        let registry = SchemaRegistry::new();
        registry.set_collection(
            "a",
            SchemaCollection::from([("t1".to_string(), one("x")), ("t2".to_string(), one("y"))]),
        );
        registry.set_table("b", "t1", one("z"));

        assert_eq!(registry.collection("a").len(), 2);
        registry.set_collection("a", SchemaCollection::from([("t3".to_string(), one("w"))]));
        assert_eq!(
            registry.collection("a").keys().collect::<Vec<_>>(),
            vec!["t3"]
        );
        assert!(registry.table("b", "t1").is_some());
        assert!(registry.remove_table("b", "t1").is_some());
        assert!(registry.table("b", "t1").is_none());
    }
}
