//! [`Database`]: every collection, keyed by name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Collection;

/// Name of the collection holding app registrations.
pub const APPS_COLLECTION: &str = "mApps";

/// Name of the collection holding access grants.
pub const ACCESS_COLLECTION: &str = "mAccess";

/// The whole database. Serialises as a JSON object mapping each collection
/// name to its array of records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    collections: BTreeMap<String, Collection>,
}

impl Default for Database {
    /// A fresh database: the two reserved collections, both empty.
    fn default() -> Self {
        let mut collections = BTreeMap::new();
        collections.insert(APPS_COLLECTION.to_owned(), Collection::new());
        collections.insert(ACCESS_COLLECTION.to_owned(), Collection::new());
        Self { collections }
    }
}

impl Database {
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.get(name)
    }

    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.collections.get_mut(name)
    }

    /// The named collection, created empty if absent.
    pub fn ensure(&mut self, name: &str) -> &mut Collection {
        self.collections.entry(name.to_owned()).or_default()
    }

    pub fn remove(&mut self, name: &str) -> Option<Collection> {
        self.collections.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_database_has_empty_reserved_collections() {
        let json = serde_json::to_value(Database::default()).unwrap();
        assert_eq!(json, json!({"mAccess": [], "mApps": []}));
    }

    #[test]
    fn deserialises_existing_layout() {
        let db: Database = serde_json::from_value(json!({
            "mApps": [{"appName": "a", "appKey": "k"}],
            "mAccess": [],
            "widgets": [{"id": "1", "name": "w"}]
        }))
        .unwrap();
        assert_eq!(db.collection(APPS_COLLECTION).unwrap().len(), 1);
        assert!(db.collection("widgets").unwrap().get("1").is_some());
    }

    #[test]
    fn ensure_is_idempotent() {
        let mut db = Database::default();
        db.ensure("widgets").push(json!({"id": "1"}).as_object().cloned().unwrap());
        db.ensure("widgets");
        assert_eq!(db.collection("widgets").unwrap().len(), 1);
    }
}
