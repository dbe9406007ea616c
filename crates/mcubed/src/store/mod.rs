//! In-memory document store: per-collection CRUD over JSON records.
//!
//! # Module invariants
//!
//! - **No persistence.** Nothing here touches the disk or the codec; callers
//!   decide when a mutated [`Store`] is saved.
//! - **Total operations.** A missing collection or record is an empty or
//!   `None` result, never an error.
//! - **Stable identifiers.** [`Store::create`] assigns a fresh `id`; no update
//!   path can change it.

pub mod collection;
pub mod database;
pub mod predicate;

pub use collection::Collection;
pub use database::{Database, ACCESS_COLLECTION, APPS_COLLECTION};
pub use predicate::Predicate;

use serde_json::{Map, Value};
use uuid::Uuid;

/// A single document: field name → JSON value.
pub type Record = Map<String, Value>;

/// Field holding the system-assigned record identifier.
pub const ID_FIELD: &str = "id";

/// Merge `patch` into an owned copy of `record`. Patch fields overwrite;
/// every other field is untouched. The `id` field is never overwritten.
pub fn merge(mut record: Record, patch: &Record) -> Record {
    for (field, value) in patch {
        if field == ID_FIELD {
            continue;
        }
        record.insert(field.clone(), value.clone());
    }
    record
}

fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// The database plus the query/mutate operations on it.
#[derive(Debug, Clone, Default)]
pub struct Store {
    db: Database,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create the named collection if it does not exist.
    pub fn ensure_collection(&mut self, name: &str) {
        self.db.ensure(name);
    }

    pub fn get(&self, name: &str, id: &str) -> Option<Record> {
        self.db.collection(name)?.get(id).cloned()
    }

    /// Every record in `name` matching `predicate`, in insertion order.
    pub fn list(&self, name: &str, predicate: &Predicate) -> Vec<Record> {
        self.db
            .collection(name)
            .map(|c| c.filter(predicate).cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any record in `name` matches `predicate`.
    pub fn any(&self, name: &str, predicate: &Predicate) -> bool {
        self.db
            .collection(name)
            .is_some_and(|c| c.filter(predicate).next().is_some())
    }

    /// Store `payload` under a fresh `id` and return the stored record. A
    /// caller-supplied `id` is replaced.
    pub fn create(&mut self, name: &str, mut payload: Record) -> Record {
        payload.insert(ID_FIELD.to_owned(), Value::String(fresh_id()));
        self.db.ensure(name).push(payload.clone());
        payload
    }

    /// [`Store::create`] applied to each payload in order.
    ///
    /// There is no rollback: records inserted before a failure stay inserted.
    /// Identifier assignment cannot fail, so in practice the batch always
    /// completes.
    pub fn create_many(&mut self, name: &str, payloads: Vec<Record>) -> Vec<Record> {
        payloads
            .into_iter()
            .map(|payload| self.create(name, payload))
            .collect()
    }

    /// Append a record without assigning an `id`. Used for the reserved
    /// collections, whose records are keyed by their own fields.
    pub(crate) fn insert_raw(&mut self, name: &str, record: Record) {
        self.db.ensure(name).push(record);
    }

    /// Merge `patch` into the record with `id`; returns the merged record, or
    /// `None` if there is no such record.
    pub fn update_by_id(&mut self, name: &str, id: &str, patch: &Record) -> Option<Record> {
        self.db
            .collection_mut(name)?
            .replace_by_id(id, |old| merge(old, patch))
            .cloned()
    }

    /// Merge `patch` into every record matching `predicate`; returns the count.
    pub fn update_by_predicate(&mut self, name: &str, predicate: &Predicate, patch: &Record) -> usize {
        match self.db.collection_mut(name) {
            Some(c) => c.replace_matching(predicate, |old| merge(old, patch)),
            None => 0,
        }
    }

    pub fn remove_by_id(&mut self, name: &str, id: &str) -> Option<Record> {
        self.db.collection_mut(name)?.remove_by_id(id)
    }

    /// Remove every record matching `predicate`; returns the count.
    pub fn remove_by_predicate(&mut self, name: &str, predicate: &Predicate) -> usize {
        match self.db.collection_mut(name) {
            Some(c) => c.remove_matching(predicate),
            None => 0,
        }
    }

    /// Delete the whole collection. Returns whether it existed.
    pub fn drop_collection(&mut self, name: &str) -> bool {
        self.db.remove(name).is_some()
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.db.names()
    }
}
