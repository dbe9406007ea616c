//! [`Collection`]: insertion-ordered record arena with an `id` index.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::{Predicate, Record, ID_FIELD};

/// An ordered set of records.
///
/// Records live in slots keyed by a monotonically increasing slot number, so
/// iteration follows insertion order and removal never shifts other entries.
/// Records carrying a string `id` are additionally indexed by it.
///
/// Serialises as a plain JSON array of records.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    slots: BTreeMap<u64, Record>,
    by_id: HashMap<String, u64>,
    next_slot: u64,
}

fn id_of(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Value::as_str)
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Append a record as-is.
    pub fn push(&mut self, record: Record) {
        let slot = self.next_slot;
        self.next_slot += 1;
        if let Some(id) = id_of(&record) {
            self.by_id.insert(id.to_owned(), slot);
        }
        self.slots.insert(slot, record);
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.by_id.get(id).and_then(|slot| self.slots.get(slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.slots.values()
    }

    /// Records matching `predicate`, in insertion order.
    pub fn filter<'a>(&'a self, predicate: &'a Predicate) -> impl Iterator<Item = &'a Record> + 'a {
        self.iter().filter(move |r| predicate.matches(r))
    }

    /// Replace the record stored under `id` with `f(old)`. The record keeps
    /// its slot and its `id`.
    pub fn replace_by_id(&mut self, id: &str, f: impl FnOnce(Record) -> Record) -> Option<&Record> {
        let slot = *self.by_id.get(id)?;
        let old = self.slots.remove(&slot)?;
        self.slots.insert(slot, f(old));
        self.slots.get(&slot)
    }

    /// Replace every record matching `predicate` with `f(old)`. Returns the
    /// number of records replaced.
    pub fn replace_matching(&mut self, predicate: &Predicate, mut f: impl FnMut(Record) -> Record) -> usize {
        let targets: Vec<u64> = self
            .slots
            .iter()
            .filter(|(_, r)| predicate.matches(r))
            .map(|(slot, _)| *slot)
            .collect();
        for slot in &targets {
            if let Some(old) = self.slots.remove(slot) {
                self.slots.insert(*slot, f(old));
            }
        }
        targets.len()
    }

    pub fn remove_by_id(&mut self, id: &str) -> Option<Record> {
        let slot = self.by_id.remove(id)?;
        self.slots.remove(&slot)
    }

    /// Remove every record matching `predicate`. Returns the number removed.
    pub fn remove_matching(&mut self, predicate: &Predicate) -> usize {
        let before = self.len();
        let by_id = &mut self.by_id;
        self.slots.retain(|_, record| {
            if !predicate.matches(record) {
                return true;
            }
            if let Some(id) = id_of(record) {
                by_id.remove(id);
            }
            false
        });
        before - self.len()
    }
}

impl FromIterator<Record> for Collection {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut collection = Collection::new();
        for record in iter {
            collection.push(record);
        }
        collection
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.slots.values())
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<Record>::deserialize(deserializer).map(Collection::from_iter)
    }
}
