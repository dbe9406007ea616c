//! Records stored in the reserved collections, and table-name rules.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::store::Record;

/// Table key of a grant that covers every table.
pub const WILDCARD_TABLE: &str = "*";

/// Normalized names of the reserved collections.
const RESTRICTED_TABLES: [&str; 2] = ["mapps", "maccess"];

/// Lowercase a table name; the wildcard `*` becomes the empty string, which
/// is never a usable collection name.
pub fn normalize_table_name(raw: &str) -> String {
    if raw == WILDCARD_TABLE {
        return String::new();
    }
    raw.to_lowercase()
}

/// Whether `table` names one of the reserved collections, in any case.
pub fn is_restricted(table: &str) -> bool {
    RESTRICTED_TABLES.contains(&normalize_table_name(table).as_str())
}

/// An entry of `mApps`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRegistration {
    pub app_name: String,
    pub app_key: String,
}

/// An entry of `mAccess`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub app_name: String,
    pub table_name: String,
    pub has_access: bool,
}

/// Serialise a model into a store record.
pub(crate) fn to_record<T: Serialize>(value: &T) -> Record {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Record::new(),
    }
}

/// Read a store record as a model; `None` if it does not have the shape.
pub(crate) fn from_record<T: DeserializeOwned>(record: Record) -> Option<T> {
    serde_json::from_value(Value::Object(record)).ok()
}
