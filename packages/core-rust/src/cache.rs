//! Normalized GraphQL result cache.
//!
//! Query results are flattened into records keyed by data id. Root fields
//! live under [`ROOT_QUERY`]; objects that carry `__typename` and an `id`
//! (or `_id`) are stored once under `Typename:id` and replaced in their
//! parents by `{"__ref": "Typename:id"}`. The whole structure is plain JSON,
//! which is what gets embedded in page props and shipped to the client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Data id of the record holding root query fields.
pub const ROOT_QUERY: &str = "ROOT_QUERY";

const REF_KEY: &str = "__ref";

// Refs can form cycles (a user listing its friends listing the user).
const MAX_READ_DEPTH: usize = 32;

/// Serializable snapshot of a GraphQL client cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot(BTreeMap<String, Map<String, Value>>);

impl CacheSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of stored records, `ROOT_QUERY` included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn record(&self, id: &str) -> Option<&Map<String, Value>> {
        self.0.get(id)
    }

    /// Writes the `data` object of a query response into the cache.
    ///
    /// Root fields are keyed by [`field_key`] so the same field fetched with
    /// different variables is kept apart. Fields of records that already
    /// exist are merged, newer values winning. Empty `data` leaves the
    /// snapshot untouched.
    pub fn write_query_result(&mut self, data: &Map<String, Value>, variables: &Map<String, Value>) {
        if data.is_empty() {
            return;
        }
        let root: Map<String, Value> = data
            .iter()
            .map(|(field, value)| (field_key(field, variables), self.normalize(value)))
            .collect();
        self.merge_record(ROOT_QUERY, root);
    }

    /// Reads a root field back, following refs into stored records.
    #[must_use]
    pub fn read_root_field(&self, field: &str, variables: &Map<String, Value>) -> Option<Value> {
        let value = self.0.get(ROOT_QUERY)?.get(&field_key(field, variables))?;
        Some(self.denormalize(value, 0))
    }

    fn normalize(&mut self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v)).collect()),
            Value::Object(obj) => {
                let fields: Map<String, Value> = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), self.normalize(v)))
                    .collect();
                match entity_id(obj) {
                    Some(id) => {
                        self.merge_record(&id, fields);
                        reference(&id)
                    }
                    None => Value::Object(fields),
                }
            }
            other => other.clone(),
        }
    }

    fn denormalize(&self, value: &Value, depth: usize) -> Value {
        if depth >= MAX_READ_DEPTH {
            return value.clone();
        }
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.denormalize(v, depth + 1))
                    .collect(),
            ),
            Value::Object(obj) => {
                if let Some(record) = ref_target(obj).and_then(|id| self.0.get(id)) {
                    return Value::Object(
                        record
                            .iter()
                            .map(|(k, v)| (k.clone(), self.denormalize(v, depth + 1)))
                            .collect(),
                    );
                }
                Value::Object(
                    obj.iter()
                        .map(|(k, v)| (k.clone(), self.denormalize(v, depth + 1)))
                        .collect(),
                )
            }
            other => other.clone(),
        }
    }

    fn merge_record(&mut self, id: &str, fields: Map<String, Value>) {
        self.0.entry(id.to_string()).or_default().extend(fields);
    }
}

impl From<BTreeMap<String, Map<String, Value>>> for CacheSnapshot {
    fn from(records: BTreeMap<String, Map<String, Value>>) -> Self {
        Self(records)
    }
}

/// Cache key of a root field: the bare name without variables, otherwise
/// `name({...})` with the variables as compact JSON (keys sorted).
///
/// Queries are not parsed, so every root field of an operation is keyed by
/// the whole operation's variables, including fields that take no
/// arguments. `hello` fetched next to `post(id: $id)` is stored as
/// `hello({"id":...})` and is only found again with the same variables.
#[must_use]
pub fn field_key(field: &str, variables: &Map<String, Value>) -> String {
    if variables.is_empty() {
        field.to_string()
    } else {
        format!("{field}({})", Value::Object(variables.clone()))
    }
}

/// Data id of an entity object, if it is identifiable.
#[must_use]
pub fn entity_id(obj: &Map<String, Value>) -> Option<String> {
    let typename = obj.get("__typename")?.as_str()?;
    let id = obj.get("id").or_else(|| obj.get("_id"))?;
    match id {
        Value::String(s) => Some(format!("{typename}:{s}")),
        Value::Number(n) => Some(format!("{typename}:{n}")),
        _ => None,
    }
}

fn reference(id: &str) -> Value {
    let mut obj = Map::new();
    obj.insert(REF_KEY.to_string(), Value::String(id.to_string()));
    Value::Object(obj)
}

fn ref_target(obj: &Map<String, Value>) -> Option<&str> {
    if obj.len() != 1 {
        return None;
    }
    obj.get(REF_KEY)?.as_str()
}
