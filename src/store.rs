//! The keyed object store: a read-only snapshot of a normalized cache.
//!
//! The snapshot maps opaque entity identifiers to flat objects whose values
//! are scalars, lists, reference markers pointing at other entities, or
//! JSON-wrapped scalars. It is extracted from an external cache once per
//! operation and never mutated by the executor.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Value;

/// Identifier of the pseudo-entity holding a query's top-level fields.
///
/// Store population and the executor's root invocation must agree on this
/// value, so it lives here and nowhere else.
pub const ROOT_QUERY_ID: &str = "ROOT_QUERY";

/// A reference marker: "this field points at another stored object".
///
/// Serialized as `{"type": "id", "id": "...", "typename": "..."}`, the shape
/// normalized caches emit for entity links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    marker: RefMarker,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typename: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum RefMarker {
    #[serde(rename = "id")]
    Id,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, typename: Option<String>) -> Self {
        EntityRef {
            marker: RefMarker::Id,
            id: id.into(),
            typename,
        }
    }

    /// The synthetic reference the executor starts from.
    pub fn query_root() -> Self {
        EntityRef::new(ROOT_QUERY_ID, None)
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_QUERY_ID
    }
}

/// A scalar stored behind an escaping wrapper: `{"type": "json", "json": …}`.
///
/// Caches wrap raw JSON blobs this way so they cannot be confused with
/// reference markers. The resolver unwraps them before handing them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonScalar {
    #[serde(rename = "type")]
    marker: JsonMarker,
    pub json: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum JsonMarker {
    #[serde(rename = "json")]
    Json,
}

/// A value stored at one field key of a [`StoreObject`].
///
/// The variant order matters for deserialization: marker objects must be
/// tried before the catch-all scalar variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Reference(EntityRef),
    Json(JsonScalar),
    List(Vec<StoreValue>),
    Scalar(Value),
}

impl StoreValue {
    /// Converts the stored value into plain response JSON.
    ///
    /// Reference markers serialize as their marker object; a query selecting
    /// an entity field without a sub-selection is invalid upstream, so this
    /// path only matters for debug output.
    pub(crate) fn to_json(&self) -> Value {
        match self {
            StoreValue::Scalar(value) => value.clone(),
            StoreValue::Json(wrapped) => wrapped.json.clone(),
            StoreValue::List(items) => Value::Array(items.iter().map(StoreValue::to_json).collect()),
            StoreValue::Reference(entity) => {
                serde_json_bytes::to_value(entity).unwrap_or(Value::Null)
            }
        }
    }
}

/// One flat cached object: field storage key to stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreObject {
    fields: HashMap<String, StoreValue>,
}

impl StoreObject {
    pub fn field(&self, storage_key: &str) -> Option<&StoreValue> {
        self.fields.get(storage_key)
    }

    pub fn insert(&mut self, storage_key: impl Into<String>, value: StoreValue) {
        self.fields.insert(storage_key.into(), value);
    }

    /// The object's `__typename`, when the cache recorded one.
    pub fn typename(&self) -> Option<&str> {
        match self.fields.get("__typename") {
            Some(StoreValue::Scalar(value)) => value.as_str(),
            _ => None,
        }
    }
}

impl FromIterator<(String, StoreValue)> for StoreObject {
    fn from_iter<I: IntoIterator<Item = (String, StoreValue)>>(iter: I) -> Self {
        StoreObject {
            fields: iter.into_iter().collect(),
        }
    }
}

/// An immutable id → object snapshot of the cache, captured at a single
/// point in time.
///
/// Lookups are O(1); an unknown identifier is `None`, never an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheSnapshot {
    entities: HashMap<String, StoreObject>,
}

impl CacheSnapshot {
    pub fn new() -> Self {
        CacheSnapshot::default()
    }

    pub fn get(&self, id: &str) -> Option<&StoreObject> {
        self.entities.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, object: StoreObject) {
        self.entities.insert(id.into(), object);
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
