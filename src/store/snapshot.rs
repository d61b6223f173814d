//! Document payloads, write data and snapshot types exchanged with a store

use super::error::{StoreError, StoreResult};
use super::path::{CollectionPath, DocumentPath};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Field map of a stored document
pub type JsonMap = serde_json::Map<String, Value>;

/// A single field value in a write
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A concrete JSON value
    Value(Value),
    /// Placeholder resolved to the commit time by the store
    ServerTimestamp,
}

/// Sentinel asking the store to fill in its own commit time
pub fn server_timestamp() -> FieldValue {
    FieldValue::ServerTimestamp
}

/// Render a timestamp the way stores persist them
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Fields of a write, possibly containing server timestamp sentinels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentData {
    fields: BTreeMap<String, FieldValue>,
}

impl DocumentData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build write data from any serializable struct that encodes as an object
    pub fn from_serializable<T: Serialize>(value: &T) -> StoreResult<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self {
                fields: map
                    .into_iter()
                    .map(|(k, v)| (k, FieldValue::Value(v)))
                    .collect(),
            }),
            other => Err(StoreError::Serialization(format!(
                "document data must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields
            .insert(key.to_string(), FieldValue::Value(value.into()));
        self
    }

    pub fn with_server_timestamp(mut self, key: &str) -> Self {
        self.fields.insert(key.to_string(), server_timestamp());
        self
    }

    pub fn set(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace every sentinel with `now` and produce the stored field map
    pub fn resolve(self, now: DateTime<Utc>) -> JsonMap {
        self.fields
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    FieldValue::Value(v) => v,
                    FieldValue::ServerTimestamp => timestamp_value(now),
                };
                (key, value)
            })
            .collect()
    }
}

/// A document as delivered inside a collection snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: JsonMap,
}

impl Document {
    pub fn new(id: impl Into<String>, data: JsonMap) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Decode the field map into a typed record
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            StoreError::Serialization(format!("document '{}': {}", self.id, e))
        })
    }
}

/// State of one document; `data` is `None` when the document is absent
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub path: DocumentPath,
    pub data: Option<JsonMap>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|data| data.get(field))
    }

    /// Decode the document, `Ok(None)` when it does not exist
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<Option<T>> {
        match &self.data {
            Some(data) => serde_json::from_value(Value::Object(data.clone()))
                .map(Some)
                .map_err(|e| StoreError::Serialization(format!("document '{}': {}", self.path, e))),
            None => Ok(None),
        }
    }
}

/// Full current content of a collection, in query order
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot {
    pub path: CollectionPath,
    pub docs: Vec<Document>,
}

impl CollectionSnapshot {
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Document ids in snapshot order
    pub fn ids(&self) -> Vec<String> {
        self.docs.iter().map(|doc| doc.id.clone()).collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.iter().any(|doc| doc.id == id)
    }
}

/// Sort direction of a collection query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

/// Ordering applied to a collection subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl QueryOrder {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Descending,
        }
    }
}
