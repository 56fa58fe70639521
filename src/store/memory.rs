//! In-process document store. Backs the offline `--fixtures` mode of the CLI and
//! the test suites; supports failure injection and records every query it serves.

use super::{Document, DocumentStore, StoreError, lookup_path, validate_field_path};
use crate::deserializers::value_to_display;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::{Mutex, RwLock};

/// One query as the store saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub collection: String,
    pub field_path: String,
    pub value: String,
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    failure: Mutex<Option<String>>,
    queries: Mutex<Vec<QueryRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for fixtures
    pub fn with_document(mut self, collection: &str, document: Document) -> Self {
        self.collections
            .get_mut()
            .entry(collection.to_string())
            .or_default()
            .push(document);
        self
    }

    /// Load a JSON array of documents into `collection`; each document's `id` key
    /// (if any) becomes its store id
    pub fn from_json_file(path: impl AsRef<Path>, collection: &str) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content, collection)
    }

    pub fn from_json_str(content: &str, collection: &str) -> crate::error::Result<Self> {
        let parsed: Value = serde_json::from_str(content)?;
        let docs = match parsed {
            Value::Array(docs) => docs,
            single @ Value::Object(_) => vec![single],
            _ => {
                return Err(crate::error::GearError::Validation {
                    message: "fixture file must hold a JSON object or array".to_string(),
                });
            }
        };

        let mut store = Self::new();
        for body in docs {
            let id = body.get("id").and_then(value_to_display);
            store = store.with_document(collection, Document { id, body });
        }
        Ok(store)
    }

    pub async fn insert(&self, collection: &str, document: Document) {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Make every following query fail with `message` until cleared with `None`
    pub async fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock().await = message.map(str::to_string);
    }

    pub async fn queries(&self) -> Vec<QueryRecord> {
        self.queries.lock().await.clone()
    }

    pub async fn query_count(&self) -> usize {
        self.queries.lock().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query_eq(
        &self,
        collection: &str,
        field_path: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        validate_field_path(field_path)?;
        self.queries.lock().await.push(QueryRecord {
            collection: collection.to_string(),
            field_path: field_path.to_string(),
            value: value.to_string(),
        });

        if let Some(message) = self.failure.lock().await.clone() {
            return Err(StoreError::Unavailable(message));
        }

        let collections = self.collections.read().await;
        let matches = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| {
                        lookup_path(&doc.body, field_path).and_then(Value::as_str) == Some(value)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(matches)
    }
}
