//! Filtered-read access to the remote document store.
//!
//! The equipment view only ever needs "documents in collection X whose field Y equals
//! Z"; this module narrows the store down to that one capability.

pub mod memory;
pub mod surreal;

pub use memory::MemoryStore;
pub use surreal::SurrealStore;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// A stored document: store-assigned id plus its JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Option<String>,
    pub body: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: Some(id.into()),
            body,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("invalid field path '{0}'")]
    InvalidFieldPath(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents in `collection` whose dotted `field_path` equals `value`, in store order
    async fn query_eq(
        &self,
        collection: &str,
        field_path: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Arc<T> {
    async fn query_eq(
        &self,
        collection: &str,
        field_path: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        (**self).query_eq(collection, field_path, value).await
    }
}

static FIELD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("field path pattern should compile")
});

/// Field paths end up inside query text, so only plain dotted identifiers pass
pub fn validate_field_path(path: &str) -> Result<(), StoreError> {
    if FIELD_PATH.is_match(path) {
        Ok(())
    } else {
        Err(StoreError::InvalidFieldPath(path.to_string()))
    }
}

/// Walk a dotted path through nested objects
pub fn lookup_path<'a>(body: &'a Value, field_path: &str) -> Option<&'a Value> {
    field_path
        .split('.')
        .try_fold(body, |current, segment| current.as_object()?.get(segment))
}
