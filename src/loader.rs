use crate::config::{DuplicatePolicy, EquipmentConfig};
use crate::models::EquipmentRecord;
use crate::presentation::{MSG_AMBIGUOUS, MSG_INVALID_PLAYER, MSG_LOAD_FAILED, MSG_NO_RECORD};
use crate::store::{Document, DocumentStore};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("player id must not be empty")]
    InvalidPlayerId,
    #[error("no equipment record for player '{player_id}'")]
    NotFound { player_id: String },
    #[error("{count} equipment records match player '{player_id}'")]
    Ambiguous { player_id: String, count: usize },
    #[error("equipment record '{document}' is malformed: {message}")]
    Malformed { document: String, message: String },
    #[error("equipment query failed: {message}")]
    Transient { message: String },
}

impl LoadError {
    /// Only store failures can go away by asking again
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Transient { .. })
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            LoadError::InvalidPlayerId => MSG_INVALID_PLAYER,
            LoadError::NotFound { .. } => MSG_NO_RECORD,
            LoadError::Ambiguous { .. } => MSG_AMBIGUOUS,
            LoadError::Malformed { .. } | LoadError::Transient { .. } => MSG_LOAD_FAILED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub collection: String,
    pub player_field: String,
    pub duplicate_policy: DuplicatePolicy,
    pub query_timeout: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self::from(&EquipmentConfig::default())
    }
}

impl From<&EquipmentConfig> for LoaderSettings {
    fn from(cfg: &EquipmentConfig) -> Self {
        Self {
            collection: cfg.collection.clone(),
            player_field: cfg.player_field.clone(),
            duplicate_policy: cfg.duplicate_policy,
            query_timeout: Duration::from_millis(cfg.query_timeout_ms),
        }
    }
}

/// Fetches the one equipment document that belongs to a player
pub struct EquipmentLoader<S: ?Sized> {
    store: Arc<S>,
    settings: LoaderSettings,
}

impl<S: DocumentStore + ?Sized> EquipmentLoader<S> {
    pub fn new(store: Arc<S>, settings: LoaderSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Run the filtered query for `player_id`; no caching, every call hits the store
    pub async fn fetch(&self, player_id: &str) -> Result<EquipmentRecord, LoadError> {
        let player_id = player_id.trim();
        if player_id.is_empty() {
            return Err(LoadError::InvalidPlayerId);
        }

        debug!(
            collection = %self.settings.collection,
            field = %self.settings.player_field,
            player_id,
            "fetching equipment record"
        );

        let query = self.store.query_eq(
            &self.settings.collection,
            &self.settings.player_field,
            player_id,
        );
        let docs = match tokio::time::timeout(self.settings.query_timeout, query).await {
            Ok(Ok(docs)) => docs,
            Ok(Err(e)) => {
                warn!(player_id, "equipment query failed: {}", e);
                return Err(LoadError::Transient {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                let timeout_ms = self.settings.query_timeout.as_millis();
                warn!(player_id, "equipment query timed out after {}ms", timeout_ms);
                return Err(LoadError::Transient {
                    message: format!("timed out after {}ms", timeout_ms),
                });
            }
        };

        let count = docs.len();
        let Some(doc) = docs.into_iter().next() else {
            info!(player_id, "no equipment record found");
            return Err(LoadError::NotFound {
                player_id: player_id.to_string(),
            });
        };

        if count > 1 {
            match self.settings.duplicate_policy {
                DuplicatePolicy::First => warn!(
                    player_id,
                    count, "multiple equipment records match, using the first"
                ),
                DuplicatePolicy::Reject => {
                    warn!(player_id, count, "multiple equipment records match, rejecting");
                    return Err(LoadError::Ambiguous {
                        player_id: player_id.to_string(),
                        count,
                    });
                }
            }
        }

        let record = record_from_document(doc)?;
        info!(
            player_id,
            record = record.record_key(),
            "equipment record loaded"
        );
        Ok(record)
    }
}

/// Deserialize a stored document; only a non-object body is rejected
pub fn record_from_document(doc: Document) -> Result<EquipmentRecord, LoadError> {
    let document = doc.id.clone().unwrap_or_else(|| "<sin id>".to_string());
    if !doc.body.is_object() {
        return Err(LoadError::Malformed {
            document,
            message: "document body is not an object".to_string(),
        });
    }

    let mut record: EquipmentRecord =
        serde_json::from_value(doc.body).map_err(|e| LoadError::Malformed {
            document,
            message: e.to_string(),
        })?;
    if record.id.is_none() {
        record.id = doc.id;
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn store_with(docs: Vec<Document>) -> Arc<MemoryStore> {
        let store = docs.into_iter().fold(MemoryStore::new(), |store, doc| {
            store.with_document("equipamiento", doc)
        });
        Arc::new(store)
    }

    fn doc(id: &str, player: &str) -> Document {
        Document::new(id, json!({"jugadorId": {"value": player, "label": "Juan"}}))
    }

    #[tokio::test]
    async fn test_fetch_returns_matching_record() {
        let loader = EquipmentLoader::new(store_with(vec![doc("a", "p1")]), LoaderSettings::default());
        let record = loader.fetch("p1").await.unwrap();
        assert_eq!(record.id.as_deref(), Some("a"));
        assert_eq!(record.player_label(), Some("Juan"));
    }

    #[tokio::test]
    async fn test_blank_player_id_never_queries() {
        let store = store_with(vec![]);
        let loader = EquipmentLoader::new(store.clone(), LoaderSettings::default());
        assert_eq!(loader.fetch("  ").await, Err(LoadError::InvalidPlayerId));
        assert_eq!(store.query_count().await, 0);
    }

    #[tokio::test]
    async fn test_player_id_is_trimmed() {
        let store = store_with(vec![doc("a", "p1")]);
        let loader = EquipmentLoader::new(store.clone(), LoaderSettings::default());
        assert!(loader.fetch(" p1 ").await.is_ok());
        assert_eq!(store.queries().await[0].value, "p1");
    }

    #[tokio::test]
    async fn test_duplicate_policy() {
        let store = store_with(vec![doc("a", "p1"), doc("b", "p1")]);

        let first = EquipmentLoader::new(store.clone(), LoaderSettings::default());
        assert_eq!(first.fetch("p1").await.unwrap().id.as_deref(), Some("a"));

        let strict = EquipmentLoader::new(
            store,
            LoaderSettings {
                duplicate_policy: DuplicatePolicy::Reject,
                ..LoaderSettings::default()
            },
        );
        let err = strict.fetch("p1").await.unwrap_err();
        assert_eq!(
            err,
            LoadError::Ambiguous {
                player_id: "p1".to_string(),
                count: 2
            }
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_record_from_document_rejects_non_object() {
        let err = record_from_document(Document::new("x", json!([1, 2]))).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { ref document, .. } if document == "x"));
    }

    #[test]
    fn test_user_messages() {
        let not_found = LoadError::NotFound {
            player_id: "p1".into(),
        };
        assert_eq!(not_found.user_message(), MSG_NO_RECORD);
        assert!(!not_found.is_retryable());

        let transient = LoadError::Transient {
            message: "offline".into(),
        };
        assert_eq!(transient.user_message(), MSG_LOAD_FAILED);
        assert!(transient.is_retryable());
    }
}
