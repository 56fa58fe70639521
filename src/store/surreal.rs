use super::{Document, DocumentStore, StoreError, validate_field_path};
use crate::config::Config;
use crate::deserializers::value_to_display;
use crate::error::{GearError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{debug, info, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// SurrealDB over WebSocket
pub struct SurrealStore {
    db: Surreal<Client>,
}

impl SurrealStore {
    pub fn from_client(db: Surreal<Client>) -> Self {
        Self { db }
    }

    /// Connect, sign in and select namespace/database from config
    pub async fn connect(config: &Config) -> Result<Self> {
        let system = &config.system;
        let retries = if config.runtime.db_reconnect {
            system.connect_retries
        } else {
            0
        };
        let base = Duration::from_millis(system.connect_backoff_ms);
        info!(url = %system.database_url, "connecting to SurrealDB");

        let mut attempt = 0u32;
        let db = loop {
            match Surreal::new::<Ws>(ws_endpoint(&system.database_url).to_string()).await {
                Ok(db) => break db,
                Err(e) if attempt < retries => {
                    let delay = backoff_delay(base, attempt);
                    warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "SurrealDB connect failed: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(GearError::Database {
                        message: format!(
                            "cannot reach SurrealDB at {} after {} attempt(s): {}",
                            system.database_url,
                            attempt + 1,
                            e
                        ),
                    });
                }
            }
        };
        if attempt > 0 {
            info!(attempts = attempt + 1, "connected to SurrealDB after retrying");
        }

        let user = &config.runtime.database_user;
        db.signin(Root {
            username: user.as_str(),
            password: config.runtime.database_pass.as_str(),
        })
        .await
        .map_err(|e| GearError::Database {
            message: format!("sign-in as '{}' rejected: {}", user, e),
        })?;

        db.use_ns(&system.database_ns)
            .use_db(&system.database_db)
            .await
            .map_err(|e| GearError::Database {
                message: format!(
                    "cannot select {}/{}: {}",
                    system.database_ns, system.database_db, e
                ),
            })?;

        Ok(Self { db })
    }
}

/// The Ws engine takes `host:port`; drop any scheme
fn ws_endpoint(url: &str) -> &str {
    url.split_once("://").map_or(url, |(_, rest)| rest)
}

/// Delay before reconnect attempt `attempt` (0-based): doubles from `base`, capped
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1u32 << attempt.min(16)).min(MAX_BACKOFF)
}

#[async_trait]
impl DocumentStore for SurrealStore {
    async fn query_eq(
        &self,
        collection: &str,
        field_path: &str,
        value: &str,
    ) -> std::result::Result<Vec<Document>, StoreError> {
        validate_field_path(field_path)?;
        // Field paths cannot be bound, hence the validation above; table and value are parameters
        let sql = format!(
            "SELECT *, meta::id(id) AS id FROM type::table($tb) WHERE {} = $value",
            field_path
        );
        debug!(collection, field_path, value, "querying document store");

        let mut response = self
            .db
            .query(sql)
            .bind(("tb", collection.to_string()))
            .bind(("value", value.to_string()))
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let rows: Vec<Value> = response
            .take(0)
            .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|body| Document {
                id: body.get("id").and_then(value_to_display),
                body,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_endpoint_strips_scheme() {
        assert_eq!(ws_endpoint("ws://127.0.0.1:8000"), "127.0.0.1:8000");
        assert_eq!(ws_endpoint("https://db.club:443"), "db.club:443");
        assert_eq!(ws_endpoint("127.0.0.1:8000"), "127.0.0.1:8000");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(500));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(4000));
        assert_eq!(backoff_delay(base, 40), MAX_BACKOFF);
    }
}
