use crate::error::{GearError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Main configuration structure loaded from squad_gear.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub equipment: EquipmentConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Document store location
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub database_url: String,
    pub database_ns: String,
    pub database_db: String,
    /// Extra connection attempts when `GEAR_DB_RECONNECT` is on
    pub connect_retries: u32,
    /// First reconnect delay; doubles per attempt
    pub connect_backoff_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            database_url: "127.0.0.1:8000".to_string(),
            database_ns: "potros".to_string(),
            database_db: "club".to_string(),
            connect_retries: 5,
            connect_backoff_ms: 1000,
        }
    }
}

/// How the equipment query is issued and how its result is read
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EquipmentConfig {
    pub collection: String,
    /// Dotted path of the player identifier inside each document
    pub player_field: String,
    pub duplicate_policy: DuplicatePolicy,
    /// Also read the old boolean-flag document shape
    pub legacy_flags: bool,
    pub query_timeout_ms: u64,
}

impl Default for EquipmentConfig {
    fn default() -> Self {
        Self {
            collection: "equipamiento".to_string(),
            player_field: "jugadorId.value".to_string(),
            duplicate_policy: DuplicatePolicy::First,
            legacy_flags: false,
            query_timeout_ms: 10_000,
        }
    }
}

/// What to do when more than one equipment document matches a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Take the first document the store returns and log a warning
    #[default]
    First,
    /// Refuse to pick one; surfaces as an ambiguous-record error
    Reject,
}

impl FromStr for DuplicatePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(DuplicatePolicy::First),
            "reject" => Ok(DuplicatePolicy::Reject),
            other => Err(format!(
                "unknown duplicate policy '{}', expected 'first' or 'reject'",
                other
            )),
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicatePolicy::First => f.write_str("first"),
            DuplicatePolicy::Reject => f.write_str("reject"),
        }
    }
}

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub database_user: String,
    pub database_pass: String,
    pub db_reconnect: bool,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            database_user: "root".to_string(),
            database_pass: "root".to_string(),
            db_reconnect: false,
            log_level: "squad_gear=info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load runtime configuration from environment variables
    pub fn load_from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_user: lookup("GEAR_DB_USER").unwrap_or(defaults.database_user),
            database_pass: lookup("GEAR_DB_PASS").unwrap_or(defaults.database_pass),
            db_reconnect: lookup("GEAR_DB_RECONNECT")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }
}

const MIN_QUERY_TIMEOUT_MS: u64 = 100;
const MAX_QUERY_TIMEOUT_MS: u64 = 120_000;

impl Config {
    /// Load configuration from TOML file and environment variables
    /// Uses SQUAD_GEAR_CONFIG environment variable or defaults to "squad_gear.toml"
    pub fn load() -> anyhow::Result<Self> {
        // .env lookup order: GEAR_ENV_FILE, ./.env, then ../.env when the
        // database URL is still unset
        if let Ok(env_path) = std::env::var("GEAR_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
            if std::env::var("GEAR_DB_URL").is_err() {
                let _ = dotenvy::from_path("../.env");
            }
        }

        let config_path = std::env::var("SQUAD_GEAR_CONFIG")
            .unwrap_or_else(|_| "squad_gear.toml".to_string());

        let mut config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            Self::from_toml(&content)?
        } else {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.runtime = RuntimeConfig::load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Parse the TOML layer only (no environment, no validation)
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `GEAR_*` overrides on top of the file configuration (env-first)
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("GEAR_DB_URL") {
            tracing::debug!("GEAR_DB_URL env override applied");
            self.system.database_url = url;
        }
        if let Some(ns) = lookup("GEAR_DB_NS") {
            tracing::debug!("GEAR_DB_NS env override applied");
            self.system.database_ns = ns;
        }
        if let Some(db) = lookup("GEAR_DB_DB") {
            tracing::debug!("GEAR_DB_DB env override applied");
            self.system.database_db = db;
        }
        if let Some(retries) = lookup("GEAR_DB_CONNECT_RETRIES").and_then(|v| v.parse().ok()) {
            self.system.connect_retries = retries;
        }
        if let Some(backoff) = lookup("GEAR_DB_BACKOFF_MS").and_then(|v| v.parse().ok()) {
            self.system.connect_backoff_ms = backoff;
        }
        if let Some(collection) = lookup("GEAR_COLLECTION") {
            self.equipment.collection = collection;
        }
        if let Some(field) = lookup("GEAR_PLAYER_FIELD") {
            self.equipment.player_field = field;
        }
        if let Some(timeout) = lookup("GEAR_QUERY_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.equipment.query_timeout_ms = timeout;
        }
        if let Some(policy) = lookup("GEAR_DUPLICATE_POLICY") {
            match policy.parse() {
                Ok(p) => self.equipment.duplicate_policy = p,
                Err(e) => tracing::warn!("Ignoring GEAR_DUPLICATE_POLICY: {}", e),
            }
        }
        if let Some(legacy) = lookup("GEAR_LEGACY_FLAGS") {
            self.equipment.legacy_flags = legacy == "1" || legacy.eq_ignore_ascii_case("true");
        }
    }

    /// Validate and clamp; hard errors only for values that would corrupt the query
    pub fn validate(&mut self) -> Result<()> {
        let url = &self.system.database_url;
        if !url.starts_with("ws://")
            && !url.starts_with("wss://")
            && !url.starts_with("http://")
            && !url.starts_with("https://")
        {
            let bare = url.as_str();
            if !bare.contains(':') || bare.starts_with(':') || bare.ends_with(':') {
                tracing::warn!(
                    "Database URL '{}' appears to be missing hostname or port",
                    url
                );
            }
        }

        if self.equipment.collection.trim().is_empty() {
            return Err(GearError::Config {
                message: "equipment collection name must not be empty".to_string(),
            });
        }
        crate::store::validate_field_path(&self.equipment.player_field).map_err(|e| {
            GearError::Config {
                message: e.to_string(),
            }
        })?;

        let timeout = self.equipment.query_timeout_ms;
        let clamped = timeout.clamp(MIN_QUERY_TIMEOUT_MS, MAX_QUERY_TIMEOUT_MS);
        if clamped != timeout {
            tracing::warn!(
                "query_timeout_ms {} out of range, clamping to {}",
                timeout,
                clamped
            );
            self.equipment.query_timeout_ms = clamped;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [equipment]
            duplicate_policy = "reject"
            "#,
        )
        .unwrap();
        assert_eq!(config.equipment.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.equipment.collection, "equipamiento");
        assert_eq!(config.equipment.player_field, "jugadorId.value");
        assert_eq!(config.system.database_ns, "potros");
    }

    #[test]
    fn test_env_overrides_win_over_file() {
        let mut config = Config::from_toml("[system]\ndatabase_url = \"ws://file:8000\"").unwrap();
        config.apply_env_overrides(lookup_from(&[
            ("GEAR_DB_URL", "ws://env:9000"),
            ("GEAR_LEGACY_FLAGS", "true"),
            ("GEAR_QUERY_TIMEOUT_MS", "2500"),
            ("GEAR_DB_CONNECT_RETRIES", "2"),
        ]));
        assert_eq!(config.system.connect_retries, 2);
        assert_eq!(config.system.connect_backoff_ms, 1000);
        assert_eq!(config.system.database_url, "ws://env:9000");
        assert!(config.equipment.legacy_flags);
        assert_eq!(config.equipment.query_timeout_ms, 2500);
    }

    #[test]
    fn test_bad_duplicate_policy_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(lookup_from(&[("GEAR_DUPLICATE_POLICY", "newest")]));
        assert_eq!(config.equipment.duplicate_policy, DuplicatePolicy::First);
    }

    #[test]
    fn test_validate_clamps_timeout() {
        let mut config = Config::default();
        config.equipment.query_timeout_ms = 5;
        config.validate().unwrap();
        assert_eq!(config.equipment.query_timeout_ms, MIN_QUERY_TIMEOUT_MS);
    }

    #[test]
    fn test_validate_rejects_injected_field_path() {
        let mut config = Config::default();
        config.equipment.player_field = "jugadorId.value = 1 OR true".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_errors_are_typed() {
        let err = Config::from_toml("[equipment\ncollection = 1").unwrap_err();
        assert!(matches!(err, GearError::Config { .. }));

        let mut config = Config::default();
        config.equipment.collection = "  ".to_string();
        assert!(matches!(config.validate(), Err(GearError::Config { .. })));
    }

    #[test]
    fn test_runtime_reconnect_flag() {
        let runtime = RuntimeConfig::from_lookup(lookup_from(&[("GEAR_DB_RECONNECT", "1")]));
        assert!(runtime.db_reconnect);
        assert_eq!(runtime.database_user, "root");
    }
}
