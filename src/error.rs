//! Domain-specific error types for squad-gear

use thiserror::Error;

/// Main error type for squad-gear infrastructure (config, store connection, CLI)
#[derive(Error, Debug)]
pub enum GearError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for GearError {
    fn from(err: serde_json::Error) -> Self {
        GearError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for GearError {
    fn from(err: toml::de::Error) -> Self {
        GearError::Config {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for GearError {
    fn from(err: std::io::Error) -> Self {
        GearError::Internal {
            message: format!("I/O failure: {}", err),
        }
    }
}

/// Result type alias for squad-gear operations
pub type Result<T> = std::result::Result<T, GearError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_conversion() {
        let bad = toml::from_str::<toml::Value>("[system").unwrap_err();
        let err: GearError = bad.into();
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let bad = serde_json::from_str::<serde_json::Value>("{ nope").unwrap_err();
        let err: GearError = bad.into();
        assert!(matches!(err, GearError::Serialization { .. }));
    }
}
