//! # Batch Error Types
//!
//! Structured error handling for batch iteration using thiserror.

use thiserror::Error;

/// Errors produced while configuring or driving a batch pass
#[derive(Error, Debug)]
pub enum BatchError {
    /// The batch configuration can never make progress (e.g. a zero batch size)
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// The caller's query shape prevents keyset pagination. Not retried.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Failure reported by a non-sqlx storage backend
    #[error("Storage error: {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("Unsupported operation: {operation}: {message}")]
    Unsupported { operation: String, message: String },

    #[error("Settings error: {0}")]
    Settings(#[from] ::config::ConfigError),
}

impl BatchError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Raised when a fetched page yields rows without a readable primary key,
    /// typically because a custom projection left the key column out.
    pub fn primary_key_not_included(primary_key: &str) -> Self {
        Self::Configuration {
            message: format!("primary key `{primary_key}` not included in the custom select clause"),
        }
    }

    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a caller configuration defect rather than a storage failure
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. } | Self::Configuration { .. } | Self::Settings(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;
