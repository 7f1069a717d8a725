//! # Batch Configuration
//!
//! [`BatchConfig`] parameterizes a single batch pass. [`BatchSettings`] carries
//! process-wide defaults loaded from an optional TOML file and `IN_BATCHES_*`
//! environment variables.

use crate::error::{BatchError, Result};
use crate::query_builder::BatchKey;
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Environment variable prefix for [`BatchSettings`]
pub const ENV_PREFIX: &str = "IN_BATCHES";

/// Immutable parameters of a batch pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    /// Maximum rows per page
    pub batch_size: usize,
    /// Inclusive lower primary key bound
    pub begin_at: Option<BatchKey>,
    /// Inclusive upper primary key bound
    pub end_at: Option<BatchKey>,
    /// Materialize each page's records while fetching its keys
    pub load: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            begin_at: None,
            end_at: None,
            load: false,
        }
    }
}

impl BatchConfig {
    /// Set the batch size
    pub fn of(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn begin_at(mut self, key: impl Into<BatchKey>) -> Self {
        self.begin_at = Some(key.into());
        self
    }

    pub fn end_at(mut self, key: impl Into<BatchKey>) -> Self {
        self.end_at = Some(key.into());
        self
    }

    pub fn load(mut self, load: bool) -> Self {
        self.load = load;
        self
    }

    /// Reject configurations that could never make progress.
    ///
    /// A reversed window (`begin_at > end_at`) is accepted; it simply matches
    /// no rows.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(BatchError::invalid_configuration(
                "batch_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Process-wide batching defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub load: bool,
    /// Pause between pages for bulk operations driven by the CLI
    pub throttle_ms: u64,
    pub database_url: Option<String>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            load: false,
            throttle_ms: 0,
            database_url: None,
        }
    }
}

impl BatchSettings {
    /// Load settings from an optional file, overridden by `IN_BATCHES_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Self = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a file only, ignoring the environment
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(File::from(path).required(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.batch_config().validate()
    }

    /// Batch configuration seeded from these settings, without bounds
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::default()
            .of(self.batch_size)
            .load(self.load)
    }

    pub fn throttle(&self) -> Option<Duration> {
        (self.throttle_ms > 0).then(|| Duration::from_millis(self.throttle_ms))
    }
}
