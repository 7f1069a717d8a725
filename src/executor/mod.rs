//! # Batch Executors
//!
//! The storage seam batching runs against. A [`BatchExecutor`] executes the
//! statements a [`Relation`] renders: plucking primary keys, materializing
//! records, and bulk UPDATE/DELETE. Executors add no retry policy; storage
//! failures propagate to the caller unchanged.
//!
//! Two executors ship with the crate:
//!
//! - [`sqlx::PgPool`] for PostgreSQL
//! - [`MemoryStore`] for in-process tables (tests and dry runs)

pub mod memory;
pub mod postgres;

pub use memory::{MemoryRow, MemoryStore};

use crate::error::Result;
use crate::query_builder::{Assignment, BatchKey, Relation};
use async_trait::async_trait;

/// A materialized row whose primary key can be read back
pub trait KeyedRecord {
    /// The value of `primary_key`, or `None` when the column is absent or null
    fn key_value(&self, primary_key: &str) -> Option<BatchKey>;
}

/// Executes the statements produced by a [`Relation`]
#[async_trait]
pub trait BatchExecutor: Send + Sync {
    type Record: KeyedRecord + Send;

    /// Fetch the primary key of every row in `relation`, in relation order.
    /// Entries are `None` where the key could not be read.
    async fn pluck_keys(&self, relation: &Relation) -> Result<Vec<Option<BatchKey>>>;

    /// Materialize every row in `relation`, in relation order
    async fn load_records(&self, relation: &Relation) -> Result<Vec<Self::Record>>;

    /// Run a bulk UPDATE over `relation`, returning the affected row count
    async fn update_all(&self, relation: &Relation, assignments: &[Assignment]) -> Result<u64>;

    /// Run a bulk DELETE over `relation`, returning the affected row count
    async fn delete_all(&self, relation: &Relation) -> Result<u64>;
}
