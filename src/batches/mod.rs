//! # Keyset Batching
//!
//! Ordered, resumable, bounded-memory iteration over a filtered relation.
//!
//! A pass slices the relation into successive, non-overlapping pages of at
//! most `batch_size` rows, ascending by primary key. Each fetch is an
//! independent range scan above the last key already yielded (the
//! high-water mark), so no row offsets are tracked and no page is re-read.
//!
//! - [`BatchCursor`] - one pass, pulled page by page or as a stream
//! - [`Page`] - the page-scoped relation, its keys, and optional records
//! - [`BatchEnumerator`] - reusable wrapper running a fresh pass per operation
//! - [`Batchable`] - `in_batches` for anything that can become a [`Relation`]
//!
//! ```rust
//! use futures::TryStreamExt;
//! use in_batches::{BatchConfig, Batchable, MemoryStore, Relation};
//! use serde_json::json;
//!
//! # async fn example() -> in_batches::Result<()> {
//! let store = MemoryStore::new("users");
//! store.seed((1..=3).map(|id| json!({"id": id})))?;
//!
//! let pages: Vec<_> = Relation::new("users")
//!     .in_batches(BatchConfig::default().of(2))?
//!     .pages(&store)?
//!     .try_collect()
//!     .await?;
//! assert_eq!(pages.len(), 2);
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod enumerator;
pub mod page;

pub use cursor::BatchCursor;
pub use enumerator::BatchEnumerator;
pub use page::Page;

use crate::config::BatchConfig;
use crate::error::Result;
use crate::query_builder::Relation;

/// Query types that can be iterated in keyset batches
pub trait Batchable {
    fn in_batches(&self, config: BatchConfig) -> Result<BatchEnumerator>;
}

impl Batchable for Relation {
    fn in_batches(&self, config: BatchConfig) -> Result<BatchEnumerator> {
        BatchEnumerator::new(self.clone(), config)
    }
}

/// Batch `relation` with `config`; fails fast on an invalid configuration
pub fn in_batches(relation: &Relation, config: BatchConfig) -> Result<BatchEnumerator> {
    relation.in_batches(config)
}
