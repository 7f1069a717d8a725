#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # In Batches
//!
//! Ordered, resumable, bounded-memory iteration over large relational result
//! sets using keyset pagination.
//!
//! ## Overview
//!
//! Loading a large query result at once is infeasible, and `OFFSET`
//! pagination slows down and drifts under concurrent writes. This crate
//! slices a filtered query into successive primary-key ranges instead: each
//! page is fetched with `primary_key > last_seen ORDER BY primary_key LIMIT n`,
//! so every fetch is an independent, restartable range scan and memory stays
//! bounded by the batch size.
//!
//! ## Module Organization
//!
//! - [`query_builder`] - Composable single-table relations and SQL rendering
//! - [`batches`] - The batch cursor, pages and the reusable enumerator
//! - [`executor`] - Storage seam with PostgreSQL and in-memory executors
//! - [`config`] - Per-pass configuration and process-wide settings
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use in_batches::{Assignment, BatchConfig, Batchable, Relation};
//! use sqlx::PgPool;
//!
//! # async fn example(pool: &PgPool) -> in_batches::Result<()> {
//! // Give every adult a raise, 2000 rows per UPDATE statement
//! let updated = Relation::new("people")
//!     .where_raw("age > 21")
//!     .in_batches(BatchConfig::default().of(2000))?
//!     .update_all(pool, &[Assignment::increment("salary", 100)])
//!     .await?;
//! println!("updated {updated} rows");
//! # Ok(())
//! # }
//! ```
//!
//! ## Partitioning Work
//!
//! `begin_at` and `end_at` are inclusive primary key bounds, so independent
//! workers can split a table deterministically: worker 1 takes ids
//! `0..=9_999`, worker 2 takes `10_000..`.
//!
//! ## Testing
//!
//! ```bash
//! cargo test    # Unit and integration tests against the in-memory executor
//! ```

pub mod batches;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod query_builder;

pub use batches::{in_batches, BatchCursor, BatchEnumerator, Batchable, Page};
pub use crate::config::{BatchConfig, BatchSettings, DEFAULT_BATCH_SIZE};
pub use error::{BatchError, Result};
pub use executor::{BatchExecutor, KeyedRecord, MemoryRow, MemoryStore};
pub use query_builder::{
    Assignment, BatchKey, Condition, Entity, Order, OrderDirection, Relation, WhereClause,
};
