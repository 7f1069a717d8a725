//! # Query Builder System
//!
//! Composable single-table queries with Rails-style chaining.
//!
//! ## Overview
//!
//! A [`Relation`] is a value: every builder method consumes it and returns a
//! derived relation, so batching can narrow a caller's query (reorder, limit,
//! bound predicates) without ever mutating it.
//!
//! ## Key Components
//!
//! - [`relation`] - The relation value and its SQL renderers
//! - [`conditions`] - WHERE clause building
//! - [`order`] - ORDER BY terms
//! - [`assignment`] - SET targets for bulk updates
//! - [`key`] - Orderable primary-key values
//!
//! ## Example Usage
//!
//! ```rust
//! use in_batches::query_builder::Relation;
//!
//! let query = Relation::new("users")
//!     .where_raw("age > 21")
//!     .order_desc("created_at")
//!     .limit(100);
//! assert!(query.build_sql().ends_with("ORDER BY created_at DESC LIMIT 100"));
//! ```

pub mod assignment;
pub mod conditions;
pub mod key;
pub mod order;
pub mod relation;

pub use assignment::Assignment;
pub use conditions::{Condition, LogicalOperator, WhereClause};
pub use key::BatchKey;
pub use order::{Order, OrderDirection};
pub use relation::{Entity, Relation};
