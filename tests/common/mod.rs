//! # Test Utilities
//!
//! Seeded in-memory tables and page collection helpers shared by the
//! integration tests.

#![allow(dead_code, reason = "Each test binary uses a different subset of helpers")]

use futures::TryStreamExt;
use in_batches::{BatchConfig, BatchKey, BatchEnumerator, MemoryStore, Relation, Result};
use serde_json::json;

/// The three-user fixture: ids 1, 2, 3 with money 100, 200, 0
pub fn seeded_users() -> MemoryStore {
    let store = MemoryStore::new("users");
    store
        .seed(vec![
            json!({"id": 1, "name": "alice", "money": 100}),
            json!({"id": 2, "name": "bob", "money": 200}),
            json!({"id": 3, "name": "carol", "money": 0}),
        ])
        .expect("fixture rows are valid");
    store
}

/// A `users` table holding exactly the given ids, with money = id * 10
pub fn users_with_ids<I>(ids: I) -> MemoryStore
where
    I: IntoIterator<Item = i64>,
{
    let store = MemoryStore::new("users");
    store
        .seed(ids.into_iter().map(|id| json!({"id": id, "money": id * 10})))
        .expect("fixture rows are valid");
    store
}

pub fn users() -> Relation {
    Relation::new("users")
}

pub fn keys(ids: &[i64]) -> Vec<BatchKey> {
    ids.iter().copied().map(BatchKey::Integer).collect()
}

/// Run one full pass and return each page's key set
pub async fn page_keys(
    store: &MemoryStore,
    relation: &Relation,
    config: BatchConfig,
) -> Result<Vec<Vec<BatchKey>>> {
    BatchEnumerator::new(relation.clone(), config)?
        .pages(store)?
        .map_ok(|page| page.keys().to_vec())
        .try_collect()
        .await
}
