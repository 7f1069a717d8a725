//! Tests for the keyset pagination loop

mod common;

use common::*;
use in_batches::{BatchConfig, BatchCursor, BatchError, BatchKey, MemoryStore, Relation};
use serde_json::json;

#[tokio::test]
async fn test_pages_follow_primary_key_order() {
    let store = users_with_ids([5, 1, 4, 2, 3]);
    let pages = page_keys(&store, &users(), BatchConfig::default().of(2))
        .await
        .unwrap();

    assert_eq!(pages, vec![keys(&[1, 2]), keys(&[3, 4]), keys(&[5])]);
}

#[tokio::test]
async fn test_empty_table_yields_no_pages() {
    let store = MemoryStore::new("users");
    let pages = page_keys(&store, &users(), BatchConfig::default())
        .await
        .unwrap();

    assert!(pages.is_empty());
    assert_eq!(store.statement_count(), 1);
}

#[tokio::test]
async fn test_window_without_rows_yields_no_pages() {
    let store = users_with_ids([5, 25]);
    let config = BatchConfig::default().begin_at(10).end_at(20);
    let pages = page_keys(&store, &users(), config).await.unwrap();

    assert!(pages.is_empty());
    assert_eq!(store.statement_count(), 1);
}

#[tokio::test]
async fn test_reversed_window_yields_no_pages() {
    let store = users_with_ids(1..=30);
    let config = BatchConfig::default().begin_at(20).end_at(10);
    let pages = page_keys(&store, &users(), config).await.unwrap();

    assert!(pages.is_empty());
}

#[tokio::test]
async fn test_bounds_are_inclusive() {
    let store = users_with_ids(1..=30);
    let config = BatchConfig::default().of(4).begin_at(10).end_at(20);
    let pages = page_keys(&store, &users(), config).await.unwrap();

    assert_eq!(
        pages,
        vec![
            keys(&[10, 11, 12, 13]),
            keys(&[14, 15, 16, 17]),
            keys(&[18, 19, 20]),
        ]
    );
}

#[tokio::test]
async fn test_full_final_page_needs_one_empty_fetch() {
    let store = users_with_ids([1, 2]);
    let pages = page_keys(&store, &users(), BatchConfig::default().of(2))
        .await
        .unwrap();

    assert_eq!(pages, vec![keys(&[1, 2])]);
    assert_eq!(store.statement_count(), 2);
}

#[tokio::test]
async fn test_short_page_ends_pass_without_another_fetch() {
    let store = users_with_ids([1]);
    let pages = page_keys(&store, &users(), BatchConfig::default().of(2))
        .await
        .unwrap();

    assert_eq!(pages, vec![keys(&[1])]);
    assert_eq!(store.statement_count(), 1);
}

#[tokio::test]
async fn test_caller_filters_are_preserved() {
    let store = seeded_users();
    let relation = users().where_gteq("money", json!(100));
    let pages = page_keys(&store, &relation, BatchConfig::default().of(1))
        .await
        .unwrap();

    assert_eq!(pages, vec![keys(&[1]), keys(&[2])]);
    assert_eq!(
        store.statements().last().unwrap(),
        "SELECT users.id FROM users WHERE money >= 100 AND users.id > 2 ORDER BY users.id ASC LIMIT 1"
    );
}

#[tokio::test]
async fn test_caller_order_and_limit_are_overridden() {
    let store = seeded_users();
    let relation = users().order_desc("money").limit(1);
    let pages = page_keys(&store, &relation, BatchConfig::default().of(2))
        .await
        .unwrap();

    assert_eq!(pages, vec![keys(&[1, 2]), keys(&[3])]);
    // The caller's relation is never mutated
    assert!(relation.has_order());
    assert_eq!(relation.limit_value(), Some(1));
}

#[tokio::test]
async fn test_load_attaches_records_in_key_order() {
    let store = seeded_users();
    let config = BatchConfig::default().of(2).load(true);
    let mut cursor = BatchCursor::new(&store, &users(), config).unwrap();

    let page = cursor.next_page().await.unwrap().unwrap();
    assert!(page.is_loaded());
    let money: Vec<_> = page
        .loaded_records()
        .unwrap()
        .iter()
        .map(|record| record["money"].clone())
        .collect();
    assert_eq!(money, vec![json!(100), json!(200)]);

    // Loading fetches keys and records in one statement
    assert_eq!(store.statement_count(), 1);
    assert_eq!(store.statements()[0], "SELECT * FROM users ORDER BY users.id ASC LIMIT 2");

    // Consuming preloaded records issues no further statements
    let records = page.records(&store).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(store.statement_count(), 1);
}

#[tokio::test]
async fn test_projection_without_primary_key_fails_fast() {
    let store = seeded_users();
    let relation = users().select(&["name", "money"]);
    let config = BatchConfig::default().load(true);
    let mut cursor = BatchCursor::new(&store, &relation, config).unwrap();

    let error = cursor.next_page().await.unwrap_err();
    assert!(matches!(error, BatchError::Configuration { .. }));
    assert!(error.to_string().contains("primary key `id` not included"));
}

#[tokio::test]
async fn test_projection_without_primary_key_is_fine_when_plucking() {
    let store = seeded_users();
    let relation = users().select(&["name"]);
    let pages = page_keys(&store, &relation, BatchConfig::default().of(2))
        .await
        .unwrap();

    assert_eq!(pages, vec![keys(&[1, 2]), keys(&[3])]);
}

#[tokio::test]
async fn test_resuming_after_last_seen_key_matches_continuous_pass() {
    let store = users_with_ids(1..=10);
    let config = BatchConfig::default().of(3);
    let continuous = page_keys(&store, &users(), config.clone()).await.unwrap();

    let mut cursor = BatchCursor::new(&store, &users(), config.clone()).unwrap();
    cursor.next_page().await.unwrap().unwrap();
    let interrupted = cursor.next_page().await.unwrap().unwrap();
    let last_seen = interrupted.last_key().unwrap().clone();
    assert_eq!(last_seen, BatchKey::Integer(6));
    drop(cursor);

    let resumed_config = config.begin_at(last_seen.successor().unwrap());
    let resumed = page_keys(&store, &users(), resumed_config).await.unwrap();

    assert_eq!(resumed, continuous[2..].to_vec());
}

#[tokio::test]
async fn test_partitioned_workers_cover_table_once() {
    let store = users_with_ids(1..=25);
    let config = BatchConfig::default().of(4);

    let first = page_keys(&store, &users(), config.clone().end_at(12))
        .await
        .unwrap();
    let second = page_keys(&store, &users(), config.begin_at(13))
        .await
        .unwrap();

    let covered: Vec<BatchKey> = first.into_iter().chain(second).flatten().collect();
    assert_eq!(covered, keys(&(1..=25).collect::<Vec<_>>()));
}

#[tokio::test]
async fn test_concurrent_writes_follow_keyset_semantics() {
    let store = users_with_ids(1..=6);
    let mut cursor = BatchCursor::new(&store, &users(), BatchConfig::default().of(2)).unwrap();

    let first = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(first.keys(), keys(&[1, 2]).as_slice());

    // Behind the mark: deleting does not shift later pages, inserting is never seen.
    store.remove(&BatchKey::Integer(1));
    store.insert(json!({"id": 0, "money": 0})).unwrap();
    // Ahead of the mark: deletes are skipped, inserts are picked up.
    store.remove(&BatchKey::Integer(4));
    store.insert(json!({"id": 7, "money": 70})).unwrap();

    let mut rest = Vec::new();
    while let Some(page) = cursor.next_page().await.unwrap() {
        rest.push(page.keys().to_vec());
    }
    assert_eq!(rest, vec![keys(&[3, 5]), keys(&[6, 7])]);
}

#[tokio::test]
async fn test_storage_failure_propagates_and_cursor_can_continue() {
    let store = seeded_users();
    let mut cursor = BatchCursor::new(&store, &users(), BatchConfig::default().of(2)).unwrap();
    cursor.next_page().await.unwrap().unwrap();

    store.fail_next_statement("could not serialize access");
    let error = cursor.next_page().await.unwrap_err();
    assert!(matches!(error, BatchError::Storage { .. }));
    assert_eq!(cursor.high_water_mark(), Some(&BatchKey::Integer(2)));

    let page = cursor.next_page().await.unwrap().unwrap();
    assert_eq!(page.keys(), keys(&[3]).as_slice());
}

#[tokio::test]
async fn test_text_primary_keys() {
    let store = MemoryStore::with_primary_key("products", "sku");
    store
        .seed(["c-3", "a-1", "b-2"].map(|sku| json!({"sku": sku})))
        .unwrap();
    let relation = Relation::new("products").primary_key("sku");

    let pages = page_keys(&store, &relation, BatchConfig::default().of(2))
        .await
        .unwrap();
    assert_eq!(
        pages,
        vec![
            vec![BatchKey::from("a-1"), BatchKey::from("b-2")],
            vec![BatchKey::from("c-3")],
        ]
    );
}

#[test]
fn test_zero_batch_size_is_rejected() {
    let store = seeded_users();
    let result = BatchCursor::new(&store, &users(), BatchConfig::default().of(0));
    assert!(matches!(result, Err(BatchError::InvalidConfiguration { .. })));
}
