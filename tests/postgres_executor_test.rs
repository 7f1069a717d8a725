//! Tests for batching against PostgreSQL

use futures::TryStreamExt;
use in_batches::{
    Assignment, BatchConfig, BatchError, BatchExecutor, BatchKey, Batchable, KeyedRecord,
    Relation, Result,
};
use sqlx::{PgPool, Row};

async fn create_users(pool: &PgPool) -> Result<()> {
    sqlx::query("CREATE TABLE users (id BIGINT PRIMARY KEY, name TEXT NOT NULL, money INTEGER NOT NULL)")
        .execute(pool)
        .await?;
    sqlx::query("INSERT INTO users (id, name, money) VALUES (1, 'alice', 100), (2, 'bob', 200), (3, 'carol', 0)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn money_by_id(pool: &PgPool) -> Result<Vec<(i64, i32)>> {
    let rows = sqlx::query("SELECT id, money FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|row| (row.get::<i64, _>("id"), row.get::<i32, _>("money")))
        .collect())
}

async fn page_keys(pool: &PgPool, relation: &Relation, config: BatchConfig) -> Result<Vec<Vec<BatchKey>>> {
    relation
        .in_batches(config)?
        .pages(pool)?
        .map_ok(|page| page.keys().to_vec())
        .try_collect()
        .await
}

#[sqlx::test]
async fn test_update_all_single_page(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;

    let updated = Relation::new("users")
        .in_batches(BatchConfig::default())?
        .update_all(&pool, &[Assignment::increment("money", 1)])
        .await?;

    assert_eq!(updated, 3);
    assert_eq!(money_by_id(&pool).await?, vec![(1, 101), (2, 201), (3, 1)]);
    Ok(())
}

#[sqlx::test]
async fn test_update_all_with_small_batches(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;
    let relation = Relation::new("users");
    let config = BatchConfig::default().of(2);

    let mut cursor = relation.in_batches(config.clone())?.cursor(&pool)?;
    let mut per_page = Vec::new();
    while let Some(page) = cursor.next_page().await? {
        per_page.push(page.update_all(&pool, &[Assignment::increment("money", 1)]).await?);
    }
    assert_eq!(per_page, vec![2, 1]);

    let total = relation
        .in_batches(config)?
        .update_all(&pool, &[Assignment::increment("money", 1)])
        .await?;
    assert_eq!(total, 3);
    assert_eq!(money_by_id(&pool).await?, vec![(1, 102), (2, 202), (3, 2)]);
    Ok(())
}

#[sqlx::test]
async fn test_delete_all_counts_deleted_rows(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;

    let deleted = Relation::new("users")
        .where_raw("money > 0")
        .in_batches(BatchConfig::default().of(1))?
        .delete_all(&pool)
        .await?;

    assert_eq!(deleted, 2);
    assert_eq!(money_by_id(&pool).await?, vec![(3, 0)]);
    Ok(())
}

#[sqlx::test]
async fn test_raw_or_predicate_respects_window(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;

    let deleted = Relation::new("users")
        .where_raw("money > 150 OR name = 'carol'")
        .in_batches(BatchConfig::default().of(1).end_at(2))?
        .delete_all(&pool)
        .await?;

    // carol matches the predicate but lies outside the window
    assert_eq!(deleted, 1);
    assert_eq!(money_by_id(&pool).await?, vec![(1, 100), (3, 0)]);
    Ok(())
}

#[sqlx::test]
async fn test_bigint_keys(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;

    let pages = page_keys(&pool, &Relation::new("users"), BatchConfig::default().of(2)).await?;
    assert_eq!(
        pages,
        vec![
            vec![BatchKey::Integer(1), BatchKey::Integer(2)],
            vec![BatchKey::Integer(3)]
        ]
    );
    Ok(())
}

#[sqlx::test]
async fn test_integer_keys(pool: PgPool) -> Result<()> {
    sqlx::query("CREATE TABLE posts (id SERIAL PRIMARY KEY, title TEXT NOT NULL)")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO posts (title) VALUES ('a'), ('b'), ('c')")
        .execute(&pool)
        .await?;

    let pages = page_keys(&pool, &Relation::new("posts"), BatchConfig::default().begin_at(2)).await?;
    assert_eq!(pages, vec![vec![BatchKey::Integer(2), BatchKey::Integer(3)]]);
    Ok(())
}

#[sqlx::test]
async fn test_text_keys(pool: PgPool) -> Result<()> {
    sqlx::query("CREATE TABLE products (sku TEXT PRIMARY KEY, price INTEGER NOT NULL)")
        .execute(&pool)
        .await?;
    sqlx::query("INSERT INTO products (sku, price) VALUES ('b-2', 20), ('a-1', 10), ('c-3', 30)")
        .execute(&pool)
        .await?;

    let relation = Relation::new("products").primary_key("sku");
    let pages = page_keys(&pool, &relation, BatchConfig::default().of(2).load(true)).await?;
    assert_eq!(
        pages,
        vec![
            vec![BatchKey::from("a-1"), BatchKey::from("b-2")],
            vec![BatchKey::from("c-3")]
        ]
    );
    Ok(())
}

#[sqlx::test]
async fn test_loaded_records_carry_their_keys(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;

    let mut cursor = Relation::new("users")
        .in_batches(BatchConfig::default().of(2).load(true))?
        .cursor(&pool)?;
    let page = cursor.next_page().await?.unwrap();

    let records = page.loaded_records().unwrap();
    let keys: Vec<Option<BatchKey>> = records.iter().map(|row| row.key_value("id")).collect();
    assert_eq!(keys, vec![Some(BatchKey::Integer(1)), Some(BatchKey::Integer(2))]);
    assert_eq!(records[1].get::<String, _>("name"), "bob");
    Ok(())
}

#[sqlx::test]
async fn test_projection_without_primary_key_fails(pool: PgPool) -> Result<()> {
    create_users(&pool).await?;

    let error = Relation::new("users")
        .select(&["name", "money"])
        .in_batches(BatchConfig::default().load(true))?
        .each(&pool, |_page| async { Ok(()) })
        .await
        .unwrap_err();

    assert!(matches!(error, BatchError::Configuration { .. }));
    assert_eq!(money_by_id(&pool).await?.len(), 3);
    Ok(())
}

#[sqlx::test]
async fn test_database_errors_propagate(pool: PgPool) -> Result<()> {
    let relation = Relation::new("missing");

    let error = pool.pluck_keys(&relation).await.unwrap_err();
    assert!(matches!(error, BatchError::Database(_)));
    assert!(!error.is_configuration_error());

    let error = relation
        .in_batches(BatchConfig::default())?
        .delete_all(&pool)
        .await
        .unwrap_err();
    assert!(matches!(error, BatchError::Database(_)));
    Ok(())
}
