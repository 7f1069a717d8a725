//! # PostgreSQL Executor
//!
//! [`BatchExecutor`] for a SQLx connection pool. Statements are rendered by
//! [`Relation`] and executed as-is; each page is its own statement with no
//! surrounding transaction.

use super::{BatchExecutor, KeyedRecord};
use crate::error::Result;
use crate::query_builder::{Assignment, BatchKey, Relation};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{ColumnIndex, PgPool, Row};
use tracing::debug;

/// Decode a primary key column as BIGINT, INTEGER or TEXT, in that order
fn decode_key<I>(row: &PgRow, index: I) -> Option<BatchKey>
where
    I: ColumnIndex<PgRow> + Copy,
{
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(BatchKey::Integer);
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(index) {
        return value.map(BatchKey::from);
    }
    row.try_get::<Option<String>, _>(index)
        .ok()
        .flatten()
        .map(BatchKey::Text)
}

impl KeyedRecord for PgRow {
    fn key_value(&self, primary_key: &str) -> Option<BatchKey> {
        decode_key(self, primary_key)
    }
}

#[async_trait]
impl BatchExecutor for PgPool {
    type Record = PgRow;

    async fn pluck_keys(&self, relation: &Relation) -> Result<Vec<Option<BatchKey>>> {
        let sql = relation.build_pluck_sql(&relation.qualified_primary_key());
        debug!(sql = %sql, "Plucking batch keys");
        let rows = sqlx::query(&sql).fetch_all(self).await?;
        Ok(rows.iter().map(|row| decode_key(row, 0usize)).collect())
    }

    async fn load_records(&self, relation: &Relation) -> Result<Vec<PgRow>> {
        let sql = relation.build_sql();
        debug!(sql = %sql, "Loading batch records");
        Ok(sqlx::query(&sql).fetch_all(self).await?)
    }

    async fn update_all(&self, relation: &Relation, assignments: &[Assignment]) -> Result<u64> {
        let sql = relation.build_update_sql(assignments);
        debug!(sql = %sql, "Updating batch");
        let result = sqlx::query(&sql).execute(self).await?;
        Ok(result.rows_affected())
    }

    async fn delete_all(&self, relation: &Relation) -> Result<u64> {
        let sql = relation.build_delete_sql();
        debug!(sql = %sql, "Deleting batch");
        let result = sqlx::query(&sql).execute(self).await?;
        Ok(result.rows_affected())
    }
}
