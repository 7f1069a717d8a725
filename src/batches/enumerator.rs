use super::{BatchCursor, Page};
use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::executor::BatchExecutor;
use crate::logging::log_batch_operation;
use crate::query_builder::{Assignment, Relation};
use futures::Stream;
use std::future::Future;

/// A reusable, multi-pass view of a relation in batches.
///
/// The enumerator holds only the relation and its configuration. Every
/// operation starts a fresh [`BatchCursor`], so enumerators can be cloned,
/// stored and consumed any number of times.
///
/// ```rust
/// use in_batches::{BatchConfig, Batchable, MemoryStore, Relation};
/// use serde_json::json;
///
/// # async fn example() -> in_batches::Result<()> {
/// let store = MemoryStore::new("users");
/// store.seed((1..=5).map(|id| json!({"id": id, "money": 0})))?;
///
/// let deleted = Relation::new("users")
///     .in_batches(BatchConfig::default().of(2))?
///     .delete_all(&store)
///     .await?;
/// assert_eq!(deleted, 5);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEnumerator {
    relation: Relation,
    config: BatchConfig,
}

impl BatchEnumerator {
    pub fn new(relation: Relation, config: BatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { relation, config })
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Start an independent pass
    pub fn cursor<'e, E>(&self, executor: &'e E) -> Result<BatchCursor<'e, E>>
    where
        E: BatchExecutor + ?Sized,
    {
        BatchCursor::new(executor, &self.relation, self.config.clone())
    }

    /// Start an independent pass as a stream of pages.
    ///
    /// Standard stream combinators (`enumerate`, `map_ok`, `try_filter`,
    /// `take`) layer on top of this.
    pub fn pages<'e, E>(
        &self,
        executor: &'e E,
    ) -> Result<impl Stream<Item = Result<Page<E::Record>>> + 'e>
    where
        E: BatchExecutor + ?Sized,
        E::Record: 'e,
    {
        Ok(self.cursor(executor)?.into_stream())
    }

    /// Invoke `handler` once per page, returning the number of pages
    pub async fn each<E, F, Fut>(&self, executor: &E, mut handler: F) -> Result<usize>
    where
        E: BatchExecutor + ?Sized,
        F: FnMut(Page<E::Record>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut cursor = self.cursor(executor)?;
        while let Some(page) = cursor.next_page().await? {
            handler(page).await?;
        }
        Ok(cursor.pages_fetched())
    }

    /// Invoke `handler` once per page with the zero-based page index
    pub async fn each_with_index<E, F, Fut>(&self, executor: &E, mut handler: F) -> Result<usize>
    where
        E: BatchExecutor + ?Sized,
        F: FnMut(Page<E::Record>, usize) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut cursor = self.cursor(executor)?;
        while let Some(page) = cursor.next_page().await? {
            let index = page.index();
            handler(page, index).await?;
        }
        Ok(cursor.pages_fetched())
    }

    /// Bulk UPDATE page by page, returning the total affected rows.
    ///
    /// Key sets are disjoint across pages, so no row is updated twice.
    pub async fn update_all<E>(&self, executor: &E, assignments: &[Assignment]) -> Result<u64>
    where
        E: BatchExecutor + ?Sized,
    {
        if assignments.is_empty() {
            return Err(BatchError::invalid_configuration(
                "update_all requires at least one assignment",
            ));
        }

        let mut cursor = self.cursor(executor)?;
        let mut affected = 0;
        while let Some(page) = cursor.next_page().await? {
            affected += page.update_all(executor, assignments).await?;
        }

        log_batch_operation(
            "update_all",
            self.relation.table(),
            cursor.pages_fetched(),
            affected,
        );
        Ok(affected)
    }

    /// Bulk DELETE page by page, returning the total affected rows
    pub async fn delete_all<E>(&self, executor: &E) -> Result<u64>
    where
        E: BatchExecutor + ?Sized,
    {
        let mut cursor = self.cursor(executor)?;
        let mut affected = 0;
        while let Some(page) = cursor.next_page().await? {
            affected += page.delete_all(executor).await?;
        }

        log_batch_operation(
            "delete_all",
            self.relation.table(),
            cursor.pages_fetched(),
            affected,
        );
        Ok(affected)
    }

    /// Invoke `handler` once per record in ascending primary key order,
    /// returning the number of records visited.
    ///
    /// Pages fetched without `load` are materialized one at a time, so at most
    /// one page of records is held in memory.
    pub async fn each_record<E, F, Fut>(&self, executor: &E, mut handler: F) -> Result<usize>
    where
        E: BatchExecutor + ?Sized,
        F: FnMut(E::Record) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut cursor = self.cursor(executor)?;
        let mut visited = 0;
        while let Some(page) = cursor.next_page().await? {
            for record in page.records(executor).await? {
                handler(record).await?;
                visited += 1;
            }
        }
        Ok(visited)
    }
}
