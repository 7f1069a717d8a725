use crate::error::{BatchError, Result};
use crate::executor::BatchExecutor;
use crate::query_builder::{Assignment, BatchKey, Relation};

/// One bounded slice of a batch pass.
///
/// The page is scoped by the concrete key set fetched for it: its relation is
/// the caller's filtered query restricted to `primary_key IN (keys)` and
/// ordered ascending by primary key. When the pass runs with `load`, the
/// records fetched alongside the keys travel with the page.
#[derive(Debug, Clone)]
pub struct Page<R> {
    index: usize,
    relation: Relation,
    keys: Vec<BatchKey>,
    records: Option<Vec<R>>,
}

impl<R> Page<R> {
    pub(crate) fn new(
        index: usize,
        relation: Relation,
        keys: Vec<BatchKey>,
        records: Option<Vec<R>>,
    ) -> Self {
        Self {
            index,
            relation,
            keys,
            records,
        }
    }

    /// Zero-based position of this page within its pass
    pub fn index(&self) -> usize {
        self.index
    }

    /// The page-scoped relation
    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    /// An owned copy of the page-scoped relation, for further refinement
    pub fn scope(&self) -> Relation {
        self.relation.clone()
    }

    /// Primary keys of the page, ascending
    pub fn keys(&self) -> &[BatchKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn first_key(&self) -> Option<&BatchKey> {
        self.keys.first()
    }

    /// The high-water mark after this page
    pub fn last_key(&self) -> Option<&BatchKey> {
        self.keys.last()
    }

    /// Whether records were materialized while the page was fetched
    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    /// Records materialized while fetching, if the pass ran with `load`
    pub fn loaded_records(&self) -> Option<&[R]> {
        self.records.as_deref()
    }

    /// The page's records, fetching them only when they were not preloaded
    pub async fn records<E>(self, executor: &E) -> Result<Vec<R>>
    where
        E: BatchExecutor<Record = R> + ?Sized,
    {
        match self.records {
            Some(records) => Ok(records),
            None => executor.load_records(&self.relation).await,
        }
    }

    /// Bulk UPDATE restricted to this page's key set
    pub async fn update_all<E>(&self, executor: &E, assignments: &[Assignment]) -> Result<u64>
    where
        E: BatchExecutor + ?Sized,
    {
        if assignments.is_empty() {
            return Err(BatchError::invalid_configuration(
                "update_all requires at least one assignment",
            ));
        }
        executor.update_all(&self.relation, assignments).await
    }

    /// Bulk DELETE restricted to this page's key set
    pub async fn delete_all<E>(&self, executor: &E) -> Result<u64>
    where
        E: BatchExecutor + ?Sized,
    {
        executor.delete_all(&self.relation).await
    }
}
