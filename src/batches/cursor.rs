//! # Batch Cursor
//!
//! The keyset pagination loop. A cursor owns the state of exactly one pass;
//! starting another pass means building another cursor.

use super::Page;
use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::executor::{BatchExecutor, KeyedRecord};
use crate::query_builder::{BatchKey, Relation};
use futures::stream::{self, Stream};
use tracing::{debug, warn};

/// Mutable state of a single pass
#[derive(Debug, Default)]
struct CursorState {
    /// Exclusive lower bound for the next fetch: the last key already yielded
    current_lower_bound: Option<BatchKey>,
    pages_fetched: usize,
    finished: bool,
}

/// Pull-based iterator over the pages of one pass.
///
/// Construction strips the caller's order and limit, imposes ascending
/// primary-key order with `LIMIT batch_size`, and applies the inclusive
/// `begin_at`/`end_at` window. Each [`next_page`](Self::next_page) call then
/// fetches the keys above the high-water mark. Between calls the cursor does
/// no work, so consumers may pause or stop at any point.
///
/// Pages are consistent per statement only. Rows inserted below the
/// high-water mark after it has passed are not seen; rows deleted before the
/// mark reaches them are skipped. Rows deleted behind the mark do not shift
/// later pages.
pub struct BatchCursor<'e, E: BatchExecutor + ?Sized> {
    executor: &'e E,
    /// Caller filters with order and limit removed; pages are derived from it
    page_base: Relation,
    /// Ordered, limited, bounded relation every fetch narrows further
    window: Relation,
    config: BatchConfig,
    state: CursorState,
}

impl<'e, E> BatchCursor<'e, E>
where
    E: BatchExecutor + ?Sized,
{
    /// Start a new pass over `relation`
    pub fn new(executor: &'e E, relation: &Relation, config: BatchConfig) -> Result<Self> {
        config.validate()?;

        if relation.has_order() || relation.has_limit() {
            warn!(
                table = relation.table(),
                "Scoped order and limit are ignored, it's forced to be batch order and batch size"
            );
        }

        let page_base = relation.clone().unordered().unlimited();
        let window = apply_bounds(
            page_base
                .clone()
                .reorder(relation.batch_order())
                .limit(config.batch_size),
            &config,
        );

        Ok(Self {
            executor,
            page_base,
            window,
            config,
            state: CursorState::default(),
        })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// The ordered, limited and bounded relation pages are fetched from
    pub fn window(&self) -> &Relation {
        &self.window
    }

    /// Largest key yielded so far in this pass
    pub fn high_water_mark(&self) -> Option<&BatchKey> {
        self.state.current_lower_bound.as_ref()
    }

    pub fn pages_fetched(&self) -> usize {
        self.state.pages_fetched
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }

    /// Relation for the next fetch: the window above the high-water mark
    fn next_scope(&self) -> Relation {
        match &self.state.current_lower_bound {
            Some(key) => self
                .window
                .clone()
                .where_gt(&self.window.qualified_primary_key(), key.to_json()),
            None => self.window.clone(),
        }
    }

    /// Fetch the next page, or `None` once the pass is exhausted.
    ///
    /// Storage errors propagate unchanged and leave the cursor where it was.
    pub async fn next_page(&mut self) -> Result<Option<Page<E::Record>>> {
        if self.state.finished {
            return Ok(None);
        }

        let scope = self.next_scope();
        let primary_key = self.window.primary_key_column();

        let (keys, records) = if self.config.load {
            let records = self.executor.load_records(&scope).await?;
            let keys: Vec<Option<BatchKey>> = records
                .iter()
                .map(|record| record.key_value(primary_key))
                .collect();
            (keys, Some(records))
        } else {
            (self.executor.pluck_keys(&scope).await?, None)
        };

        if keys.is_empty() {
            debug!(
                table = self.window.table(),
                pages = self.state.pages_fetched,
                "Batch pass exhausted"
            );
            self.state.finished = true;
            return Ok(None);
        }

        let keys: Vec<BatchKey> = keys
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BatchError::primary_key_not_included(primary_key))?;
        let last_key = keys
            .last()
            .cloned()
            .ok_or_else(|| BatchError::primary_key_not_included(primary_key))?;

        let index = self.state.pages_fetched;
        let relation = self
            .page_base
            .clone()
            .where_keys_in(&keys)
            .reorder(self.window.batch_order());

        debug!(
            table = self.window.table(),
            page = index,
            size = keys.len(),
            first_key = %keys[0],
            last_key = %last_key,
            "Fetched batch page"
        );

        if keys.len() < self.config.batch_size {
            self.state.finished = true;
        }
        self.state.current_lower_bound = Some(last_key);
        self.state.pages_fetched += 1;

        Ok(Some(Page::new(index, relation, keys, records)))
    }

    /// The remainder of this pass as a stream of pages
    pub fn into_stream(self) -> impl Stream<Item = Result<Page<E::Record>>> + 'e
    where
        E::Record: 'e,
    {
        stream::try_unfold(self, |mut cursor| async move {
            let page = cursor.next_page().await?;
            Ok(page.map(|page| (page, cursor)))
        })
    }
}

/// Apply the inclusive `begin_at`/`end_at` window
fn apply_bounds(relation: Relation, config: &BatchConfig) -> Relation {
    let column = relation.qualified_primary_key();
    let relation = match &config.begin_at {
        Some(key) => relation.where_gteq(&column, key.to_json()),
        None => relation,
    };
    match &config.end_at {
        Some(key) => relation.where_lteq(&column, key.to_json()),
        None => relation,
    }
}
