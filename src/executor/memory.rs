//! # In-Memory Executor
//!
//! A single table of JSON rows that evaluates [`Relation`] values directly
//! instead of parsing SQL. Every statement's rendered SQL is recorded so
//! callers can assert how many statements a batch pass issued.
//!
//! Raw predicates and raw assignments cannot be evaluated and are rejected
//! with [`BatchError::Unsupported`].

use super::{BatchExecutor, KeyedRecord};
use crate::error::{BatchError, Result};
use crate::query_builder::{
    Assignment, BatchKey, Condition, LogicalOperator, OrderDirection, Relation, WhereClause,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::cmp::Ordering;

/// A row of the in-memory table
pub type MemoryRow = serde_json::Map<String, Value>;

impl KeyedRecord for MemoryRow {
    fn key_value(&self, primary_key: &str) -> Option<BatchKey> {
        self.get(primary_key).and_then(BatchKey::from_json)
    }
}

#[derive(Debug)]
pub struct MemoryStore {
    table: String,
    primary_key: String,
    rows: Mutex<Vec<MemoryRow>>,
    statements: Mutex<Vec<String>>,
    pending_failure: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create an empty table keyed by `id`
    pub fn new(table: &str) -> Self {
        Self::with_primary_key(table, "id")
    }

    pub fn with_primary_key(table: &str, primary_key: &str) -> Self {
        Self {
            table: table.to_string(),
            primary_key: primary_key.to_string(),
            rows: Mutex::new(Vec::new()),
            statements: Mutex::new(Vec::new()),
            pending_failure: Mutex::new(None),
        }
    }

    /// Insert a JSON object row. Inserts are not recorded as statements.
    pub fn insert(&self, row: Value) -> Result<()> {
        match row {
            Value::Object(map) => {
                if map.key_value(&self.primary_key).is_none() {
                    return Err(BatchError::storage(
                        "insert",
                        format!("row has no usable `{}` value", self.primary_key),
                    ));
                }
                self.rows.lock().push(map);
                Ok(())
            }
            other => Err(BatchError::storage(
                "insert",
                format!("expected a JSON object row, got {other}"),
            )),
        }
    }

    /// Insert many rows
    pub fn seed<I>(&self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = Value>,
    {
        rows.into_iter().try_for_each(|row| self.insert(row))
    }

    /// Remove the row with the given key, returning whether it existed
    pub fn remove(&self, key: &BatchKey) -> bool {
        let mut rows = self.rows.lock();
        let before = rows.len();
        rows.retain(|row| row.key_value(&self.primary_key).as_ref() != Some(key));
        rows.len() != before
    }

    /// Snapshot of every row, ascending by primary key
    pub fn rows(&self) -> Vec<MemoryRow> {
        let mut rows = self.rows.lock().clone();
        rows.sort_by(|a, b| {
            a.key_value(&self.primary_key)
                .cmp(&b.key_value(&self.primary_key))
        });
        rows
    }

    /// Values of `column`, ascending by primary key
    pub fn column_values(&self, column: &str) -> Vec<Value> {
        self.rows()
            .iter()
            .map(|row| row.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }

    /// SQL of every statement executed so far
    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().clone()
    }

    pub fn statement_count(&self) -> usize {
        self.statements.lock().len()
    }

    pub fn clear_statements(&self) {
        self.statements.lock().clear();
    }

    /// Make the next statement fail with a storage error
    pub fn fail_next_statement(&self, message: &str) {
        *self.pending_failure.lock() = Some(message.to_string());
    }

    fn record_statement(&self, operation: &str, sql: String) -> Result<()> {
        self.statements.lock().push(sql);
        match self.pending_failure.lock().take() {
            Some(message) => Err(BatchError::storage(operation, message)),
            None => Ok(()),
        }
    }

    fn check_table(&self, relation: &Relation) -> Result<()> {
        if relation.table() != self.table {
            return Err(BatchError::storage(
                "query",
                format!("relation \"{}\" does not exist", relation.table()),
            ));
        }
        Ok(())
    }

    /// Rows matching the relation's predicates, ordered and limited
    fn matching_rows(&self, relation: &Relation) -> Result<Vec<MemoryRow>> {
        let rows = self.rows.lock();
        let mut matched = Vec::new();
        for row in rows.iter() {
            if row_matches(row, relation.where_clauses())? {
                matched.push(row.clone());
            }
        }
        drop(rows);

        if relation.has_order() {
            matched.sort_by(|a, b| {
                for order in relation.order_terms() {
                    let column = column_name(&order.field);
                    let ordering = compare_for_sort(
                        a.get(column).unwrap_or(&Value::Null),
                        b.get(column).unwrap_or(&Value::Null),
                    );
                    let ordering = match order.direction {
                        OrderDirection::Asc => ordering,
                        OrderDirection::Desc => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = relation.limit_value() {
            matched.truncate(limit);
        }
        Ok(matched)
    }

    /// Apply `mutate` to every row matching `relation`, returning how many were touched.
    ///
    /// Either every matching row is updated or, on error, none are.
    fn mutate_matching<F>(&self, relation: &Relation, mut mutate: F) -> Result<u64>
    where
        F: FnMut(&mut MemoryRow) -> Result<()>,
    {
        let mut rows = self.rows.lock();
        let mut updated = Vec::new();
        for (position, row) in rows.iter().enumerate() {
            if row_matches(row, relation.where_clauses())? {
                let mut row = row.clone();
                mutate(&mut row)?;
                updated.push((position, row));
            }
        }
        let affected = updated.len() as u64;
        for (position, row) in updated {
            rows[position] = row;
        }
        Ok(affected)
    }
}

#[async_trait]
impl BatchExecutor for MemoryStore {
    type Record = MemoryRow;

    async fn pluck_keys(&self, relation: &Relation) -> Result<Vec<Option<BatchKey>>> {
        self.check_table(relation)?;
        self.record_statement(
            "pluck",
            relation.build_pluck_sql(&relation.qualified_primary_key()),
        )?;
        let rows = self.matching_rows(relation)?;
        Ok(rows
            .iter()
            .map(|row| row.key_value(relation.primary_key_column()))
            .collect())
    }

    async fn load_records(&self, relation: &Relation) -> Result<Vec<MemoryRow>> {
        self.check_table(relation)?;
        self.record_statement("load", relation.build_sql())?;
        let rows = self.matching_rows(relation)?;
        Ok(rows
            .into_iter()
            .map(|row| project(row, relation.select_fields()))
            .collect())
    }

    async fn update_all(&self, relation: &Relation, assignments: &[Assignment]) -> Result<u64> {
        self.check_table(relation)?;
        self.record_statement("update", relation.build_update_sql(assignments))?;
        self.mutate_matching(relation, |row| {
            assignments
                .iter()
                .try_for_each(|assignment| apply_assignment(row, assignment))
        })
    }

    async fn delete_all(&self, relation: &Relation) -> Result<u64> {
        self.check_table(relation)?;
        self.record_statement("delete", relation.build_delete_sql())?;
        let mut rows = self.rows.lock();
        let mut doomed = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            doomed.push(row_matches(row, relation.where_clauses())?);
        }
        let mut verdicts = doomed.iter();
        rows.retain(|_| !verdicts.next().copied().unwrap_or(false));
        Ok(doomed.iter().filter(|matched| **matched).count() as u64)
    }
}

/// Strip any table qualifier: `users.id` -> `id`
fn column_name(field: &str) -> &str {
    field.rsplit('.').next().unwrap_or(field)
}

fn project(row: MemoryRow, fields: &[String]) -> MemoryRow {
    if fields.iter().any(|field| field == "*") {
        return row;
    }
    let columns: Vec<&str> = fields.iter().map(|f| column_name(f)).collect();
    row.into_iter()
        .filter(|(column, _)| columns.contains(&column.as_str()))
        .collect()
}

fn row_matches(row: &MemoryRow, clauses: &[WhereClause]) -> Result<bool> {
    for clause in clauses {
        if !clause_matches(row, clause)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clause_matches(row: &MemoryRow, clause: &WhereClause) -> Result<bool> {
    if clause.conditions.is_empty() {
        return Ok(true);
    }
    let mut results = Vec::with_capacity(clause.conditions.len());
    for condition in &clause.conditions {
        results.push(condition_matches(row, condition)?);
    }
    Ok(match clause.operator {
        LogicalOperator::And => results.iter().all(|matched| *matched),
        LogicalOperator::Or => results.iter().any(|matched| *matched),
    })
}

fn field_value<'r>(row: &'r MemoryRow, field: &str) -> &'r Value {
    row.get(column_name(field)).unwrap_or(&Value::Null)
}

fn condition_matches(row: &MemoryRow, condition: &Condition) -> Result<bool> {
    let matched = match condition {
        Condition::Simple {
            field,
            operator,
            value,
        } => {
            let ordering = compare_values(field_value(row, field), value);
            match operator.as_str() {
                "=" => ordering == Some(Ordering::Equal),
                "!=" | "<>" => matches!(ordering, Some(o) if o != Ordering::Equal),
                ">" => ordering == Some(Ordering::Greater),
                ">=" => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
                "<" => ordering == Some(Ordering::Less),
                "<=" => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
                other => {
                    return Err(BatchError::unsupported(
                        "where",
                        format!("operator `{other}` is not supported in memory"),
                    ))
                }
            }
        }
        Condition::In { field, values } => {
            let current = field_value(row, field);
            values
                .iter()
                .any(|value| compare_values(current, value) == Some(Ordering::Equal))
        }
        Condition::NotIn { field, values } => {
            let current = field_value(row, field);
            !current.is_null()
                && values
                    .iter()
                    .all(|value| compare_values(current, value) != Some(Ordering::Equal))
        }
        Condition::Between { field, start, end } => {
            let current = field_value(row, field);
            matches!(
                compare_values(current, start),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare_values(current, end),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
        Condition::IsNull { field } => field_value(row, field).is_null(),
        Condition::IsNotNull { field } => !field_value(row, field).is_null(),
        Condition::Raw { sql } => {
            return Err(BatchError::unsupported(
                "where",
                format!("raw predicate `{sql}` cannot be evaluated in memory"),
            ))
        }
    };
    Ok(matched)
}

/// SQL-style comparison: `None` when either side is null or the types differ
fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order for sorting; nulls sort last as in PostgreSQL ascending order
fn compare_for_sort(left: &Value, right: &Value) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => compare_values(left, right).unwrap_or(Ordering::Equal),
    }
}

fn apply_assignment(row: &mut MemoryRow, assignment: &Assignment) -> Result<()> {
    match assignment {
        Assignment::Set { column, value } => {
            row.insert(column_name(column).to_string(), value.clone());
        }
        Assignment::Increment { column, by } => {
            let column = column_name(column);
            let current = match row.get(column) {
                Some(Value::Number(n)) => n.as_i64(),
                _ => None,
            };
            let current = current.ok_or_else(|| {
                BatchError::storage("update", format!("column `{column}` is not an integer"))
            })?;
            let next = current.checked_add(*by).ok_or_else(|| {
                BatchError::storage(
                    "update",
                    format!("integer out of range incrementing `{column}` by {by}"),
                )
            })?;
            row.insert(column.to_string(), Value::from(next));
        }
        Assignment::Raw(sql) => {
            return Err(BatchError::unsupported(
                "update",
                format!("raw assignment `{sql}` cannot be evaluated in memory"),
            ))
        }
    }
    Ok(())
}
