use super::{Assignment, BatchKey, Order, WhereClause};

/// A composable, single-table filtered query.
///
/// Builder methods consume `self` and return the derived relation, so the
/// caller's original value is never mutated; batching derives narrower
/// relations from clones.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    table: String,
    primary_key: String,
    select_fields: Vec<String>,
    where_clauses: Vec<WhereClause>,
    order_by: Vec<Order>,
    limit: Option<usize>,
}

impl Relation {
    /// Create a new relation over every row of `table`, keyed by `id`
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            primary_key: "id".to_string(),
            select_fields: vec!["*".to_string()],
            where_clauses: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Set the primary key column
    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    /// Set specific fields to select
    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Add a WHERE clause
    pub fn where_clause(mut self, clause: WhereClause) -> Self {
        self.where_clauses.push(clause);
        self
    }

    /// Add a simple WHERE condition
    pub fn where_eq(self, field: &str, value: serde_json::Value) -> Self {
        self.where_clause(WhereClause::simple(field, "=", value))
    }

    /// Add WHERE IN condition
    pub fn where_in(self, field: &str, values: Vec<serde_json::Value>) -> Self {
        self.where_clause(WhereClause::in_condition(field, values))
    }

    pub fn where_gt(self, field: &str, value: serde_json::Value) -> Self {
        self.where_clause(WhereClause::simple(field, ">", value))
    }

    pub fn where_gteq(self, field: &str, value: serde_json::Value) -> Self {
        self.where_clause(WhereClause::simple(field, ">=", value))
    }

    pub fn where_lteq(self, field: &str, value: serde_json::Value) -> Self {
        self.where_clause(WhereClause::simple(field, "<=", value))
    }

    /// Add a raw SQL predicate
    pub fn where_raw(self, sql: &str) -> Self {
        self.where_clause(WhereClause::raw(sql))
    }

    /// Add ORDER BY term
    pub fn order(mut self, order: Order) -> Self {
        self.order_by.push(order);
        self
    }

    /// Add ORDER BY ASC
    pub fn order_asc(self, field: &str) -> Self {
        self.order(Order::asc(field))
    }

    /// Add ORDER BY DESC
    pub fn order_desc(self, field: &str) -> Self {
        self.order(Order::desc(field))
    }

    /// Replace any existing ordering with `order`
    pub fn reorder(self, order: Order) -> Self {
        self.unordered().order(order)
    }

    /// Drop all ORDER BY terms
    pub fn unordered(mut self) -> Self {
        self.order_by.clear();
        self
    }

    /// Add LIMIT clause
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Drop the LIMIT clause
    pub fn unlimited(mut self) -> Self {
        self.limit = None;
        self
    }

    /// Restrict to the primary key values in `keys`
    pub fn where_keys_in(self, keys: &[BatchKey]) -> Self {
        let column = self.qualified_primary_key();
        self.where_in(&column, keys.iter().map(BatchKey::to_json).collect())
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key_column(&self) -> &str {
        &self.primary_key
    }

    /// Primary key qualified with the table name, e.g. `users.id`
    pub fn qualified_primary_key(&self) -> String {
        format!("{}.{}", self.table, self.primary_key)
    }

    /// Ascending primary key order, the only order batches are produced in
    pub fn batch_order(&self) -> Order {
        Order::asc(&self.qualified_primary_key())
    }

    pub fn select_fields(&self) -> &[String] {
        &self.select_fields
    }

    pub fn where_clauses(&self) -> &[WhereClause] {
        &self.where_clauses
    }

    pub fn order_terms(&self) -> &[Order] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn has_order(&self) -> bool {
        !self.order_by.is_empty()
    }

    pub fn has_limit(&self) -> bool {
        self.limit.is_some()
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            return String::new();
        }
        let where_parts: Vec<String> = self
            .where_clauses
            .iter()
            .map(|clause| clause.to_sql())
            .collect();
        format!(" WHERE {}", where_parts.join(" AND "))
    }

    fn order_and_limit_sql(&self) -> String {
        let mut sql = String::new();
        if !self.order_by.is_empty() {
            let terms: Vec<String> = self.order_by.iter().map(Order::to_sql).collect();
            sql.push_str(&format!(" ORDER BY {}", terms.join(", ")));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }

    /// Build the complete SELECT statement
    pub fn build_sql(&self) -> String {
        format!(
            "SELECT {} FROM {}{}{}",
            self.select_fields.join(", "),
            self.table,
            self.where_sql(),
            self.order_and_limit_sql()
        )
    }

    /// Build a SELECT of a single column, keeping filters, order and limit
    pub fn build_pluck_sql(&self, column: &str) -> String {
        format!(
            "SELECT {} FROM {}{}{}",
            column,
            self.table,
            self.where_sql(),
            self.order_and_limit_sql()
        )
    }

    /// Build a bulk UPDATE over the filtered rows; order and limit are ignored
    pub fn build_update_sql(&self, assignments: &[Assignment]) -> String {
        let set_parts: Vec<String> = assignments.iter().map(Assignment::to_sql).collect();
        format!(
            "UPDATE {} SET {}{}",
            self.table,
            set_parts.join(", "),
            self.where_sql()
        )
    }

    /// Build a bulk DELETE over the filtered rows; order and limit are ignored
    pub fn build_delete_sql(&self) -> String {
        format!("DELETE FROM {}{}", self.table, self.where_sql())
    }
}

/// A table-backed entity whose rows can be queried as a [`Relation`]
pub trait Entity {
    const TABLE: &'static str;
    const PRIMARY_KEY: &'static str = "id";

    /// Relation over every row of the entity's table
    fn all() -> Relation {
        Relation::new(Self::TABLE).primary_key(Self::PRIMARY_KEY)
    }
}
