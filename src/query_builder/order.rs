/// Ordering direction for ORDER BY terms
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }
}

/// A single ORDER BY term
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: OrderDirection,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        format!("{} {}", self.field, self.direction.to_sql())
    }
}
