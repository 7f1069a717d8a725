use super::conditions::format_value;

/// One `SET` target of a bulk UPDATE
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `column = value`
    Set {
        column: String,
        value: serde_json::Value,
    },
    /// `column = column + by`
    Increment { column: String, by: i64 },
    /// Raw SET fragment, e.g. `"money = money * 2"`
    Raw(String),
}

impl Assignment {
    pub fn set(column: &str, value: serde_json::Value) -> Self {
        Assignment::Set {
            column: column.to_string(),
            value,
        }
    }

    pub fn increment(column: &str, by: i64) -> Self {
        Assignment::Increment {
            column: column.to_string(),
            by,
        }
    }

    pub fn raw(sql: &str) -> Self {
        Assignment::Raw(sql.to_string())
    }

    /// Convert to SQL string
    pub fn to_sql(&self) -> String {
        match self {
            Assignment::Set { column, value } => format!("{} = {}", column, format_value(value)),
            Assignment::Increment { column, by } if *by < 0 => {
                format!("{column} = {column} - {}", by.unsigned_abs())
            }
            Assignment::Increment { column, by } => format!("{column} = {column} + {by}"),
            Assignment::Raw(sql) => sql.clone(),
        }
    }
}
