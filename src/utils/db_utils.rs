use sqlx::mysql::{MySql, MySqlArguments};
use sqlx::query::{QueryAs, QueryScalar};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    U8(u8),
}

/// ===============================
/// Dynamic WHERE clause
/// ===============================
/// Conditions are AND-ed; each `?` in a condition consumes one value, in order.
#[derive(Debug, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: &str, values: impl IntoIterator<Item = SqlValue>) {
        self.conditions.push(condition.to_string());
        self.values.extend(values);
    }

    /// `LIKE '%term%'` over several columns, OR-ed together.
    pub fn push_search(&mut self, columns: &[&str], term: &str) {
        let like = format!("%{}%", escape_like(term));
        let condition = columns
            .iter()
            .map(|c| format!("{} LIKE ?", c))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({})", condition));
        self.values
            .extend(columns.iter().map(|_| SqlValue::String(like.clone())));
    }

    pub fn sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// ===============================
/// Bind values onto a typed query
/// ===============================
pub fn bind_as<'q, O>(
    query: QueryAs<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, O, MySqlArguments> {
    values.iter().fold(query, |q, value| match value {
        SqlValue::String(v) => q.bind(v.clone()),
        SqlValue::U64(v) => q.bind(*v),
        SqlValue::U8(v) => q.bind(*v),
    })
}

pub fn bind_scalar<'q, O>(
    query: QueryScalar<'q, MySql, O, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, O, MySqlArguments> {
    values.iter().fold(query, |q, value| match value {
        SqlValue::String(v) => q.bind(v.clone()),
        SqlValue::U64(v) => q.bind(*v),
        SqlValue::U8(v) => q.bind(*v),
    })
}
