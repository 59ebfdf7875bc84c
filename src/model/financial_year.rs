use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FinancialYear {
    pub id: u64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl FinancialYear {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Render a date with a chrono format string, e.g. `%Y-%m-%d` or `%d.%m.%Y`.
pub fn format_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}
