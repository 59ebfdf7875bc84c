//! sqlx/MySQL implementation of the store traits.

use sqlx::MySqlPool;

mod entitlement;
mod leave_request;
mod reference;

/// One pool shared by every store trait.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Display name as rendered in every joined query.
pub(crate) const EMPLOYEE_NAME_SQL: &str = "CONCAT_WS(' ', e.first_name, e.last_name)";

fn order_sql(order: crate::store::SortOrder) -> &'static str {
    match order {
        crate::store::SortOrder::Asc => "ASC",
        crate::store::SortOrder::Desc => "DESC",
    }
}
