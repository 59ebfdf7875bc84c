use async_trait::async_trait;
use tracing::{debug, error};

use super::{EMPLOYEE_NAME_SQL, MySqlStore, order_sql};
use crate::model::leave_entitlement::{EntitlementRecord, NewEntitlement};
use crate::store::{EntitlementFilter, EntitlementOrder, EntitlementStore, StoreResult};
use crate::utils::db_utils::{SqlValue, WhereClause, bind_as, bind_scalar};

// `spent` only counts approved requests (status 1) of the same employee, type and year
fn select_sql() -> String {
    format!(
        r#"
        SELECT
            en.id,
            en.employee_id,
            {name} AS employee_name,
            e.status AS employee_status,
            en.policy_id,
            lt.name AS policy_name,
            en.leave_type_id,
            en.days,
            CAST(COALESCE((
                SELECT SUM(r.days)
                FROM leave_requests r
                WHERE r.employee_id = en.employee_id
                AND r.leave_type_id = en.leave_type_id
                AND r.f_year = en.f_year
                AND r.status = 1
            ), 0) AS SIGNED) AS spent,
            en.f_year AS financial_year_id,
            fy.start_date AS year_start,
            fy.end_date AS year_end,
            en.description,
            en.created_by,
            en.created_at
        {from}
        "#,
        name = EMPLOYEE_NAME_SQL,
        from = FROM_SQL
    )
}

// Shared by the data and count queries so `total` matches the rows returned
const FROM_SQL: &str = r#"
        FROM leave_entitlements en
        JOIN employees e ON e.id = en.employee_id
        JOIN leave_types lt ON lt.id = en.leave_type_id
        JOIN financial_years fy ON fy.id = en.f_year
"#;

fn count_sql(where_sql: &str) -> String {
    format!("SELECT COUNT(*) {}{}", FROM_SQL, where_sql)
}

fn order_column(order: EntitlementOrder) -> &'static str {
    match order {
        EntitlementOrder::EmployeeName => "employee_name",
        EntitlementOrder::Days => "en.days",
        EntitlementOrder::CreatedAt => "en.created_at",
        EntitlementOrder::Id => "en.id",
    }
}

fn where_clause(filter: &EntitlementFilter) -> WhereClause {
    let mut clause = WhereClause::new();
    clause.push(
        "e.status = ?",
        [SqlValue::String(filter.employee_status.clone())],
    );

    if let Some(year) = filter.financial_year_id {
        clause.push("en.f_year = ?", [SqlValue::U64(year)]);
    }

    if let Some(policy_id) = filter.policy_id {
        clause.push("en.policy_id = ?", [SqlValue::U64(policy_id)]);
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        clause.push_search(&[EMPLOYEE_NAME_SQL], search.trim());
    }

    clause
}

#[async_trait]
impl EntitlementStore for MySqlStore {
    async fn find(&self, id: u64) -> StoreResult<Option<EntitlementRecord>> {
        let sql = format!("{} WHERE en.id = ?", select_sql());
        let record = sqlx::query_as::<_, EntitlementRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn list(&self, filter: &EntitlementFilter) -> StoreResult<(Vec<EntitlementRecord>, i64)> {
        let clause = where_clause(filter);

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = count_sql(&clause.sql());
        debug!(sql = %count_sql, bindings = ?clause.values(), "Counting entitlements");

        let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), clause.values())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count entitlements");
                e
            })?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "{}{} ORDER BY {} {}, en.id {} LIMIT ? OFFSET ?",
            select_sql(),
            clause.sql(),
            order_column(filter.order_by),
            order_sql(filter.order),
            order_sql(filter.order),
        );
        debug!(
            sql = %data_sql,
            page = filter.pagination.page,
            per_page = filter.pagination.per_page,
            "Fetching entitlements"
        );

        let rows = bind_as(sqlx::query_as::<_, EntitlementRecord>(&data_sql), clause.values())
            .bind(filter.pagination.per_page)
            .bind(filter.pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch entitlements");
                e
            })?;

        Ok((rows, total))
    }

    async fn insert(&self, entitlement: &NewEntitlement) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_entitlements
                (employee_id, policy_id, leave_type_id, days, f_year, description, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entitlement.employee_id)
        .bind(entitlement.policy_id)
        .bind(entitlement.leave_type_id)
        .bind(entitlement.days)
        .bind(entitlement.financial_year_id)
        .bind(entitlement.description.as_deref())
        .bind(entitlement.created_by)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_id())
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM leave_entitlements WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
