use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySqlConnection;
use tracing::{debug, error, info};

use super::{EMPLOYEE_NAME_SQL, MySqlStore, order_sql};
use crate::model::leave_request::{
    BalancePolicy, LeaveBalance, LeaveRequestRecord, LeaveStatus, NewLeaveRequest, Submission,
};
use crate::store::{
    RequestFilter, RequestOrder, RequestStore, StoreError, StoreResult, Visibility,
};
use crate::utils::db_utils::{SqlValue, WhereClause, bind_as, bind_scalar};

/// Raw row; `status` is still the stored code.
#[derive(sqlx::FromRow)]
struct LeaveRequestRow {
    id: u64,
    employee_id: u64,
    employee_name: String,
    policy_id: u64,
    policy_name: String,
    leave_type_id: u64,
    financial_year_id: u64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    days: u32,
    reason: Option<String>,
    status: u8,
    comment: Option<String>,
    available_days: i64,
    spent_days: i64,
    created_by: u64,
    updated_by: Option<u64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequestRecord {
    type Error = StoreError;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let status = LeaveStatus::from_code(row.status).ok_or_else(|| {
            StoreError::Database(sqlx::Error::Decode(
                format!("unknown leave status code {}", row.status).into(),
            ))
        })?;

        Ok(LeaveRequestRecord {
            id: row.id,
            employee_id: row.employee_id,
            employee_name: row.employee_name,
            policy_id: row.policy_id,
            policy_name: row.policy_name,
            leave_type_id: row.leave_type_id,
            financial_year_id: row.financial_year_id,
            start_date: row.start_date,
            end_date: row.end_date,
            days: row.days,
            reason: row.reason,
            status,
            comment: row.comment,
            available_days: row.available_days,
            spent_days: row.spent_days,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
        })
    }
}

fn select_sql() -> String {
    format!(
        r#"
        SELECT
            r.id,
            r.employee_id,
            {name} AS employee_name,
            r.policy_id,
            lt.name AS policy_name,
            r.leave_type_id,
            r.f_year AS financial_year_id,
            r.start_date,
            r.end_date,
            r.days,
            r.reason,
            r.status,
            r.comment,
            r.available_days,
            r.spent_days,
            r.created_by,
            r.updated_by,
            r.created_at
        FROM leave_requests r
        JOIN employees e ON e.id = r.employee_id
        JOIN leave_types lt ON lt.id = r.leave_type_id
        "#,
        name = EMPLOYEE_NAME_SQL
    )
}

fn order_column(order: RequestOrder) -> &'static str {
    match order {
        RequestOrder::CreatedAt => "r.created_at",
        RequestOrder::StartDate => "r.start_date",
        RequestOrder::EndDate => "r.end_date",
        RequestOrder::EmployeeName => "employee_name",
        RequestOrder::Id => "r.id",
    }
}

fn where_clause(filter: &RequestFilter) -> WhereClause {
    let mut clause = WhereClause::new();

    if let Some(status) = filter.status {
        clause.push("r.status = ?", [SqlValue::U8(status.code())]);
    }

    if let Some(year) = filter.financial_year_id {
        clause.push("r.f_year = ?", [SqlValue::U64(year)]);
    }

    match filter.visibility {
        Visibility::All => {}
        Visibility::LeadOf(lead) => clause.push(
            "(e.department_id IN (SELECT d.id FROM departments d WHERE d.lead_id = ?) OR r.employee_id = ?)",
            [SqlValue::U64(lead), SqlValue::U64(lead)],
        ),
        Visibility::Own(employee_id) => {
            clause.push("r.employee_id = ?", [SqlValue::U64(employee_id)])
        }
    }

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        clause.push_search(&[EMPLOYEE_NAME_SQL, "r.reason"], search.trim());
    }

    clause
}

/// Approved and still-open day totals for one employee, leave type and year.
async fn usage(
    conn: &mut MySqlConnection,
    employee_id: u64,
    leave_type_id: u64,
    financial_year_id: u64,
) -> Result<(i64, i64), sqlx::Error> {
    sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT
            CAST(COALESCE(SUM(CASE WHEN status = 1 THEN days ELSE 0 END), 0) AS SIGNED),
            CAST(COALESCE(SUM(CASE WHEN status IN (2, 4) THEN days ELSE 0 END), 0) AS SIGNED)
        FROM leave_requests
        WHERE employee_id = ?
        AND leave_type_id = ?
        AND f_year = ?
        "#,
    )
    .bind(employee_id)
    .bind(leave_type_id)
    .bind(financial_year_id)
    .fetch_one(conn)
    .await
}

#[async_trait]
impl RequestStore for MySqlStore {
    async fn find(&self, id: u64) -> StoreResult<Option<LeaveRequestRecord>> {
        let sql = format!("{} WHERE r.id = ?", select_sql());
        let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(LeaveRequestRecord::try_from).transpose()
    }

    async fn list(&self, filter: &RequestFilter) -> StoreResult<(Vec<LeaveRequestRecord>, i64)> {
        let clause = where_clause(filter);

        let count_sql = format!(
            r#"
            SELECT COUNT(*)
            FROM leave_requests r
            JOIN employees e ON e.id = r.employee_id
            {}
            "#,
            clause.sql()
        );
        debug!(sql = %count_sql, bindings = ?clause.values(), "Counting leave requests");

        let total = bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql), clause.values())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count leave requests");
                e
            })?;

        let data_sql = format!(
            "{}{} ORDER BY {} {}, r.id {} LIMIT ? OFFSET ?",
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
            "Fetching leave requests"
        );

        let rows = bind_as(sqlx::query_as::<_, LeaveRequestRow>(&data_sql), clause.values())
            .bind(filter.pagination.per_page)
            .bind(filter.pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch leave requests");
                e
            })?;

        let records = rows
            .into_iter()
            .map(LeaveRequestRecord::try_from)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok((records, total))
    }

    async fn submit(
        &self,
        request: &NewLeaveRequest,
        policy: BalancePolicy,
    ) -> StoreResult<Submission> {
        // Dropping `tx` on an early return rolls everything back.
        let mut tx = self.pool.begin().await?;

        // Serialises every submission of this employee, whatever the leave type,
        // so the overlap check below sees all committed requests.
        let employee = sqlx::query_scalar::<_, u64>(
            "SELECT id FROM employees WHERE id = ? FOR UPDATE",
        )
        .bind(request.employee_id)
        .fetch_optional(&mut *tx)
        .await?;

        if employee.is_none() {
            return Ok(Submission::NoEntitlement);
        }

        // Row lock on the balance being spent.
        let entitled = sqlx::query_scalar::<_, u32>(
            r#"
            SELECT days
            FROM leave_entitlements
            WHERE employee_id = ? AND leave_type_id = ? AND f_year = ?
            FOR UPDATE
            "#,
        )
        .bind(request.employee_id)
        .bind(request.leave_type_id)
        .bind(request.financial_year_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(entitled) = entitled else {
            return Ok(Submission::NoEntitlement);
        };

        let overlapping = sqlx::query_scalar::<_, u64>(
            r#"
            SELECT id
            FROM leave_requests
            WHERE employee_id = ?
            AND status <> ?
            AND start_date <= ?
            AND end_date >= ?
            LIMIT 1
            "#,
        )
        .bind(request.employee_id)
        .bind(LeaveStatus::Rejected.code())
        .bind(request.end_date)
        .bind(request.start_date)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(existing) = overlapping {
            return Ok(Submission::Overlapping(existing));
        }

        let (spent, pending) = usage(
            &mut *tx,
            request.employee_id,
            request.leave_type_id,
            request.financial_year_id,
        )
        .await?;
        let balance = LeaveBalance::compute(entitled, spent, pending);

        if !policy.admits(&balance, request.days) {
            return Ok(Submission::Insufficient {
                balance,
                requested: request.days,
            });
        }

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (employee_id, policy_id, leave_type_id, f_year, start_date, end_date, days,
                 reason, status, available_days, spent_days, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.policy_id)
        .bind(request.leave_type_id)
        .bind(request.financial_year_id)
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(request.days)
        .bind(request.reason.as_deref())
        .bind(LeaveStatus::Pending.code())
        .bind(balance.available)
        .bind(balance.spent)
        .bind(request.created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let id = result.last_insert_id();
        info!(
            leave_request_id = id,
            employee_id = request.employee_id,
            days = request.days,
            available = balance.available,
            "Leave request stored"
        );

        Ok(Submission::Created(id))
    }

    async fn update_status(
        &self,
        id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
        actor: u64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, comment = ?, updated_by = ?
            WHERE id = ?
            "#,
        )
        .bind(status.code())
        .bind(comment)
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        financial_year_id: u64,
    ) -> StoreResult<Option<LeaveBalance>> {
        let mut conn = self.pool.acquire().await?;

        let entitled = sqlx::query_scalar::<_, u32>(
            r#"
            SELECT days
            FROM leave_entitlements
            WHERE employee_id = ? AND leave_type_id = ? AND f_year = ?
            "#,
        )
        .bind(employee_id)
        .bind(leave_type_id)
        .bind(financial_year_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(entitled) = entitled else {
            return Ok(None);
        };

        let (spent, pending) = usage(&mut *conn, employee_id, leave_type_id, financial_year_id).await?;

        Ok(Some(LeaveBalance::compute(entitled, spent, pending)))
    }
}
