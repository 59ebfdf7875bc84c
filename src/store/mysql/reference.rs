use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;

use super::MySqlStore;
use crate::model::{
    employee::{Employee, STATUS_ACTIVE},
    financial_year::FinancialYear,
    leave_policy::{EmployeeCriteria, LeavePolicy},
};
use crate::store::{ReferenceStore, StoreResult};
use crate::utils::db_utils::{SqlValue, WhereClause, bind_as};

const EMPLOYEE_COLUMNS: &str = r#"
    id, employee_code, first_name, last_name, email,
    department_id, designation_id, location_id, gender, marital_status, status
"#;

#[async_trait]
impl ReferenceStore for MySqlStore {
    async fn find_policy(&self, id: u64) -> StoreResult<Option<LeavePolicy>> {
        let policy = sqlx::query_as::<_, LeavePolicy>(
            r#"
            SELECT
                p.id,
                lt.name AS name,
                p.leave_type_id,
                p.days,
                p.department_id,
                p.designation_id,
                p.location_id,
                p.gender,
                p.marital_status,
                p.f_year AS financial_year_id
            FROM leave_policies p
            JOIN leave_types lt ON lt.id = p.leave_type_id
            WHERE p.id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(policy)
    }

    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let sql = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
        let employee = sqlx::query_as::<_, Employee>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(employee)
    }

    async fn matching_employees(&self, criteria: &EmployeeCriteria) -> StoreResult<Vec<Employee>> {
        let mut filter = WhereClause::new();
        filter.push("status = ?", [SqlValue::String(STATUS_ACTIVE.to_string())]);

        if let Some(id) = criteria.department_id {
            filter.push("department_id = ?", [SqlValue::U64(id)]);
        }
        if let Some(id) = criteria.designation_id {
            filter.push("designation_id = ?", [SqlValue::U64(id)]);
        }
        if let Some(id) = criteria.location_id {
            filter.push("location_id = ?", [SqlValue::U64(id)]);
        }
        if let Some(gender) = &criteria.gender {
            filter.push("gender = ?", [SqlValue::String(gender.clone())]);
        }
        if let Some(marital) = &criteria.marital_status {
            filter.push("marital_status = ?", [SqlValue::String(marital.clone())]);
        }

        let sql = format!(
            "SELECT {} FROM employees{} ORDER BY id",
            EMPLOYEE_COLUMNS,
            filter.sql()
        );
        debug!(sql = %sql, bindings = ?filter.values(), "Resolving policy employees");

        let employees = bind_as(sqlx::query_as::<_, Employee>(&sql), filter.values())
            .fetch_all(&self.pool)
            .await?;

        Ok(employees)
    }

    async fn find_financial_year(&self, id: u64) -> StoreResult<Option<FinancialYear>> {
        let year = sqlx::query_as::<_, FinancialYear>(
            "SELECT id, name, start_date, end_date FROM financial_years WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(year)
    }

    async fn financial_year_containing(
        &self,
        date: NaiveDate,
    ) -> StoreResult<Option<FinancialYear>> {
        let year = sqlx::query_as::<_, FinancialYear>(
            r#"
            SELECT id, name, start_date, end_date
            FROM financial_years
            WHERE start_date <= ? AND end_date >= ?
            ORDER BY start_date DESC
            LIMIT 1
            "#,
        )
        .bind(date)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(year)
    }

    async fn leads_department(&self, employee_id: u64) -> StoreResult<bool> {
        let leads = sqlx::query_scalar::<_, i64>(
            "SELECT EXISTS(SELECT 1 FROM departments WHERE lead_id = ? LIMIT 1)",
        )
        .bind(employee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(leads != 0)
    }

    async fn is_lead_of(&self, lead_id: u64, employee_id: u64) -> StoreResult<bool> {
        let leads = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT EXISTS(
                SELECT 1
                FROM employees e
                JOIN departments d ON d.id = e.department_id
                WHERE e.id = ? AND d.lead_id = ?
            )
            "#,
        )
        .bind(employee_id)
        .bind(lead_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(leads != 0)
    }
}
