//! Persistence seams for the leave domain.
//!
//! Services only talk to these traits and get plain records back, so the
//! same rules run against MySQL in production and an in-memory store in
//! tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use derive_more::Display;
use strum_macros::EnumString;

use crate::model::{
    employee::Employee,
    financial_year::FinancialYear,
    leave_entitlement::{EntitlementRecord, NewEntitlement},
    leave_policy::{EmployeeCriteria, LeavePolicy},
    leave_request::{
        BalancePolicy, LeaveBalance, LeaveRequestRecord, LeaveStatus, NewLeaveRequest, Submission,
    },
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[derive(Debug, Display)]
pub enum StoreError {
    #[display(fmt = "duplicate record: {}", _0)]
    Duplicate(String),
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // 23000 = integrity constraint violation (unique key)
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Duplicate(db_err.message().to_string());
            }
        }
        StoreError::Database(e)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
}

impl Pagination {
    pub const DEFAULT_PER_PAGE: u64 = 20;
    pub const MAX_PER_PAGE: u64 = 100;

    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page
                .unwrap_or(Self::DEFAULT_PER_PAGE)
                .clamp(1, Self::MAX_PER_PAGE),
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntitlementOrder {
    #[default]
    #[strum(serialize = "employee_name", serialize = "display_name")]
    EmployeeName,
    Days,
    CreatedAt,
    Id,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitlementFilter {
    /// Employee status, `active` unless asked otherwise
    pub employee_status: String,
    pub financial_year_id: Option<u64>,
    pub policy_id: Option<u64>,
    /// Substring of the employee display name
    pub search: Option<String>,
    pub order_by: EntitlementOrder,
    pub order: SortOrder,
    pub pagination: Pagination,
}

impl Default for EntitlementFilter {
    fn default() -> Self {
        Self {
            employee_status: crate::model::employee::STATUS_ACTIVE.to_string(),
            financial_year_id: None,
            policy_id: None,
            search: None,
            order_by: EntitlementOrder::default(),
            order: SortOrder::default(),
            pagination: Pagination::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum RequestOrder {
    #[default]
    CreatedAt,
    StartDate,
    EndDate,
    #[strum(serialize = "employee_name", serialize = "display_name")]
    EmployeeName,
    Id,
}

/// Which requests a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    All,
    /// Requests of employees in departments led by this employee, plus their own
    LeadOf(u64),
    /// Only this employee's requests
    Own(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestFilter {
    pub status: Option<LeaveStatus>,
    pub financial_year_id: Option<u64>,
    /// Matched against employee name and reason
    pub search: Option<String>,
    pub order_by: RequestOrder,
    pub order: SortOrder,
    pub visibility: Visibility,
    pub pagination: Pagination,
}

/// Read-only HR reference data.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    async fn find_policy(&self, id: u64) -> StoreResult<Option<LeavePolicy>>;

    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>>;

    /// Active employees matching every criterion.
    async fn matching_employees(&self, criteria: &EmployeeCriteria) -> StoreResult<Vec<Employee>>;

    async fn find_financial_year(&self, id: u64) -> StoreResult<Option<FinancialYear>>;

    async fn financial_year_containing(&self, date: NaiveDate)
    -> StoreResult<Option<FinancialYear>>;

    /// True when the employee leads at least one department.
    async fn leads_department(&self, employee_id: u64) -> StoreResult<bool>;

    /// True when `lead_id` leads the department `employee_id` belongs to.
    async fn is_lead_of(&self, lead_id: u64, employee_id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn find(&self, id: u64) -> StoreResult<Option<EntitlementRecord>>;

    async fn list(&self, filter: &EntitlementFilter) -> StoreResult<(Vec<EntitlementRecord>, i64)>;

    async fn insert(&self, entitlement: &NewEntitlement) -> StoreResult<u64>;

    /// Returns false when nothing was deleted.
    async fn delete(&self, id: u64) -> StoreResult<bool>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn find(&self, id: u64) -> StoreResult<Option<LeaveRequestRecord>>;

    async fn list(&self, filter: &RequestFilter) -> StoreResult<(Vec<LeaveRequestRecord>, i64)>;

    /// Checks overlap and balance and inserts the request as one atomic step.
    async fn submit(
        &self,
        request: &NewLeaveRequest,
        policy: BalancePolicy,
    ) -> StoreResult<Submission>;

    /// Returns false when the request does not exist.
    async fn update_status(
        &self,
        id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
        actor: u64,
    ) -> StoreResult<bool>;

    /// `None` when the employee has no entitlement for that leave type and year.
    async fn balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        financial_year_id: u64,
    ) -> StoreResult<Option<LeaveBalance>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pagination_is_clamped() {
        let p = Pagination::new(Some(0), Some(1_000));
        assert_eq!(p, Pagination { page: 1, per_page: 100 });
        assert_eq!(Pagination::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn offset_saturates_on_huge_pages() {
        let p = Pagination::new(Some(u64::MAX), Some(100));
        assert_eq!(p.offset(), u64::MAX);
    }

    #[test]
    fn order_names_accept_legacy_aliases() {
        assert_eq!(
            EntitlementOrder::from_str("display_name").unwrap(),
            EntitlementOrder::EmployeeName
        );
        assert_eq!(RequestOrder::from_str("start_date").unwrap(), RequestOrder::StartDate);
        assert_eq!(SortOrder::from_str("ASC").unwrap(), SortOrder::Asc);
        assert!(SortOrder::from_str("sideways").is_err());
    }
}
