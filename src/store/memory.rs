//! In-memory store backing the unit tests.

use std::cmp::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::model::{
    department::Department,
    employee::Employee,
    financial_year::FinancialYear,
    leave_entitlement::{EntitlementRecord, NewEntitlement},
    leave_policy::{EmployeeCriteria, LeavePolicy},
    leave_request::{
        BalancePolicy, LeaveBalance, LeaveRequestRecord, LeaveStatus, NewLeaveRequest, Submission,
    },
};
use crate::store::{
    EntitlementFilter, EntitlementOrder, EntitlementStore, ReferenceStore, RequestFilter,
    RequestOrder, RequestStore, SortOrder, StoreError, StoreResult, Visibility,
};

#[derive(Default)]
struct State {
    employees: Vec<Employee>,
    departments: Vec<Department>,
    policies: Vec<LeavePolicy>,
    years: Vec<FinancialYear>,
    entitlements: Vec<EntitlementRecord>,
    requests: Vec<LeaveRequestRecord>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn employee(&self, id: u64) -> Option<&Employee> {
        self.employees.iter().find(|e| e.id == id)
    }

    fn usage(&self, employee_id: u64, leave_type_id: u64, year: u64) -> (i64, i64) {
        self.requests
            .iter()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.leave_type_id == leave_type_id
                    && r.financial_year_id == year
            })
            .fold((0, 0), |(spent, pending), r| match r.status {
                LeaveStatus::Approved => (spent + i64::from(r.days), pending),
                s if s.reserves_days() => (spent, pending + i64::from(r.days)),
                _ => (spent, pending),
            })
    }

    fn entitled(&self, employee_id: u64, leave_type_id: u64, year: u64) -> Option<u32> {
        self.entitlements
            .iter()
            .find(|e| {
                e.employee_id == employee_id
                    && e.leave_type_id == leave_type_id
                    && e.financial_year_id == year
            })
            .map(|e| e.days)
    }

    fn with_spent(&self, mut record: EntitlementRecord) -> EntitlementRecord {
        record.spent = self
            .usage(record.employee_id, record.leave_type_id, record.financial_year_id)
            .0;
        if let Some(employee) = self.employee(record.employee_id) {
            record.employee_status = employee.status.clone();
        }
        record
    }

    fn leads(&self, lead_id: u64, employee_id: u64) -> bool {
        self.employee(employee_id)
            .and_then(|e| e.department_id)
            .and_then(|dept| self.departments.iter().find(|d| d.id == dept))
            .is_some_and(|d| d.lead_id == Some(lead_id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_employee(&self, employee: Employee) {
        self.lock().employees.push(employee);
    }

    pub fn add_department(&self, department: Department) {
        self.lock().departments.push(department);
    }

    pub fn add_policy(&self, policy: LeavePolicy) {
        self.lock().policies.push(policy);
    }

    pub fn add_year(&self, year: FinancialYear) {
        self.lock().years.push(year);
    }

    pub fn entitlement_count(&self) -> usize {
        self.lock().entitlements.len()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }
}

fn apply_order(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T>(rows: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    rows.into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect()
}

#[async_trait]
impl ReferenceStore for MemoryStore {
    async fn find_policy(&self, id: u64) -> StoreResult<Option<LeavePolicy>> {
        Ok(self.lock().policies.iter().find(|p| p.id == id).cloned())
    }

    async fn find_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        Ok(self.lock().employee(id).cloned())
    }

    async fn matching_employees(&self, criteria: &EmployeeCriteria) -> StoreResult<Vec<Employee>> {
        Ok(self
            .lock()
            .employees
            .iter()
            .filter(|e| e.is_active() && criteria.matches(e))
            .cloned()
            .collect())
    }

    async fn find_financial_year(&self, id: u64) -> StoreResult<Option<FinancialYear>> {
        Ok(self.lock().years.iter().find(|y| y.id == id).cloned())
    }

    async fn financial_year_containing(
        &self,
        date: NaiveDate,
    ) -> StoreResult<Option<FinancialYear>> {
        Ok(self.lock().years.iter().find(|y| y.contains(date)).cloned())
    }

    async fn leads_department(&self, employee_id: u64) -> StoreResult<bool> {
        Ok(self
            .lock()
            .departments
            .iter()
            .any(|d| d.lead_id == Some(employee_id)))
    }

    async fn is_lead_of(&self, lead_id: u64, employee_id: u64) -> StoreResult<bool> {
        Ok(self.lock().leads(lead_id, employee_id))
    }
}

#[async_trait]
impl EntitlementStore for MemoryStore {
    async fn find(&self, id: u64) -> StoreResult<Option<EntitlementRecord>> {
        let state = self.lock();
        Ok(state
            .entitlements
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .map(|e| state.with_spent(e)))
    }

    async fn list(&self, filter: &EntitlementFilter) -> StoreResult<(Vec<EntitlementRecord>, i64)> {
        let state = self.lock();
        let mut rows: Vec<EntitlementRecord> = state
            .entitlements
            .iter()
            .cloned()
            .map(|e| state.with_spent(e))
            .filter(|e| e.employee_status == filter.employee_status)
            .filter(|e| filter.financial_year_id.is_none_or(|y| e.financial_year_id == y))
            .filter(|e| filter.policy_id.is_none_or(|p| e.policy_id == p))
            .filter(|e| {
                filter
                    .search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&e.employee_name, s.trim()))
            })
            .collect();

        rows.sort_by(|a, b| {
            let ordering = match filter.order_by {
                EntitlementOrder::EmployeeName => a.employee_name.cmp(&b.employee_name),
                EntitlementOrder::Days => a.days.cmp(&b.days),
                EntitlementOrder::CreatedAt => a.created_at.cmp(&b.created_at),
                EntitlementOrder::Id => a.id.cmp(&b.id),
            };
            apply_order(ordering.then(a.id.cmp(&b.id)), filter.order)
        });

        let total = rows.len() as i64;
        let p = filter.pagination;
        Ok((page(rows, p.offset(), p.per_page), total))
    }

    async fn insert(&self, entitlement: &NewEntitlement) -> StoreResult<u64> {
        let mut state = self.lock();

        if state
            .entitled(
                entitlement.employee_id,
                entitlement.leave_type_id,
                entitlement.financial_year_id,
            )
            .is_some()
        {
            return Err(StoreError::Duplicate(format!(
                "entitlement for employee {} already exists",
                entitlement.employee_id
            )));
        }

        let employee = state
            .employee(entitlement.employee_id)
            .cloned()
            .ok_or_else(|| StoreError::Database(sqlx::Error::RowNotFound))?;
        let policy_name = state
            .policies
            .iter()
            .find(|p| p.id == entitlement.policy_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let year = state
            .years
            .iter()
            .find(|y| y.id == entitlement.financial_year_id)
            .cloned()
            .ok_or_else(|| StoreError::Database(sqlx::Error::RowNotFound))?;

        let id = state.next_id();
        state.entitlements.push(EntitlementRecord {
            id,
            employee_id: employee.id,
            employee_name: employee.display_name(),
            employee_status: employee.status.clone(),
            policy_id: entitlement.policy_id,
            policy_name,
            leave_type_id: entitlement.leave_type_id,
            days: entitlement.days,
            spent: 0,
            financial_year_id: year.id,
            year_start: year.start_date,
            year_end: year.end_date,
            description: entitlement.description.clone(),
            created_by: entitlement.created_by,
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn delete(&self, id: u64) -> StoreResult<bool> {
        let mut state = self.lock();
        let before = state.entitlements.len();
        state.entitlements.retain(|e| e.id != id);
        Ok(state.entitlements.len() < before)
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn find(&self, id: u64) -> StoreResult<Option<LeaveRequestRecord>> {
        Ok(self.lock().requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self, filter: &RequestFilter) -> StoreResult<(Vec<LeaveRequestRecord>, i64)> {
        let state = self.lock();
        let mut rows: Vec<LeaveRequestRecord> = state
            .requests
            .iter()
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.financial_year_id.is_none_or(|y| r.financial_year_id == y))
            .filter(|r| match filter.visibility {
                Visibility::All => true,
                Visibility::LeadOf(lead) => r.employee_id == lead || state.leads(lead, r.employee_id),
                Visibility::Own(employee_id) => r.employee_id == employee_id,
            })
            .filter(|r| {
                filter.search.as_deref().is_none_or(|s| {
                    contains_ci(&r.employee_name, s.trim())
                        || r.reason.as_deref().is_some_and(|reason| contains_ci(reason, s.trim()))
                })
            })
            .cloned()
            .collect();

        rows.sort_by(|a, b| {
            let ordering = match filter.order_by {
                RequestOrder::CreatedAt => a.created_at.cmp(&b.created_at),
                RequestOrder::StartDate => a.start_date.cmp(&b.start_date),
                RequestOrder::EndDate => a.end_date.cmp(&b.end_date),
                RequestOrder::EmployeeName => a.employee_name.cmp(&b.employee_name),
                RequestOrder::Id => a.id.cmp(&b.id),
            };
            apply_order(ordering.then(a.id.cmp(&b.id)), filter.order)
        });

        let total = rows.len() as i64;
        let p = filter.pagination;
        Ok((page(rows, p.offset(), p.per_page), total))
    }

    async fn submit(
        &self,
        request: &NewLeaveRequest,
        policy: BalancePolicy,
    ) -> StoreResult<Submission> {
        // The whole check-then-insert runs under one lock.
        let mut state = self.lock();

        let Some(entitled) = state.entitled(
            request.employee_id,
            request.leave_type_id,
            request.financial_year_id,
        ) else {
            return Ok(Submission::NoEntitlement);
        };

        if let Some(existing) = state.requests.iter().find(|r| {
            r.employee_id == request.employee_id
                && r.status != LeaveStatus::Rejected
                && r.start_date <= request.end_date
                && r.end_date >= request.start_date
        }) {
            return Ok(Submission::Overlapping(existing.id));
        }

        let (spent, pending) = state.usage(
            request.employee_id,
            request.leave_type_id,
            request.financial_year_id,
        );
        let balance = LeaveBalance::compute(entitled, spent, pending);
        if !policy.admits(&balance, request.days) {
            return Ok(Submission::Insufficient {
                balance,
                requested: request.days,
            });
        }

        let employee_name = state
            .employee(request.employee_id)
            .map(Employee::display_name)
            .unwrap_or_default();
        let policy_name = state
            .policies
            .iter()
            .find(|p| p.id == request.policy_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let id = state.next_id();
        state.requests.push(LeaveRequestRecord {
            id,
            employee_id: request.employee_id,
            employee_name,
            policy_id: request.policy_id,
            policy_name,
            leave_type_id: request.leave_type_id,
            financial_year_id: request.financial_year_id,
            start_date: request.start_date,
            end_date: request.end_date,
            days: request.days,
            reason: request.reason.clone(),
            status: LeaveStatus::Pending,
            comment: None,
            available_days: balance.available,
            spent_days: balance.spent,
            created_by: request.created_by,
            updated_by: None,
            created_at: Utc::now(),
        });

        Ok(Submission::Created(id))
    }

    async fn update_status(
        &self,
        id: u64,
        status: LeaveStatus,
        comment: Option<&str>,
        actor: u64,
    ) -> StoreResult<bool> {
        let mut state = self.lock();
        match state.requests.iter_mut().find(|r| r.id == id) {
            Some(request) => {
                request.status = status;
                request.comment = comment.map(str::to_string);
                request.updated_by = Some(actor);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn balance(
        &self,
        employee_id: u64,
        leave_type_id: u64,
        financial_year_id: u64,
    ) -> StoreResult<Option<LeaveBalance>> {
        let state = self.lock();
        Ok(state
            .entitled(employee_id, leave_type_id, financial_year_id)
            .map(|entitled| {
                let (spent, pending) = state.usage(employee_id, leave_type_id, financial_year_id);
                LeaveBalance::compute(entitled, spent, pending)
            }))
    }
}

/// Builders for seeding the store in tests.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::model::{
        department::Department, employee::Employee, financial_year::FinancialYear,
        leave_policy::LeavePolicy,
    };

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub fn employee(id: u64, first: &str, last: &str, department_id: u64) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{:03}", id),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: format!("{}@company.com", first.to_lowercase()),
            department_id: Some(department_id),
            designation_id: Some(1),
            location_id: Some(1),
            gender: Some("female".to_string()),
            marital_status: Some("single".to_string()),
            status: "active".to_string(),
        }
    }

    pub fn inactive(mut employee: Employee) -> Employee {
        employee.status = "inactive".to_string();
        employee
    }

    pub fn department(id: u64, name: &str, lead_id: Option<u64>) -> Department {
        Department {
            id,
            name: name.to_string(),
            lead_id,
        }
    }

    pub fn year(id: u64, y: i32) -> FinancialYear {
        FinancialYear {
            id,
            name: y.to_string(),
            start_date: date(y, 1, 1),
            end_date: date(y, 12, 31),
        }
    }

    pub fn policy(id: u64, leave_type_id: u64, days: u32, year_id: u64) -> LeavePolicy {
        LeavePolicy {
            id,
            name: format!("Policy {}", id),
            leave_type_id,
            days,
            department_id: None,
            designation_id: None,
            location_id: None,
            gender: None,
            marital_status: None,
            financial_year_id: year_id,
        }
    }
}
