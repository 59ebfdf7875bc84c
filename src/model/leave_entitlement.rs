use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Row to be written when a policy is granted to one employee.
#[derive(Debug, Clone)]
pub struct NewEntitlement {
    pub employee_id: u64,
    pub policy_id: u64,
    pub leave_type_id: u64,
    pub days: u32,
    pub financial_year_id: u64,
    pub description: Option<String>,
    pub created_by: u64,
}

/// Entitlement joined with the employee, policy and financial year it refers to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EntitlementRecord {
    pub id: u64,
    pub employee_id: u64,
    pub employee_name: String,
    pub employee_status: String,
    pub policy_id: u64,
    pub policy_name: String,
    pub leave_type_id: u64,
    pub days: u32,
    /// Days consumed by approved requests of the same leave type and year
    pub spent: i64,
    pub financial_year_id: u64,
    pub year_start: NaiveDate,
    pub year_end: NaiveDate,
    pub description: Option<String>,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

impl EntitlementRecord {
    pub fn available(&self) -> i64 {
        i64::from(self.days) - self.spent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentMode {
    /// Grant to one named employee
    Single,
    /// Grant to every active employee matching the policy criteria
    Group,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GrantedEntitlement {
    #[schema(example = 189)]
    pub employee_id: u64,
    #[schema(example = 17)]
    pub entitlement_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FailedAssignment {
    #[schema(example = 190)]
    pub employee_id: u64,
    #[schema(example = "entitlement already exists for this leave type and year")]
    pub reason: String,
}

/// Result of a policy assignment. Failures do not abort the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct AssignmentOutcome {
    pub created: Vec<GrantedEntitlement>,
    pub failed: Vec<FailedAssignment>,
}

impl AssignmentOutcome {
    pub fn affected(&self) -> usize {
        self.created.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.created.is_empty() && !self.failed.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.created.is_empty() && !self.failed.is_empty()
    }
}
