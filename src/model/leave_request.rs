use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;

/// Workflow state of a leave request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LeaveStatus {
    Approved,
    Pending,
    Rejected,
    Forwarded,
}

impl LeaveStatus {
    /// Numeric code kept in the `status` column.
    pub fn code(self) -> u8 {
        match self {
            LeaveStatus::Approved => 1,
            LeaveStatus::Pending => 2,
            LeaveStatus::Rejected => 3,
            LeaveStatus::Forwarded => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        LeaveStatus::iter().find(|s| s.code() == code)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LeaveStatus::Approved | LeaveStatus::Rejected)
    }

    /// Pending and forwarded requests hold days until they are decided.
    pub fn reserves_days(self) -> bool {
        matches!(self, LeaveStatus::Pending | LeaveStatus::Forwarded)
    }

    /// Comma separated list of accepted action names, for error messages.
    pub fn allowed() -> String {
        LeaveStatus::iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// How status changes are policed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionRules {
    /// When set, approved and rejected requests cannot change state again.
    pub strict: bool,
}

impl TransitionRules {
    pub fn permits(&self, from: LeaveStatus, to: LeaveStatus) -> bool {
        !self.strict || !from.is_terminal() || from == to
    }
}

/// Whether a request larger than the remaining balance is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BalancePolicy {
    #[default]
    Reject,
    Allow,
}

impl BalancePolicy {
    pub fn admits(&self, balance: &LeaveBalance, days: u32) -> bool {
        match self {
            BalancePolicy::Reject => balance.available >= i64::from(days),
            BalancePolicy::Allow => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaveBalance {
    #[schema(example = 15)]
    pub entitled: i64,
    /// Days of approved requests
    #[schema(example = 4)]
    pub spent: i64,
    /// Days of requests still waiting for a decision
    #[schema(example = 2)]
    pub pending: i64,
    #[schema(example = 9)]
    pub available: i64,
}

impl LeaveBalance {
    pub fn compute(entitled: u32, spent: i64, pending: i64) -> Self {
        let entitled = i64::from(entitled);
        Self {
            entitled,
            spent,
            pending,
            available: entitled - spent - pending,
        }
    }
}

/// Calendar days covered by the range, both ends included.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> u32 {
    let span = (end - start).num_days() + 1;
    u32::try_from(span.max(0)).unwrap_or(u32::MAX)
}

/// Validated request, ready to be checked against the balance and stored.
#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub policy_id: u64,
    pub leave_type_id: u64,
    pub financial_year_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub days: u32,
    pub reason: Option<String>,
    pub created_by: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveRequestRecord {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 1000)]
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = 3)]
    pub policy_id: u64,
    #[schema(example = "Casual Leave")]
    pub policy_name: String,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 1)]
    pub financial_year_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = 3)]
    pub days: u32,
    #[schema(example = "Family event", nullable = true)]
    pub reason: Option<String>,
    pub status: LeaveStatus,
    /// Note left by whoever last changed the status
    #[schema(nullable = true)]
    pub comment: Option<String>,
    /// Balance before this request was filed
    #[schema(example = 12)]
    pub available_days: i64,
    #[schema(example = 3)]
    pub spent_days: i64,
    pub created_by: u64,
    #[schema(nullable = true)]
    pub updated_by: Option<u64>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

/// Result of an atomic balance-checked insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    Created(u64),
    NoEntitlement,
    Overlapping(u64),
    Insufficient { balance: LeaveBalance, requested: u32 },
}
