use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::employee::Employee;

/// A policy template: how many days of one leave type, for whom, in which
/// financial year.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeavePolicy {
    #[schema(example = 3)]
    pub id: u64,
    #[schema(example = "Casual Leave")]
    pub name: String,
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = 10)]
    pub days: u32,
    #[schema(example = 10, nullable = true)]
    pub department_id: Option<u64>,
    #[schema(example = 3, nullable = true)]
    pub designation_id: Option<u64>,
    #[schema(nullable = true)]
    pub location_id: Option<u64>,
    #[schema(example = "any", nullable = true)]
    pub gender: Option<String>,
    #[schema(example = "any", nullable = true)]
    pub marital_status: Option<String>,
    #[schema(example = 1)]
    pub financial_year_id: u64,
}

impl LeavePolicy {
    pub fn criteria(&self) -> EmployeeCriteria {
        EmployeeCriteria {
            department_id: self.department_id,
            designation_id: self.designation_id,
            location_id: self.location_id,
            gender: specific(self.gender.as_deref()),
            marital_status: specific(self.marital_status.as_deref()),
        }
    }
}

/// Employee filters resolved from a policy. `None` matches everybody.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmployeeCriteria {
    pub department_id: Option<u64>,
    pub designation_id: Option<u64>,
    pub location_id: Option<u64>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
}

#[cfg(test)]
impl EmployeeCriteria {
    /// Exact equality on every non-wildcard field. Activity is not checked here.
    pub fn matches(&self, employee: &Employee) -> bool {
        fn eq<T: PartialEq>(wanted: &Option<T>, actual: &Option<T>) -> bool {
            match wanted {
                None => true,
                Some(w) => actual.as_ref() == Some(w),
            }
        }

        eq(&self.department_id, &employee.department_id)
            && eq(&self.designation_id, &employee.designation_id)
            && eq(&self.location_id, &employee.location_id)
            && eq(&self.gender, &employee.gender)
            && eq(&self.marital_status, &employee.marital_status)
    }
}

/// Policies store "-1", "any" or an empty string for "no restriction".
fn specific(value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        None | Some("") | Some("-1") => None,
        Some(v) if v.eq_ignore_ascii_case("any") => None,
        Some(v) => Some(v.to_string()),
    }
}
