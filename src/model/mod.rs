#[cfg(test)]
pub mod department;
pub mod employee;
pub mod financial_year;
pub mod leave_entitlement;
pub mod leave_policy;
pub mod leave_request;
pub mod role;
