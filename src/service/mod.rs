//! Leave rules, independent of HTTP and of the database binding.

pub mod entitlement;
pub mod leave_request;
