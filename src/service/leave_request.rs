use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::auth::auth::AuthUser;
use crate::auth::authz::{Authorizer, Capability};
use crate::error::LeaveError;
use crate::model::leave_request::{
    BalancePolicy, LeaveBalance, LeaveRequestRecord, LeaveStatus, NewLeaveRequest, Submission,
    TransitionRules, inclusive_days,
};
use crate::store::{ReferenceStore, RequestFilter, RequestStore, Visibility};

/// Knobs read from the configuration at start-up.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkflowSettings {
    pub transitions: TransitionRules,
    pub balance_policy: BalancePolicy,
}

#[derive(Debug, Clone)]
pub struct SubmitLeave {
    /// Defaults to the caller's own employee record
    pub employee_id: Option<u64>,
    pub policy_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Clone)]
pub struct LeaveRequestService {
    refs: Arc<dyn ReferenceStore>,
    requests: Arc<dyn RequestStore>,
    authz: Arc<dyn Authorizer>,
    settings: WorkflowSettings,
}

impl LeaveRequestService {
    pub fn new(
        refs: Arc<dyn ReferenceStore>,
        requests: Arc<dyn RequestStore>,
        authz: Arc<dyn Authorizer>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            refs,
            requests,
            authz,
            settings,
        }
    }

    fn is_manager(&self, caller: &AuthUser) -> bool {
        self.authz.allows(caller, Capability::ManageLeave)
    }

    /// Own records, records of a led department, or everything for managers.
    async fn can_see(&self, caller: &AuthUser, employee_id: u64) -> Result<bool, LeaveError> {
        if self.is_manager(caller) {
            return Ok(true);
        }

        match caller.employee_id {
            Some(own) if own == employee_id => Ok(true),
            Some(own) => Ok(self.refs.is_lead_of(own, employee_id).await?),
            None => Ok(false),
        }
    }

    async fn fetch(&self, id: u64) -> Result<LeaveRequestRecord, LeaveError> {
        self.requests
            .find(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("Leave request"))
    }

    pub async fn submit(
        &self,
        caller: &AuthUser,
        command: SubmitLeave,
    ) -> Result<LeaveRequestRecord, LeaveError> {
        let employee_id = command
            .employee_id
            .or(caller.employee_id)
            .ok_or_else(|| LeaveError::validation("employee_id is required"))?;

        if !caller.is_employee(employee_id) && !self.is_manager(caller) {
            return Err(LeaveError::Forbidden(
                "Leave can only be requested for yourself".to_string(),
            ));
        }

        if command.start_date > command.end_date {
            return Err(LeaveError::validation("start_date cannot be after end_date"));
        }

        self.refs
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| LeaveError::validation(format!("Employee {} does not exist", employee_id)))?;

        let policy = self
            .refs
            .find_policy(command.policy_id)
            .await?
            .ok_or_else(|| {
                LeaveError::validation(format!("Leave policy {} does not exist", command.policy_id))
            })?;

        let year = self
            .refs
            .financial_year_containing(command.start_date)
            .await?
            .ok_or_else(|| LeaveError::validation("No financial year covers start_date"))?;

        if !year.contains(command.end_date) {
            return Err(LeaveError::validation(format!(
                "Leave must end within financial year {}",
                year.name
            )));
        }

        let request = NewLeaveRequest {
            employee_id,
            policy_id: policy.id,
            leave_type_id: policy.leave_type_id,
            financial_year_id: year.id,
            start_date: command.start_date,
            end_date: command.end_date,
            days: inclusive_days(command.start_date, command.end_date),
            reason: command.reason.filter(|r| !r.trim().is_empty()),
            created_by: caller.user_id,
        };

        let id = match self
            .requests
            .submit(&request, self.settings.balance_policy)
            .await?
        {
            Submission::Created(id) => id,
            Submission::NoEntitlement => {
                return Err(LeaveError::validation(
                    "No leave entitlement found for this leave type and year",
                ));
            }
            Submission::Overlapping(existing) => {
                return Err(LeaveError::validation(format!(
                    "Leave request overlaps with existing request {}",
                    existing
                )));
            }
            Submission::Insufficient { balance, requested } => {
                warn!(
                    employee_id,
                    requested,
                    available = balance.available,
                    "Leave request refused for balance"
                );
                return Err(LeaveError::validation(format!(
                    "Insufficient leave balance: {} day(s) available, {} requested",
                    balance.available.max(0),
                    requested
                )));
            }
        };

        self.fetch(id).await
    }

    /// Moves a request to the state named by `action`.
    pub async fn transition(
        &self,
        caller: &AuthUser,
        id: u64,
        action: &str,
        reason: Option<String>,
    ) -> Result<LeaveRequestRecord, LeaveError> {
        self.authz.require(caller, Capability::ManageLeave)?;

        let target = LeaveStatus::from_str(action.trim()).map_err(|_| {
            LeaveError::validation(format!(
                "Invalid action type '{}'. Allowed: {}",
                action,
                LeaveStatus::allowed()
            ))
        })?;

        let current = self.fetch(id).await?;

        if !self.settings.transitions.permits(current.status, target) {
            return Err(LeaveError::InvalidTransition(format!(
                "Leave request is already {}",
                current.status
            )));
        }

        let comment = reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
        if !self
            .requests
            .update_status(id, target, comment, caller.user_id)
            .await?
        {
            return Err(LeaveError::not_found("Leave request"));
        }

        info!(
            leave_request_id = id,
            from = %current.status,
            to = %target,
            actor = caller.user_id,
            "Leave request status changed"
        );

        self.fetch(id).await
    }

    pub async fn list(
        &self,
        caller: &AuthUser,
        mut filter: RequestFilter,
    ) -> Result<(Vec<LeaveRequestRecord>, i64), LeaveError> {
        self.authz.require(caller, Capability::ViewLeave)?;

        filter.visibility = if self.is_manager(caller) {
            Visibility::All
        } else {
            let own = caller.employee_id.ok_or_else(|| {
                LeaveError::Forbidden("No employee record is linked to this account".to_string())
            })?;

            if self.refs.leads_department(own).await? {
                Visibility::LeadOf(own)
            } else {
                Visibility::Own(own)
            }
        };

        if filter.financial_year_id.is_none() {
            filter.financial_year_id = self
                .refs
                .financial_year_containing(Utc::now().date_naive())
                .await?
                .map(|y| y.id);
        }

        Ok(self.requests.list(&filter).await?)
    }

    pub async fn get(&self, caller: &AuthUser, id: u64) -> Result<LeaveRequestRecord, LeaveError> {
        self.authz.require(caller, Capability::ViewLeave)?;

        let request = self.fetch(id).await?;
        if !self.can_see(caller, request.employee_id).await? {
            return Err(LeaveError::Forbidden(
                "Not allowed to view this leave request".to_string(),
            ));
        }

        Ok(request)
    }

    /// Balance of one employee for the leave type of `policy_id`.
    ///
    /// `year` defaults to the policy's financial year.
    pub async fn balance(
        &self,
        caller: &AuthUser,
        employee_id: Option<u64>,
        policy_id: u64,
        year: Option<u64>,
    ) -> Result<LeaveBalance, LeaveError> {
        self.authz.require(caller, Capability::ViewLeave)?;

        let employee_id = employee_id
            .or(caller.employee_id)
            .ok_or_else(|| LeaveError::validation("employee_id is required"))?;

        if !self.can_see(caller, employee_id).await? {
            return Err(LeaveError::Forbidden(
                "Not allowed to view this balance".to_string(),
            ));
        }

        let policy = self.refs.find_policy(policy_id).await?.ok_or_else(|| {
            LeaveError::validation(format!("Leave policy {} does not exist", policy_id))
        })?;

        let year = match year {
            Some(id) => {
                self.refs.find_financial_year(id).await?.ok_or_else(|| {
                    LeaveError::validation(format!("Financial year {} does not exist", id))
                })?;
                id
            }
            None => policy.financial_year_id,
        };

        self.requests
            .balance(employee_id, policy.leave_type_id, year)
            .await?
            .ok_or_else(|| LeaveError::not_found("Entitlement"))
    }
}
