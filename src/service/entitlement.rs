use std::sync::Arc;

use tracing::{info, warn};

use crate::auth::auth::AuthUser;
use crate::auth::authz::{Authorizer, Capability};
use crate::error::LeaveError;
use crate::model::leave_entitlement::{
    AssignmentMode, AssignmentOutcome, EntitlementRecord, FailedAssignment, GrantedEntitlement,
    NewEntitlement,
};
use crate::model::leave_policy::LeavePolicy;
use crate::store::{EntitlementFilter, EntitlementStore, ReferenceStore, StoreError};

/// Grant a policy to one employee or to everybody it targets.
#[derive(Debug, Clone, Default)]
pub struct AssignEntitlement {
    pub policy_id: Option<u64>,
    /// Inferred from `employee_id` when absent
    pub mode: Option<AssignmentMode>,
    pub employee_id: Option<u64>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EntitlementDetail {
    pub entitlement: EntitlementRecord,
    pub policy: Option<LeavePolicy>,
}

#[derive(Clone)]
pub struct EntitlementService {
    refs: Arc<dyn ReferenceStore>,
    entitlements: Arc<dyn EntitlementStore>,
    authz: Arc<dyn Authorizer>,
}

fn failure_reason(e: &StoreError) -> String {
    match e {
        StoreError::Duplicate(_) => {
            "entitlement already exists for this leave type and year".to_string()
        }
        StoreError::Database(_) => "entitlement could not be stored".to_string(),
    }
}

impl EntitlementService {
    pub fn new(
        refs: Arc<dyn ReferenceStore>,
        entitlements: Arc<dyn EntitlementStore>,
        authz: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            refs,
            entitlements,
            authz,
        }
    }

    pub async fn assign(
        &self,
        caller: &AuthUser,
        command: AssignEntitlement,
    ) -> Result<AssignmentOutcome, LeaveError> {
        self.authz.require(caller, Capability::ManageLeave)?;

        let policy_id = command
            .policy_id
            .ok_or_else(|| LeaveError::validation("policy_id is required"))?;
        let policy = self.refs.find_policy(policy_id).await?.ok_or_else(|| {
            LeaveError::validation(format!("Leave policy {} does not exist", policy_id))
        })?;

        let mode = command.mode.unwrap_or(match command.employee_id {
            Some(_) => AssignmentMode::Single,
            None => AssignmentMode::Group,
        });

        let mut outcome = AssignmentOutcome::default();

        let targets: Vec<u64> = match mode {
            AssignmentMode::Single => {
                let employee_id = command.employee_id.ok_or_else(|| {
                    LeaveError::validation("employee_id is required for a single assignment")
                })?;

                if self.refs.find_employee(employee_id).await?.is_none() {
                    outcome.failed.push(FailedAssignment {
                        employee_id,
                        reason: "employee not found".to_string(),
                    });
                    return Ok(outcome);
                }

                vec![employee_id]
            }
            AssignmentMode::Group => {
                let mut ids: Vec<u64> = self
                    .refs
                    .matching_employees(&policy.criteria())
                    .await?
                    .into_iter()
                    .map(|e| e.id)
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                ids
            }
        };

        for employee_id in targets {
            let row = NewEntitlement {
                employee_id,
                policy_id: policy.id,
                leave_type_id: policy.leave_type_id,
                days: policy.days,
                financial_year_id: policy.financial_year_id,
                description: command.comment.clone(),
                created_by: caller.user_id,
            };

            match self.entitlements.insert(&row).await {
                Ok(entitlement_id) => outcome.created.push(GrantedEntitlement {
                    employee_id,
                    entitlement_id,
                }),
                Err(e) => {
                    warn!(error = %e, employee_id, policy_id, "Entitlement not granted");
                    outcome.failed.push(FailedAssignment {
                        employee_id,
                        reason: failure_reason(&e),
                    });
                }
            }
        }

        info!(
            policy_id,
            mode = ?mode,
            created = outcome.affected(),
            failed = outcome.failed.len(),
            "Leave policy assigned"
        );

        Ok(outcome)
    }

    pub async fn list(
        &self,
        caller: &AuthUser,
        filter: &EntitlementFilter,
    ) -> Result<(Vec<EntitlementRecord>, i64), LeaveError> {
        self.authz.require(caller, Capability::ViewLeave)?;
        Ok(self.entitlements.list(filter).await?)
    }

    pub async fn get(
        &self,
        caller: &AuthUser,
        id: u64,
        include_policy: bool,
    ) -> Result<EntitlementDetail, LeaveError> {
        self.authz.require(caller, Capability::ViewLeave)?;

        let entitlement = self
            .entitlements
            .find(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("Entitlement"))?;

        let policy = if include_policy {
            self.refs.find_policy(entitlement.policy_id).await?
        } else {
            None
        };

        Ok(EntitlementDetail {
            entitlement,
            policy,
        })
    }

    pub async fn delete(&self, caller: &AuthUser, id: u64) -> Result<(), LeaveError> {
        self.authz.require(caller, Capability::ManageLeave)?;

        let entitlement = self
            .entitlements
            .find(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("Entitlement"))?;

        if !self.entitlements.delete(id).await? {
            return Err(LeaveError::not_found("Entitlement"));
        }

        info!(
            entitlement_id = id,
            employee_id = entitlement.employee_id,
            policy_id = entitlement.policy_id,
            "Entitlement deleted"
        );
        Ok(())
    }
}
