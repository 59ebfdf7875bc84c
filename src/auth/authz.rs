use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::model::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Read entitlements and leave requests
    ViewLeave,
    /// Grant or remove entitlements and decide on requests
    ManageLeave,
}

/// Decides whether a caller holds a capability. Injected into the services.
pub trait Authorizer: Send + Sync {
    fn allows(&self, caller: &AuthUser, capability: Capability) -> bool;

    fn require(&self, caller: &AuthUser, capability: Capability) -> Result<(), LeaveError> {
        if self.allows(caller, capability) {
            Ok(())
        } else {
            Err(LeaveError::Forbidden(match capability {
                Capability::ViewLeave => "Not allowed to view leave records".to_string(),
                Capability::ManageLeave => "HR/Admin only".to_string(),
            }))
        }
    }
}

/// Capabilities derived from the role carried in the token.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn allows(&self, caller: &AuthUser, capability: Capability) -> bool {
        match capability {
            Capability::ManageLeave => caller.role.is_leave_manager(),
            Capability::ViewLeave => matches!(
                caller.role,
                Role::Admin | Role::Hr | Role::Employee | Role::System | Role::ApiUser
            ),
        }
    }
}
