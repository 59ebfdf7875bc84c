use crate::api::leave_entitlement::{
    AssignEntitlementRequest, AssignResponse, EntitlementListResponse, EntitlementQuery,
    EntitlementResponse,
};
use crate::api::leave_request::{CreateLeave, LeaveAction, LeaveFilter, LeaveListResponse};
use crate::model::leave_entitlement::{AssignmentMode, FailedAssignment, GrantedEntitlement};
use crate::model::leave_policy::LeavePolicy;
use crate::model::leave_request::{LeaveBalance, LeaveRequestRecord, LeaveStatus};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management

Entitlements and leave requests for an HR system.

### 🔹 Key Features
- **Entitlements**
  - Grant a leave policy to one employee or to every active employee it targets
  - List, view and remove granted entitlements with spent and available days
- **Leave Requests**
  - Apply for leave against the remaining balance
  - Approve, reject or forward requests and view leave history
  - Check the current balance per leave policy

### 🔐 Security
Every endpoint is protected using **JWT Bearer authentication**.
Only **Admin** or **HR** can grant entitlements or decide on requests.

### 📦 Response Format
- JSON-based RESTful responses, errors as `{"message": "..."}`
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_entitlement::list_entitlements,
        crate::api::leave_entitlement::get_entitlement,
        crate::api::leave_entitlement::assign_entitlement,
        crate::api::leave_entitlement::delete_entitlement,

        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_action,
        crate::api::leave_request::leave_balance
    ),
    components(
        schemas(
            EntitlementQuery,
            EntitlementResponse,
            EntitlementListResponse,
            AssignEntitlementRequest,
            AssignResponse,
            AssignmentMode,
            GrantedEntitlement,
            FailedAssignment,
            LeavePolicy,
            LeaveFilter,
            CreateLeave,
            LeaveAction,
            LeaveListResponse,
            LeaveRequestRecord,
            LeaveStatus,
            LeaveBalance
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Entitlement", description = "Leave entitlement APIs"),
        (name = "Leave", description = "Leave request APIs"),
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by every path.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
