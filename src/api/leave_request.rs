use crate::api::parse_param;
use crate::auth::auth::AuthUser;
use crate::error::LeaveError;
use crate::model::leave_request::{LeaveRequestRecord, LeaveStatus};
use crate::service::leave_request::{LeaveRequestService, SubmitLeave};
use crate::store::{Pagination, RequestFilter};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Defaults to the caller's employee record
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = 3)]
    pub policy_id: u64,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-03", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Family event")]
    pub reason: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LeaveAction {
    /// Leave request id
    #[schema(example = 1)]
    pub id: u64,
    /// approved, pending, rejected or forwarded
    #[serde(rename = "type")]
    #[schema(example = "approved")]
    pub action: String,
    #[schema(example = "Enjoy your holiday")]
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Items per page, at most 100
    #[schema(example = 20)]
    pub per_page: Option<u64>,
    /// approved, pending, rejected or forwarded
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Financial year id, the current one by default
    #[schema(example = 1)]
    pub year: Option<u64>,
    /// created_at, start_date, end_date, employee_name or id
    #[schema(example = "created_at")]
    pub orderby: Option<String>,
    /// asc or desc
    #[schema(example = "desc")]
    pub order: Option<String>,
    /// Search in employee name and reason
    #[schema(example = "john")]
    pub s: Option<String>,
}

impl LeaveFilter {
    fn to_filter(&self) -> Result<RequestFilter, LeaveError> {
        let mut filter = RequestFilter {
            status: parse_param::<LeaveStatus>("status", self.status.as_deref())?,
            financial_year_id: self.year,
            search: self.s.clone().filter(|s| !s.trim().is_empty()),
            pagination: Pagination::new(self.page, self.per_page),
            ..Default::default()
        };

        if let Some(order_by) = parse_param("orderby", self.orderby.as_deref())? {
            filter.order_by = order_by;
        }
        if let Some(order) = parse_param("order", self.order.as_deref())? {
            filter.order = order;
        }

        Ok(filter)
    }
}

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Defaults to the caller's employee record
    pub employee_id: Option<u64>,
    pub policy_id: u64,
    /// Financial year id, the policy's year by default
    pub year: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequestRecord>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Create leave request
========================= */
/// Swagger doc for create_leave endpoint
#[utoipa::path(
    post,
    path = "/api/v1/leave-requests",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequestRecord),
        (status = 400, description = "Invalid dates, missing entitlement or insufficient balance", body = Object, example = json!({
            "message": "start_date cannot be after end_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    service: web::Data<LeaveRequestService>,
    payload: web::Json<CreateLeave>,
) -> Result<HttpResponse, LeaveError> {
    let payload = payload.into_inner();
    let created = service
        .submit(
            &auth,
            SubmitLeave {
                employee_id: payload.employee_id,
                policy_id: payload.policy_id,
                start_date: payload.start_date,
                end_date: payload.end_date,
                reason: payload.reason,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(created))
}

/* =========================
Approve / reject / forward (HR/Admin)
========================= */
/// Swagger doc for leave_action endpoint
#[utoipa::path(
    post,
    path = "/api/v1/leave-requests/action",
    request_body = LeaveAction,
    responses(
        (status = 200, description = "Status changed", body = LeaveRequestRecord),
        (status = 400, description = "Unknown action type", body = Object, example = json!({
            "message": "Invalid action type 'cancel'. Allowed: approved, pending, rejected, forwarded"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Request already decided", body = Object, example = json!({
            "message": "Leave request is already approved"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_action(
    auth: AuthUser,
    service: web::Data<LeaveRequestService>,
    payload: web::Json<LeaveAction>,
) -> Result<HttpResponse, LeaveError> {
    let payload = payload.into_inner();
    let updated = service
        .transition(&auth, payload.id, &payload.action, payload.reason)
        .await?;

    Ok(HttpResponse::Ok().json(updated))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave-requests/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequestRecord),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    service: web::Data<LeaveRequestService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let leave = service.get(&auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/v1/leave-requests",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Invalid filter"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    service: web::Data<LeaveRequestService>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, LeaveError> {
    let filter = query.to_filter()?;
    let pagination = filter.pagination;

    let (leaves, total) = service.list(&auth, filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page: pagination.page,
        per_page: pagination.per_page,
        total,
    }))
}

/// Remaining balance for one employee and policy
#[utoipa::path(
    get,
    path = "/api/v1/leave-requests/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Current balance", body = crate::model::leave_request::LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No entitlement for this leave type and year")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    service: web::Data<LeaveRequestService>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, LeaveError> {
    let balance = service
        .balance(&auth, query.employee_id, query.policy_id, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}
