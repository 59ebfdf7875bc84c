use crate::api::parse_param;
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::LeaveError;
use crate::model::financial_year::format_date;
use crate::model::leave_entitlement::{
    AssignmentMode, EntitlementRecord, FailedAssignment, GrantedEntitlement,
};
use crate::model::leave_policy::LeavePolicy;
use crate::service::entitlement::{AssignEntitlement, EntitlementService};
use crate::store::{EntitlementFilter, Pagination};
use actix_web::{HttpResponse, http::StatusCode, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct EntitlementQuery {
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u64>,
    /// Items per page, at most 100
    #[schema(example = 20)]
    pub per_page: Option<u64>,
    /// Part of the employee name
    #[schema(example = "john")]
    pub search: Option<String>,
    /// Employee status, `active` by default
    #[schema(example = "active")]
    pub emp_status: Option<String>,
    /// employee_name, days, created_at or id
    #[schema(example = "employee_name")]
    pub orderby: Option<String>,
    /// asc or desc
    #[schema(example = "desc")]
    pub order: Option<String>,
    /// Financial year id
    #[schema(example = 1)]
    pub year: Option<u64>,
    #[schema(example = 3)]
    pub policy_id: Option<u64>,
}

impl EntitlementQuery {
    fn to_filter(&self) -> Result<EntitlementFilter, LeaveError> {
        let mut filter = EntitlementFilter {
            financial_year_id: self.year,
            policy_id: self.policy_id,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            pagination: Pagination::new(self.page, self.per_page),
            ..Default::default()
        };

        if let Some(status) = self.emp_status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filter.employee_status = status.to_string();
        }
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
pub struct EntitlementDetailQuery {
    /// `policy` embeds the leave policy
    pub include: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct AssignEntitlementRequest {
    #[schema(example = 3)]
    pub policy_id: Option<u64>,
    /// Inferred from `employee_id` when omitted
    pub assignment_mode: Option<AssignmentMode>,
    #[schema(example = 189)]
    pub employee_id: Option<u64>,
    #[schema(example = "Yearly allocation")]
    pub comment: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EntitlementResponse {
    #[schema(example = 17)]
    pub id: u64,
    #[schema(example = 189)]
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
    #[schema(example = 10)]
    pub total_day: u32,
    #[schema(example = 7)]
    pub available: i64,
    #[schema(example = 3)]
    pub spent: i64,
    #[schema(example = "2026-01-01")]
    pub start_date: String,
    #[schema(example = "2026-12-31")]
    pub end_date: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<LeavePolicy>,
}

impl EntitlementResponse {
    fn new(record: EntitlementRecord, policy: Option<LeavePolicy>, date_format: &str) -> Self {
        Self {
            available: record.available(),
            id: record.id,
            employee_id: record.employee_id,
            employee_name: record.employee_name,
            policy_id: record.policy_id,
            policy_name: record.policy_name,
            leave_type_id: record.leave_type_id,
            financial_year_id: record.financial_year_id,
            total_day: record.days,
            spent: record.spent,
            start_date: format_date(record.year_start, date_format),
            end_date: format_date(record.year_end, date_format),
            description: record.description,
            created_at: record.created_at,
            policy,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct EntitlementListResponse {
    pub data: Vec<EntitlementResponse>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 20)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Serialize, ToSchema)]
pub struct AssignResponse {
    #[schema(example = "Entitlements created")]
    pub message: String,
    #[schema(example = 3)]
    pub affected: usize,
    pub created: Vec<GrantedEntitlement>,
    pub failed: Vec<FailedAssignment>,
}

/// List entitlements
#[utoipa::path(
    get,
    path = "/api/v1/entitlements",
    params(EntitlementQuery),
    responses(
        (status = 200, description = "Paginated entitlement list", body = EntitlementListResponse),
        (status = 400, description = "Invalid filter", body = Object, example = json!({
            "message": "Invalid orderby 'salary'"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Entitlement"
)]
pub async fn list_entitlements(
    auth: AuthUser,
    service: web::Data<EntitlementService>,
    config: web::Data<Config>,
    query: web::Query<EntitlementQuery>,
) -> Result<HttpResponse, LeaveError> {
    let filter = query.to_filter()?;
    let (rows, total) = service.list(&auth, &filter).await?;

    let data = rows
        .into_iter()
        .map(|r| EntitlementResponse::new(r, None, &config.date_format))
        .collect();

    Ok(HttpResponse::Ok().json(EntitlementListResponse {
        data,
        page: filter.pagination.page,
        per_page: filter.pagination.per_page,
        total,
    }))
}

/// Get one entitlement
#[utoipa::path(
    get,
    path = "/api/v1/entitlements/{id}",
    params(
        ("id" = u64, Path, description = "Entitlement id"),
        EntitlementDetailQuery
    ),
    responses(
        (status = 200, description = "Entitlement found", body = EntitlementResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Entitlement not found", body = Object, example = json!({
            "message": "Entitlement not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Entitlement"
)]
pub async fn get_entitlement(
    auth: AuthUser,
    service: web::Data<EntitlementService>,
    config: web::Data<Config>,
    path: web::Path<u64>,
    query: web::Query<EntitlementDetailQuery>,
) -> Result<HttpResponse, LeaveError> {
    let include_policy = query
        .include
        .as_deref()
        .is_some_and(|inc| inc.split(',').any(|part| part.trim() == "policy"));

    let detail = service.get(&auth, path.into_inner(), include_policy).await?;

    Ok(HttpResponse::Ok().json(EntitlementResponse::new(
        detail.entitlement,
        detail.policy,
        &config.date_format,
    )))
}

/// Grant a leave policy to one employee or every employee it targets
#[utoipa::path(
    post,
    path = "/api/v1/entitlements",
    request_body(
        content = AssignEntitlementRequest,
        description = "Policy assignment",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Every target was granted", body = AssignResponse),
        (status = 207, description = "Some targets failed", body = AssignResponse),
        (status = 422, description = "Every target failed", body = AssignResponse),
        (status = 400, description = "Missing or unknown policy"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Entitlement"
)]
pub async fn assign_entitlement(
    auth: AuthUser,
    service: web::Data<EntitlementService>,
    payload: web::Json<AssignEntitlementRequest>,
) -> Result<HttpResponse, LeaveError> {
    let payload = payload.into_inner();
    let outcome = service
        .assign(
            &auth,
            AssignEntitlement {
                policy_id: payload.policy_id,
                mode: payload.assignment_mode,
                employee_id: payload.employee_id,
                comment: payload.comment,
            },
        )
        .await?;

    let (status, message) = if outcome.all_failed() {
        (StatusCode::UNPROCESSABLE_ENTITY, "No entitlement was created")
    } else if outcome.is_partial() {
        (StatusCode::MULTI_STATUS, "Some entitlements could not be created")
    } else {
        (StatusCode::CREATED, "Entitlements created")
    };

    Ok(HttpResponse::build(status).json(AssignResponse {
        message: message.to_string(),
        affected: outcome.affected(),
        created: outcome.created,
        failed: outcome.failed,
    }))
}

/// Delete an entitlement
#[utoipa::path(
    delete,
    path = "/api/v1/entitlements/{id}",
    params(
        ("id" = u64, Path, description = "Entitlement id")
    ),
    responses(
        (status = 200, description = "Entitlement deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "HR/Admin only"),
        (status = 404, description = "Entitlement not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Entitlement"
)]
pub async fn delete_entitlement(
    auth: AuthUser,
    service: web::Data<EntitlementService>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    service.delete(&auth, path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Successfully deleted"
    })))
}

#[cfg(test)]
mod tests {
    use crate::api::testing::*;
    use actix_web::{http::StatusCode, test};
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn group_assignment_then_listing() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(json!({ "policy_id": ENGINEERING_CASUAL, "assignment_mode": "group" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["affected"], 2);
        assert_eq!(body["failed"], json!([]));

        let req = test::TestRequest::get()
            .uri("/api/v1/entitlements?year=1")
            .insert_header(staff(2))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["page"], 1);
        assert_eq!(body["data"][0]["employee_name"], "Bob Jones");
        assert_eq!(body["data"][0]["total_day"], 5);
        assert_eq!(body["data"][0]["spent"], 0);
        assert_eq!(body["data"][0]["available"], 5);
        assert_eq!(body["data"][0]["start_date"], "01/01/2024");
        assert_eq!(body["data"][0]["end_date"], "31/12/2024");
        assert!(body["data"][0].get("policy").is_none());
    }

    #[actix_web::test]
    async fn repeated_assignment_reports_failures() {
        let state = state();
        let app = test_app!(state);

        let single = json!({ "policy_id": COMPANY_SICK, "employee_id": 3 });
        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(&single)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(json!({ "policy_id": COMPANY_SICK, "assignment_mode": "group" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::MULTI_STATUS);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["affected"], 2);
        assert_eq!(body["failed"][0]["employee_id"], 3);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(&single)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(state.store.entitlement_count(), 3);
    }

    #[actix_web::test]
    async fn assignment_is_for_hr_only() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(staff(1))
            .set_json(json!({ "policy_id": ENGINEERING_CASUAL }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "HR/Admin only");
    }

    #[actix_web::test]
    async fn unknown_policy_is_a_bad_request() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(json!({ "policy_id": 404, "assignment_mode": "group" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn detail_embeds_policy_on_request() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(json!({ "policy_id": ENGINEERING_CASUAL, "employee_id": 1 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["created"][0]["entitlement_id"].as_u64().unwrap();

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/entitlements/{}?include=policy", id))
            .insert_header(hr())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["policy"]["name"], "Casual Leave");
        assert_eq!(body["policy_name"], "Casual Leave");
    }

    #[actix_web::test]
    async fn delete_then_not_found() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/v1/entitlements")
            .insert_header(hr())
            .set_json(json!({ "policy_id": ENGINEERING_CASUAL, "employee_id": 2 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let id = body["created"][0]["entitlement_id"].as_u64().unwrap();
        let uri = format!("/api/v1/entitlements/{}", id);

        let req = test::TestRequest::delete().uri(&uri).insert_header(hr()).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "Successfully deleted");

        let req = test::TestRequest::delete().uri(&uri).insert_header(hr()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri(&uri).insert_header(hr()).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn bad_orderby_is_rejected() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::get()
            .uri("/api/v1/entitlements?orderby=salary")
            .insert_header(hr())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Invalid orderby 'salary'");
    }

    #[actix_web::test]
    async fn requests_without_token_are_unauthorized() {
        let state = state();
        let app = test_app!(state);

        let req = test::TestRequest::get().uri("/api/v1/entitlements").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn page_far_past_the_end_is_empty() {
        let state = state();
        let app = test_app!(state);

        for uri in [
            "/api/v1/entitlements?page=18446744073709551615",
            "/api/v1/leave-requests?page=18446744073709551615&per_page=100",
        ] {
            let req = test::TestRequest::get().uri(uri).insert_header(hr()).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["page"], u64::MAX);
            assert_eq!(body["data"], json!([]));
        }
    }
}
