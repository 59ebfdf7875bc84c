use std::str::FromStr;

use crate::error::LeaveError;

/// Builds a service over the in-memory store with the leave routes mounted
/// under `/api/v1`.
#[cfg(test)]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.config.clone()))
                .app_data(actix_web::web::Data::new($state.entitlements.clone()))
                .app_data(actix_web::web::Data::new($state.requests.clone()))
                .service(
                    actix_web::web::scope("/api/v1")
                        .wrap(actix_web::middleware::from_fn(
                            crate::auth::middleware::auth_middleware,
                        ))
                        .configure(crate::routes::leave_routes),
                ),
        )
        .await
    };
}

pub mod leave_entitlement;
pub mod leave_request;

/// Parses an optional query value, naming the parameter when it is invalid.
pub(crate) fn parse_param<T: FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>, LeaveError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => T::from_str(raw)
            .map(Some)
            .map_err(|_| LeaveError::validation(format!("Invalid {} '{}'", name, raw))),
        None => Ok(None),
    }
}
