use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, Display)]
pub enum LeaveError {
    #[display(fmt = "{}", _0)]
    NotFound(String),
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{}", _0)]
    Forbidden(String),
    #[display(fmt = "{}", _0)]
    InvalidTransition(String),
    #[display(fmt = "Internal Server Error")]
    Store(StoreError),
}

impl LeaveError {
    pub fn not_found(what: &str) -> Self {
        LeaveError::NotFound(format!("{} not found", what))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        LeaveError::Validation(message.into())
    }
}

impl From<StoreError> for LeaveError {
    fn from(e: StoreError) -> Self {
        LeaveError::Store(e)
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::NotFound(_) => StatusCode::NOT_FOUND,
            LeaveError::Validation(_) => StatusCode::BAD_REQUEST,
            LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::InvalidTransition(_) => StatusCode::CONFLICT,
            LeaveError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let LeaveError::Store(e) = self {
            error!(error = %e, "Leave store failure");
        }

        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
