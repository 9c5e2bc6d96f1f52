use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::types::{ErrorResponse, FieldErrors};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A collaborator call failed; `context` names the step
    #[error("{context}: {cause:#}")]
    Upstream {
        context: &'static str,
        cause: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn upstream(context: &'static str, cause: anyhow::Error) -> Self {
        Self::Upstream { context, cause }
    }

    pub fn identity_not_found() -> Self {
        Self::NotFound("Identity not found".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Upstream { .. } | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            ApiError::Validation(errors) => {
                ErrorResponse::new("validation_error").with_field_errors(errors)
            }
            ApiError::Forbidden(msg) => ErrorResponse::new(msg)
                .with_hint("Check the passphrase and try again"),
            ApiError::Upstream { context, cause } => {
                tracing::error!("{}: {:#}", context, cause);
                ErrorResponse::new(format!("{}: {:#}", context, cause))
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ErrorResponse::new(msg).with_hint("Please try again later")
            }
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => ErrorResponse::new(msg),
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
