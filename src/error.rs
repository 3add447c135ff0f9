use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::response::ApiResponse;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// The processor answered with anything other than 201.
    #[error("Payment declined with status {status}")]
    PaymentDeclined { status: u16, body: Value },

    #[error("Payment gateway unavailable: {0}")]
    PaymentUnavailable(String),

    /// Local persistence failed after money moved at the processor.
    #[error("Order persistence failed after payment: {0}")]
    ConsistencyFault(String),

    #[error("Refund after failed order creation also failed: {cause}; refund: {refund}")]
    CompensationFailure { cause: String, refund: String },

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::PreconditionFailed(_) | AppError::InvariantViolation(_) => {
                StatusCode::CONFLICT
            }
            // A decline must never read as success to the caller.
            AppError::PaymentDeclined { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            AppError::PaymentUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::ConsistencyFault(_)
            | AppError::CompensationFailure { .. }
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if let AppError::PaymentDeclined { body, .. } = self {
            return (status, axum::Json(ApiResponse::failure(message, body))).into_response();
        }

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let body = ApiResponse::failure(message.clone(), ErrorData { error: message });
        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
