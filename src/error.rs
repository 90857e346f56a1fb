use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::form::ValidationReport;
use crate::geocoding::GeocodeError;
use crate::intent::IntentError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid checkout link: {0}")]
    InvalidCheckoutLink(#[from] IntentError),

    #[error("Checkout session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Order form has invalid fields")]
    Validation(ValidationReport),

    #[error("An order submission is already in progress")]
    SubmissionInProgress,

    #[error("Checkout session was closed while submitting")]
    SubmissionCancelled,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidCheckoutLink(_) | AppError::Validation(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SubmissionInProgress => StatusCode::CONFLICT,
            AppError::SubmissionCancelled => StatusCode::GONE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Geocode(GeocodeError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Geocode(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self {
            AppError::Validation(report) => json!(report),
            AppError::InvalidCheckoutLink(e) => json!({
                "state": "invalid_checkout_link",
                "error": e.to_string(),
            }),
            other => json!({ "error": other.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
