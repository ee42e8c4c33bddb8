use std::collections::BTreeMap;

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    schema::{FieldMessage, ValidationErrors},
    services::IdpConfigError,
    store::StoreError,
};

/// JSON error body: `{"error": {"type": "...", "message": "...", "code": "..."}}`,
/// plus per-field messages for validation failures.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<&'static str, Vec<FieldMessage>>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn with_type(
        error_type: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorInfo {
                error_type: error_type.into(),
                message: message.into(),
                code: code.into(),
            },
            fields: None,
        }
    }
}

#[derive(Debug)]
pub enum AdminError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Validation(ValidationErrors),
    /// Assertion could not be mapped to a local account
    Mapping(String),
    /// Store backend unreachable; the request may be retried
    Unavailable(String),
    Internal(String),
}

impl From<StoreError> for AdminError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => AdminError::Unavailable(msg),
            StoreError::Conflict(msg) => AdminError::Conflict(msg),
            StoreError::Invalid(msg) => AdminError::BadRequest(msg),
            StoreError::Backend(msg) => AdminError::Internal(msg),
        }
    }
}

impl From<IdpConfigError> for AdminError {
    fn from(err: IdpConfigError) -> Self {
        match err {
            IdpConfigError::Validation(errors) => AdminError::Validation(errors),
            IdpConfigError::Store(e) => e.into(),
            IdpConfigError::NotFound(idp_id) => {
                AdminError::NotFound(format!("IdP '{}' is not configured", idp_id))
            }
            IdpConfigError::Mapping(e) => AdminError::Mapping(e.to_string()),
            IdpConfigError::Login(e) => AdminError::Mapping(e.to_string()),
        }
    }
}

impl From<JsonRejection> for AdminError {
    fn from(rejection: JsonRejection) -> Self {
        AdminError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        if let AdminError::Validation(errors) = self {
            let mut body = ErrorResponse::with_type(
                "invalid_request_error",
                "validation_error",
                errors.to_string(),
            );
            body.fields = Some(errors.field_errors());
            return (StatusCode::BAD_REQUEST, Json(body)).into_response();
        }

        let (status, error_type, code, message) = match self {
            AdminError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found_error", "not_found", msg)
            }
            AdminError::Conflict(msg) => {
                (StatusCode::CONFLICT, "invalid_request_error", "conflict", msg)
            }
            AdminError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_request_error",
                "bad_request",
                msg,
            ),
            AdminError::Mapping(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_request_error",
                "mapping_failed",
                msg,
            ),
            AdminError::Unavailable(msg) => {
                tracing::warn!(error = %msg, "IdP configuration store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "server_error",
                    "store_unavailable",
                    "The configuration store is temporarily unavailable".to_string(),
                )
            }
            AdminError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AdminError::Validation(_) => unreachable!("Handled above"),
        };

        (status, Json(ErrorResponse::with_type(error_type, code, message))).into_response()
    }
}
