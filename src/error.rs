// Error handling module for the catalog API
// Boundary error type and its HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::auth::AuthError;
use crate::persistence::StoreError;
use crate::response::ApiResponse;

/// Main error type for the API
///
/// Expected business outcomes never travel through this type; handlers
/// return them as `ApiResponse::error`. What remains are caller input
/// failures, authentication failures and genuinely exceptional conditions.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request failed its validation rules
    /// Maps to HTTP 400 Bad Request
    #[error("Validation failed")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Bad credentials, duplicate account or an unusable token
    /// Maps to HTTP 401 Unauthorized
    #[error(transparent)]
    Auth(AuthError),

    /// No handler registered for a request type. This is a wiring defect.
    /// Maps to HTTP 500 Internal Server Error
    #[error("No handler registered for request type {request_type}")]
    HandlerNotFound { request_type: &'static str },

    /// The caller went away before the handler finished
    /// Maps to HTTP 408 Request Timeout
    #[error("Request cancelled")]
    Cancelled,

    /// Maps to HTTP 500 Internal Server Error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Maps to HTTP 500 Internal Server Error
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// A single field-level validation failure
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub property_name: String,
    pub error_message: String,
}

/// Flatten validator output into a stable `{propertyName, errorMessage}` list
pub fn field_errors(errors: &validator::ValidationErrors) -> Vec<FieldError> {
    let mut flattened: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |err| FieldError {
                property_name: field.to_string(),
                error_message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string()),
            })
        })
        .collect();
    flattened.sort_by(|a, b| a.property_name.cmp(&b.property_name));
    flattened
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            // Store failures surfacing through the auth layer are still
            // server faults, not authentication failures
            AuthError::Store(store) => ApiError::Store(store),
            other => ApiError::Auth(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_envelope().into_response()
    }
}

impl ApiError {
    /// Convert ApiError to the response envelope.
    ///
    /// Client errors are logged at debug/warn; everything that maps to a 500
    /// is logged in full at error level and reported with a generic message.
    pub fn to_envelope(&self) -> ApiResponse<()> {
        let status = self.status_code();
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let details = serde_json::to_value(field_errors(errors)).ok();
                ApiResponse::error(details, "Validation failed").with_status(status)
            }
            ApiError::Auth(auth) if auth.is_client_error() => {
                warn!("Authentication rejected: {:?}", auth);
                ApiResponse::error(
                    Some(serde_json::json!([auth.to_string()])),
                    "Authentication required",
                )
                .with_status(status)
            }
            ApiError::Cancelled => {
                debug!("Request cancelled by caller");
                ApiResponse::error(None, "Request cancelled").with_status(status)
            }
            ApiError::HandlerNotFound { request_type } => {
                error!("Dispatch failed, no handler registered for {}", request_type);
                ApiResponse::error(None, "An unexpected error occurred").with_status(status)
            }
            other => {
                error!("Internal error: {:?}", other);
                ApiResponse::error(None, "An unexpected error occurred").with_status(status)
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(auth) if auth.is_client_error() => StatusCode::UNAUTHORIZED,
            ApiError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::HandlerNotFound { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "Too short."))]
        name: String,
        #[validate(email)]
        email: String,
    }

    #[test]
    fn test_validation_errors_flatten_with_messages() {
        let errors = Sample {
            name: "ab".to_string(),
            email: "nope".to_string(),
        }
        .validate()
        .unwrap_err();

        let flattened = field_errors(&errors);
        assert_eq!(flattened.len(), 2);
        assert_eq!(flattened[0].property_name, "email");
        assert_eq!(flattened[0].error_message, "email");
        assert_eq!(flattened[1].property_name, "name");
        assert_eq!(flattened[1].error_message, "Too short.");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Auth(AuthError::AuthenticationFailure(AuthError::INVALID_CREDENTIALS)).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Auth(AuthError::InvalidToken("x")).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::HandlerNotFound { request_type: "X" }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::Cancelled.status_code(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            ApiError::Store(StoreError::Completed).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_store_errors_through_auth_become_store_errors() {
        let err: ApiError = AuthError::Store(StoreError::Internal("down".to_string())).into();
        assert!(matches!(err, ApiError::Store(_)));
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let envelope = ApiError::InternalError("connection refused to 10.0.0.5".to_string()).to_envelope();
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("10.0.0.5"));
        assert_eq!(envelope.message, "An unexpected error occurred");
    }
}
