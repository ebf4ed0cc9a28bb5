// Response envelope shared by every handler

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Typed result of a handler: either `success(payload, message)` or
/// `error(details, message)`. Expected business outcomes such as "not found"
/// are expressed with this type rather than with `Err`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    #[serde(skip, default = "default_status")]
    pub status: u16,
}

fn default_status() -> u16 {
    StatusCode::OK.as_u16()
}

impl<T> ApiResponse<T> {
    pub fn success(data: Option<T>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
            errors: None,
            status: StatusCode::OK.as_u16(),
        }
    }

    /// Business failure, reported as 400 unless overridden
    pub fn error(errors: Option<serde_json::Value>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors,
            status: StatusCode::BAD_REQUEST.as_u16(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::error(None, message).with_status(StatusCode::NOT_FOUND)
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status.as_u16();
        self
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub data: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u64,
}

impl<T> PagedResponse<T> {
    pub fn new(data: Vec<T>, page_number: u32, page_size: u32, total_records: u64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_records.div_ceil(u64::from(page_size))
        };
        Self {
            data,
            page_number,
            page_size,
            total_records,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::success(Some(7), "Done");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Done");
        assert_eq!(json["data"], 7);
        assert!(json.get("errors").is_none());
        assert!(json.get("status").is_none());
        assert_eq!(response.status_code(), StatusCode::OK);
    }

    #[test]
    fn test_error_envelope_defaults_to_bad_request() {
        let response: ApiResponse<()> = ApiResponse::error(None, "Nope");
        assert!(!response.success);
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

        let missing: ApiResponse<()> = ApiResponse::not_found("Product not found");
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PagedResponse::new(vec![1, 2], 1, 2, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(PagedResponse::<u8>::new(vec![], 1, 10, 0).total_pages, 0);
    }
}
