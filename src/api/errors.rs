use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::application::errors::MaterializeError;

pub const INVALID_IDENTIFIER_MESSAGE: &str = "Invalid identifier";
pub const SNAPSHOT_UNAVAILABLE_MESSAGE: &str = "View not found or failed to generate CSV";

/// API error response
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
        }));

        (self.status, body).into_response()
    }
}

// Engine and filesystem details stay in the logs; clients only learn
// whether the request itself was malformed.
impl From<MaterializeError> for ApiError {
    fn from(err: MaterializeError) -> Self {
        match err {
            MaterializeError::InvalidIdentifier(_) => {
                ApiError::bad_request(INVALID_IDENTIFIER_MESSAGE)
            }
            MaterializeError::ViewNotFound(_)
            | MaterializeError::GenerationFailed(_)
            | MaterializeError::Storage(_) => ApiError::not_found(SNAPSHOT_UNAVAILABLE_MESSAGE),
        }
    }
}
