//! Mapping from core errors to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use betadrop_artifacts::ArtifactError;
use betadrop_ingest::IngestError;
use betadrop_ota::OtaError;
use betadrop_protocol::ErrorClass;
use betadrop_store::StoreError;
use serde_json::json;

/// Error returned by every handler. Rendered as JSON `{code, message}`.
#[derive(Debug)]
pub struct ApiError {
    class: ErrorClass,
    message: String,
}

impl ApiError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Validation, message)
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn status(&self) -> StatusCode {
        match self.class {
            ErrorClass::Validation => StatusCode::BAD_REQUEST,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            ErrorClass::Storage | ErrorClass::Encoding | ErrorClass::InvariantViolation => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self.class {
            ErrorClass::Validation => "VALIDATION_ERROR",
            ErrorClass::NotFound => "NOT_FOUND",
            ErrorClass::Storage => "STORAGE_ERROR",
            ErrorClass::Encoding => "ENCODING_ERROR",
            ErrorClass::InvariantViolation => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        match self.class {
            ErrorClass::Validation | ErrorClass::NotFound => {
                tracing::debug!(error = %self.message, code, "request rejected");
            }
            ErrorClass::InvariantViolation => {
                tracing::error!(error = %self.message, code, "invariant violation");
            }
            ErrorClass::Storage | ErrorClass::Encoding => {
                tracing::error!(error = %self.message, code, "request error");
            }
        }

        let body = Json(json!({
            "code": code,
            "message": self.message,
        }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::new(e.class(), e.to_string())
    }
}

impl From<OtaError> for ApiError {
    fn from(e: OtaError) -> Self {
        Self::new(e.class(), e.to_string())
    }
}

impl From<ArtifactError> for ApiError {
    fn from(e: ArtifactError) -> Self {
        Self::new(e.class(), e.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        Self::new(e.class(), e.to_string())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            format!("blocking task failed: {e}"),
        )
    }
}
