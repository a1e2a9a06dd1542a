//! HTTP request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use taskgate_agent::TaskFailure;
use taskgate_core::{Category, ErrorKind, Payload, RequestId};

// ============================================================================
// Query types
// ============================================================================

/// Query string for `POST /run`.
#[derive(Debug, Deserialize)]
pub struct RunQuery {
    /// Natural-language task description. Missing is treated as empty.
    #[serde(default)]
    pub task: String,
}

/// Query string for `GET /read`.
#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    pub path: String,
}

// ============================================================================
// Success types
// ============================================================================

/// Response body for a completed task.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    /// Always `"success"`.
    pub status: &'static str,
    pub request_id: RequestId,
    pub category: Option<Category>,
    pub result: Payload,
}

impl SuccessResponse {
    pub fn new(request_id: RequestId, category: Option<Category>, result: Payload) -> Self {
        Self {
            status: "success",
            request_id,
            category,
            result,
        }
    }
}

/// One entry of `GET /categories`.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Whether an executor is registered for this category.
    pub registered: bool,
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `"error"`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<RequestId>,
    pub detail: TaskFailure,
}

impl ErrorResponse {
    pub fn new(detail: TaskFailure) -> Self {
        Self {
            status: "error",
            request_id: None,
            detail,
        }
    }

    /// Builder method to attach the request id.
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// HTTP status for this failure.
    ///
    /// An executor failure is reported with the status of the kind the
    /// executor gave, so a missing input file is a 404 whichever stage hit it.
    pub fn status_code(&self) -> StatusCode {
        match (&self.detail.kind, &self.detail.cause) {
            (ErrorKind::ExecutionFailure, Some(cause)) => status_for(cause.kind),
            (kind, _) => status_for(*kind),
        }
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

/// Map an error kind to its HTTP status.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput | ErrorKind::UnsupportedCategory => StatusCode::BAD_REQUEST,
        ErrorKind::PathViolation => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::SizeLimitExceeded => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorKind::MalformedData => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::ClassificationFailure | ErrorKind::ExtractionFailure => {
            StatusCode::BAD_GATEWAY
        }
        ErrorKind::TransientTransportError => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::ExecutionFailure => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
