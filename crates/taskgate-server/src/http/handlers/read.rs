//! Sandboxed file read handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use taskgate_agent::TaskFailure;
use taskgate_core::TaskError;

use crate::http::responses::{ErrorResponse, ReadQuery};
use crate::metrics::Endpoint;
use crate::state::AppState;

/// Return the raw content of a file inside the sandbox.
pub async fn read_file(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReadQuery>,
) -> Response {
    state.metrics.record_request(Endpoint::Read);

    if query.path.trim().is_empty() {
        return fail(
            &state,
            TaskError::InvalidInput("path is required".to_string()),
        );
    }

    match state.storage.read(&query.path).await {
        Ok(content) => {
            debug!(bytes = content.len(), "Served file read");
            (
                [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
                content,
            )
                .into_response()
        }
        Err(err) => fail(&state, err.into()),
    }
}

fn fail(state: &AppState, err: TaskError) -> Response {
    let failure = TaskFailure::from(err);
    warn!(kind = %failure.kind, message = %failure.message, "File read failed");
    state.metrics.record_failure(failure.kind);
    ErrorResponse::new(failure).into_response()
}
