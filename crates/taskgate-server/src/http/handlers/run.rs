//! Task execution handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::responses::{ErrorResponse, RunQuery, SuccessResponse};
use crate::metrics::Endpoint;
use crate::state::AppState;

/// Run a natural-language task.
///
/// Classification, extraction and execution all happen inside the
/// dispatcher, which also logs the outcome.
pub async fn run_task(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RunQuery>,
) -> Response {
    state.metrics.record_request(Endpoint::Run);

    let outcome = state.dispatcher.dispatch(query.task).await;
    match outcome.result {
        Ok(payload) => Json(SuccessResponse::new(
            outcome.request_id,
            outcome.category,
            payload,
        ))
        .into_response(),
        Err(failure) => {
            state.metrics.record_failure(failure.kind);
            ErrorResponse::new(failure)
                .with_request_id(outcome.request_id)
                .into_response()
        }
    }
}
