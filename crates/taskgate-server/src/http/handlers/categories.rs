//! Task taxonomy listing.

use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use taskgate_core::Category;

use crate::http::responses::CategoryResponse;
use crate::state::AppState;

/// List every category, flagging the ones with an executor.
pub async fn list_categories(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.dispatcher.registry();
    let categories: Vec<CategoryResponse> = Category::ALL
        .iter()
        .map(|category| CategoryResponse {
            id: category.id(),
            name: category.name(),
            description: category.description(),
            registered: registry.is_registered(*category),
        })
        .collect();

    Json(categories)
}
