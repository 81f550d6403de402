use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use std::sync::Arc;
use tempt_core::models::Category;

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "gallery",
    responses((status = 200, description = "Gallery categories in display order", body = Vec<Category>))
)]
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let categories = state.repos.categories.list().await?;
    Ok(Json(categories))
}
